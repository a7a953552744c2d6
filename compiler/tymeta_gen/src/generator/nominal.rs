//! Records for nominal declarations.
//!
//! A declaration whose layout is known now gets a constant record. A
//! generic declaration, or one whose layout depends on a resilient type,
//! gets a pattern the runtime instantiates per argument list. Classes whose
//! ancestry is only known at runtime, or that must be registered with the
//! legacy object runtime, get a constant record completed by their accessor
//! on first use.

use std::sync::Once;

use tymeta_abi::{MetadataKind, RuntimeFn, CLASS_RODATA_NATIVE_BIT, POINTER_SIZE};
use tymeta_ir::{DeclId, NominalDecl, NominalKind, TypeRef};
use tymeta_rt::class::{init_class_layout, tymeta_initialize_superclass, tymeta_register_legacy_class};
use tymeta_rt::heap::{HEADER_ALIGN_MASK, HEADER_SIZE};
use tymeta_rt::layout::{dynamic_pass, max_payload, DynamicLayout, ElementLayout};
use tymeta_rt::witness::{pod_witnesses, reference_witnesses, table as witness_table, WitnessFamily};
use tymeta_rt::{
    AncestorCopy, CreateFunction, FieldTypeAccessor, FieldTypeSlot, FieldTypeSource, FillOp,
    GenericPattern, InitHook, MetadataAccessor, MetadataRef, MetadataSource, PatternHeader,
    ValueWitnessTable,
};

use super::{BuiltDecl, DeclState, MetadataGenerator};
use crate::buffer::ConstantBuffer;
use crate::conformance::ArgumentLayout;
use crate::descriptor::{field_words, member_names, name_buffer, names_buffer, witness_counts, DescriptorFields};
use crate::error::{MetadataError, Result};
use crate::record::{pattern_buffer, write_record, SlotValue};
use crate::scan::{
    field_offsets_words, find_slot, generic_arguments_words, payload_size_words, record_size,
    RecordShape, RecordSize, ScanField, Section, Slot,
};
use crate::sink::CodegenSink;
use crate::symbol::{decl_global, Linkage, Symbol};
use crate::type_info::{FixedLayout, TypeInfo};

const WORD: isize = POINTER_SIZE as isize;

/// What a declaration's metadata was emitted as.
#[derive(Copy, Clone, Debug)]
pub enum Emitted {
    /// A constant record, complete as emitted.
    Constant(MetadataRef),
    /// A constant class record its accessor completes on first use.
    Initialized {
        record: MetadataRef,
        accessor: &'static MetadataAccessor,
    },
    /// A pattern instantiated per argument list.
    Pattern(&'static GenericPattern),
}

impl Emitted {
    /// The emitted record, if there is exactly one.
    pub fn record(self) -> Option<MetadataRef> {
        match self {
            Self::Constant(record) | Self::Initialized { record, .. } => Some(record),
            Self::Pattern(_) => None,
        }
    }

    pub fn pattern(self) -> Option<&'static GenericPattern> {
        match self {
            Self::Pattern(pattern) => Some(pattern),
            Self::Constant(_) | Self::Initialized { .. } => None,
        }
    }
}

/// What a subclass needs to know about its superclass's record.
#[derive(Clone, Debug)]
pub(super) struct ClassSummary {
    shape: RecordShape,
    /// Some of the record is only filled in at runtime.
    runtime: bool,
    /// Instance size and alignment, when known now.
    instance: Option<ElementLayout>,
}

/// Field offsets or payload size of a value type laid out now.
struct StaticLayout {
    offsets: Vec<usize>,
    payload_size: usize,
}

/// Runtime steps that complete a constant class record.
struct ClassInit {
    superclass: Option<MetadataSource>,
    layout: bool,
    register_legacy: bool,
}

impl ClassInit {
    fn is_needed(&self) -> bool {
        self.superclass.is_some() || self.layout || self.register_legacy
    }

    fn run(&self, record: MetadataRef) {
        if let Some(source) = &self.superclass {
            match source.resolve(&[]) {
                Some(superclass) => tymeta_initialize_superclass(record.as_ptr(), superclass.as_ptr()),
                None => tracing::error!(class = ?record.as_ptr(), "superclass could not be instantiated"),
            }
        }
        if self.layout {
            init_class_layout(record);
        }
        if self.register_legacy {
            tymeta_register_legacy_class(record.as_ptr());
        }
        tracing::debug!(class = ?record.as_ptr(), "initialized class metadata");
    }
}

fn slot_offset(shape: &RecordShape, slot: Slot) -> isize {
    find_slot(shape, |s| s == slot).unwrap_or_else(|| panic!("record has no {slot:?}"))
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| panic!("{value} does not fit a 32-bit record field"))
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or_else(|_| panic!("{value} does not fit a 16-bit record field"))
}

fn unbound_params(decl: &NominalDecl) -> Vec<TypeRef> {
    (0..decl.generic_params.len())
        .map(|i| TypeRef::Param(to_u32(i)))
        .collect()
}

fn fixed_element(info: TypeInfo) -> ElementLayout {
    match info {
        TypeInfo::Fixed(layout) => layout.element(),
        TypeInfo::NonFixed => panic!("non-fixed element in a layout known now"),
    }
}

/// Value witnesses of a value type whose layout is known now. POD layouts
/// share the runtime's tables.
fn value_witnesses(kind: NominalKind, layout: FixedLayout) -> &'static ValueWitnessTable {
    if layout.pod {
        if let Some(shared) = pod_witnesses(layout.size, layout.align_mask) {
            return shared;
        }
    }
    let family = match (layout.pod, kind) {
        (true, _) => WitnessFamily::Pod,
        (false, NominalKind::Enum) => WitnessFamily::Enum,
        (false, NominalKind::Struct | NominalKind::Class) => WitnessFamily::Struct,
    };
    Box::leak(Box::new(witness_table(family, layout.type_layout())))
}

/// One fill operation per generic argument word, starting at `args`.
fn fill_ops(args: Option<usize>, count: usize) -> Vec<FillOp> {
    let start = args.map_or(0, |words| words as isize * WORD);
    (0..count)
        .map(|i| FillOp {
            source: to_u16(i),
            dest: start + i as isize * WORD,
        })
        .collect()
}

fn record_at(symbol: &str, start: usize, size: RecordSize) -> Result<MetadataRef> {
    MetadataRef::from_addr(start + size.address_point).ok_or_else(|| MetadataError::ImageAllocation {
        symbol: symbol.to_owned(),
        len: size.size,
    })
}

impl<S: CodegenSink> MetadataGenerator<'_, S> {
    /// What `id`'s metadata was emitted as, building it on first request.
    pub fn emitted(&mut self, id: DeclId) -> Result<Emitted> {
        Ok(self.built(id)?.emitted)
    }

    pub(super) fn built(&mut self, id: DeclId) -> Result<BuiltDecl> {
        match self.decls.get(&id) {
            Some(DeclState::Built(built)) => return Ok(built.clone()),
            Some(DeclState::Building(_)) => {
                return Err(MetadataError::unimplemented(
                    "declaration whose record needs itself to be laid out",
                ))
            }
            None => {}
        }
        let table = self.table;
        let decl = table.nominal(id).ok_or(MetadataError::UnknownDecl(id))?;
        self.decls.insert(id, DeclState::Building(Vec::new()));
        let result = match decl.kind {
            NominalKind::Class => self.build_class(id, decl),
            NominalKind::Struct | NominalKind::Enum => self.build_value(id, decl),
        };
        let pending = match self.decls.remove(&id) {
            Some(DeclState::Building(pending)) => pending,
            _ => Vec::new(),
        };
        let built = result?;
        for (cell, args) in pending {
            let source = match built.emitted {
                Emitted::Constant(record) | Emitted::Initialized { record, .. } => {
                    MetadataSource::Direct(record)
                }
                Emitted::Pattern(pattern) => MetadataSource::Generic { pattern, args },
            };
            // Each cell is leaked for one pending reference and set once.
            let _ = cell.set(source);
        }
        self.decls.insert(id, DeclState::Built(built.clone()));
        Ok(built)
    }

    fn has_pending(&self, id: DeclId) -> bool {
        matches!(self.decls.get(&id), Some(DeclState::Building(pending)) if !pending.is_empty())
    }

    fn build_value(&mut self, id: DeclId, decl: &NominalDecl) -> Result<BuiltDecl> {
        let params = unbound_params(decl);
        let info = self.type_info(&TypeRef::bound(id, params.clone()))?;
        let emitted = match info {
            TypeInfo::Fixed(layout) if !decl.is_generic() => {
                Emitted::Constant(self.concrete_value(id, decl, layout)?)
            }
            info => Emitted::Pattern(self.value_pattern(id, decl, &params, info)?),
        };
        Ok(BuiltDecl {
            emitted,
            class: None,
        })
    }

    fn static_layout(&self, decl: &NominalDecl, params: &[TypeRef]) -> Result<StaticLayout> {
        let cx = self.type_cx();
        match decl.kind {
            NominalKind::Struct | NominalKind::Class => {
                let mut elements = Vec::with_capacity(decl.fields.len());
                for field in &decl.fields {
                    elements.push(fixed_element(cx.field_info(field, params)?));
                }
                Ok(StaticLayout {
                    offsets: dynamic_pass(0, 0, elements).offsets.to_vec(),
                    payload_size: 0,
                })
            }
            NominalKind::Enum => {
                let mut payloads = Vec::new();
                for case in decl.payload_cases() {
                    let Some(payload) = &case.payload else {
                        continue;
                    };
                    payloads.push(if case.indirect || decl.indirect {
                        ElementLayout::pointer()
                    } else {
                        fixed_element(cx.type_info(&payload.substitute(params))?)
                    });
                }
                Ok(StaticLayout {
                    offsets: Vec::new(),
                    payload_size: max_payload(payloads).size,
                })
            }
        }
    }

    /// Runtime sources of the stored field types, or of the payload types
    /// of an enum's payload cases.
    fn field_type_sources(
        &mut self,
        decl: &NominalDecl,
        context: &ArgumentLayout,
    ) -> Result<Vec<FieldTypeSource>> {
        let mut sources = Vec::new();
        match decl.kind {
            NominalKind::Struct | NominalKind::Class => {
                for field in &decl.fields {
                    sources.push(FieldTypeSource {
                        source: self.metadata_source(&field.ty, Some(context))?,
                        indirect: false,
                    });
                }
            }
            NominalKind::Enum => {
                for case in decl.payload_cases() {
                    let Some(payload) = &case.payload else {
                        continue;
                    };
                    sources.push(FieldTypeSource {
                        source: self.metadata_source(payload, Some(context))?,
                        indirect: case.indirect || decl.indirect,
                    });
                }
            }
        }
        Ok(sources)
    }

    fn concrete_value(&mut self, id: DeclId, decl: &NominalDecl, layout: FixedLayout) -> Result<MetadataRef> {
        let statics = self.static_layout(decl, &[])?;
        let sources = self.field_type_sources(decl, &ArgumentLayout::default())?;
        let section = Section {
            decl: id,
            generic_words: 0,
            fields: sources.len(),
            pattern: false,
        };
        let accessor = FieldTypeAccessor::new(FieldTypeSlot::global(), sources).leak();
        let shape = RecordShape::value(decl.kind, section, false);
        let vector_words = match decl.kind {
            NominalKind::Enum => 0,
            NominalKind::Struct | NominalKind::Class => field_offsets_words(&shape, id).unwrap_or(0),
        };
        let descriptor = self.define_descriptor(id, decl, vector_words, accessor, None, 0)?;

        let witnesses = value_witnesses(decl.kind, layout);
        let kind = decl.kind.descriptor_kind().metadata_kind().as_word();
        let mut buffer = ConstantBuffer::new();
        let size = write_record(&mut buffer, &shape, |field| match field.slot {
            Slot::ValueWitnesses => SlotValue::Symbol(Symbol::address(witnesses)),
            Slot::Kind => SlotValue::Word(kind),
            Slot::Descriptor => SlotValue::Symbol(Symbol::global(descriptor.as_str())),
            Slot::FieldOffsets { .. } => SlotValue::Words(statics.offsets.clone()),
            _ => SlotValue::Zero,
        });
        self.define_record(id, decl, buffer, size)
    }

    fn value_pattern(
        &mut self,
        id: DeclId,
        decl: &NominalDecl,
        params: &[TypeRef],
        info: TypeInfo,
    ) -> Result<&'static GenericPattern> {
        let table = self.table;
        let name = table.name(decl.name);
        let context = ArgumentLayout::of(table, decl)?;
        let dependent = !info.is_fixed();
        let sources = self.field_type_sources(decl, &context)?;
        if dependent && self.has_pending(id) {
            return Err(MetadataError::unimplemented(
                "generic type whose layout depends on its own instances",
            ));
        }

        let section = Section {
            decl: id,
            generic_words: context.len(),
            fields: sources.len(),
            pattern: true,
        };
        let shape = RecordShape::value(decl.kind, section, dependent);
        let field_type_slot = slot_offset(&shape, Slot::FieldTypeSlot(id));
        let accessor =
            FieldTypeAccessor::new(FieldTypeSlot::InMetadata { offset: field_type_slot }, sources).leak();
        let args = generic_arguments_words(&shape, id);
        let vector_words = match decl.kind {
            NominalKind::Enum => payload_size_words(&shape),
            NominalKind::Struct | NominalKind::Class => field_offsets_words(&shape, id),
        };
        let global = decl_global(name, id.raw(), "pattern");
        let descriptor = self.define_descriptor(
            id,
            decl,
            vector_words.unwrap_or(0),
            accessor,
            Some(Symbol::global(global.as_str())),
            args.unwrap_or(0),
        )?;

        let statics = match info {
            TypeInfo::Fixed(layout) => Some((
                value_witnesses(decl.kind, layout),
                self.static_layout(decl, params)?,
            )),
            TypeInfo::NonFixed => None,
        };
        let create = CreateFunction {
            kind: decl.kind.descriptor_kind().metadata_kind(),
            fill_ops: fill_ops(args, context.len()),
            ancestor_copies: Vec::new(),
            dependent_witnesses: dependent.then(|| slot_offset(&shape, Slot::DependentWitnesses)),
            field_type_slot: Some(field_type_slot),
            superclass: None,
            init: match (dependent, decl.kind) {
                (false, _) => InitHook::None,
                (true, NominalKind::Enum) => InitHook::Enum,
                (true, NominalKind::Struct | NominalKind::Class) => InitHook::Struct,
            },
        }
        .leak();

        let kind = create.kind.as_word();
        let buffer = pattern_buffer(&shape, create, context.len(), |field| match field.slot {
            Slot::ValueWitnesses => statics
                .as_ref()
                .map_or(SlotValue::Zero, |(witnesses, _)| SlotValue::Symbol(Symbol::address(*witnesses))),
            Slot::Kind => SlotValue::Word(kind),
            Slot::Descriptor => SlotValue::Symbol(Symbol::global(descriptor.as_str())),
            Slot::FieldOffsets { .. } => statics
                .as_ref()
                .map_or(SlotValue::Zero, |(_, layout)| SlotValue::Words(layout.offsets.clone())),
            Slot::PayloadSize => SlotValue::Word(statics.as_ref().map_or(0, |(_, layout)| layout.payload_size)),
            _ => SlotValue::Zero,
        });
        self.install_pattern(decl, &global, buffer)
    }

    fn build_class(&mut self, id: DeclId, decl: &NominalDecl) -> Result<BuiltDecl> {
        if decl.foreign {
            return Err(MetadataError::unimplemented("descriptor for a foreign class"));
        }
        let table = self.table;
        let name = table.name(decl.name);
        let parent = match &decl.superclass {
            None => None,
            Some(TypeRef::Nominal { decl: superclass, .. }) => {
                let built = self.built(*superclass)?;
                let summary = built
                    .class
                    .ok_or(MetadataError::unimplemented("superclass that is not a class"))?;
                Some((built.emitted, summary))
            }
            Some(_) => return Err(MetadataError::unimplemented("superclass that is not a class")),
        };

        let context = ArgumentLayout::of(table, decl)?;
        let params = unbound_params(decl);
        let mut own = Vec::with_capacity(decl.fields.len());
        {
            let cx = self.type_cx();
            for field in &decl.fields {
                own.push(cx.field_info(field, &params)?);
            }
        }
        let own_dependent = own.iter().any(|info| !info.is_fixed());
        let pattern = decl.is_generic() || own_dependent;
        let runtime_base = parent.as_ref().is_some_and(|(_, summary)| summary.runtime);

        let mut sections = parent
            .as_ref()
            .map_or_else(Vec::new, |(_, summary)| summary.shape.sections.clone());
        sections.push(Section {
            decl: id,
            generic_words: context.len(),
            fields: decl.fields.len(),
            pattern,
        });
        let shape = RecordShape::class(sections);
        let size = record_size(&shape);

        let instance: Option<DynamicLayout> = (!own_dependent && !runtime_base).then(|| {
            let start = parent
                .as_ref()
                .and_then(|(_, summary)| summary.instance)
                .unwrap_or(ElementLayout::new(HEADER_SIZE, HEADER_ALIGN_MASK));
            dynamic_pass(
                start.size,
                start.align_mask,
                own.iter().filter_map(|info| info.fixed()).map(|layout| layout.element()),
            )
        });
        let summary = ClassSummary {
            shape: shape.clone(),
            runtime: pattern || runtime_base,
            instance: instance
                .as_ref()
                .map(|layout| ElementLayout::new(layout.size, layout.align_mask)),
        };

        let superclass = match &decl.superclass {
            Some(ty) => Some(self.metadata_source(ty, Some(&context))?),
            None => None,
        };
        if pattern && self.has_pending(id) {
            return Err(MetadataError::unimplemented(
                "generic class that inherits from its own instances",
            ));
        }
        let sources = self.field_type_sources(decl, &context)?;
        if pattern && (own_dependent || runtime_base) && self.has_pending(id) {
            return Err(MetadataError::unimplemented(
                "generic class whose layout depends on its own instances",
            ));
        }
        let field_type_slot = pattern.then(|| slot_offset(&shape, Slot::FieldTypeSlot(id)));
        let slot = field_type_slot.map_or_else(FieldTypeSlot::global, |offset| FieldTypeSlot::InMetadata {
            offset,
        });
        let accessor = FieldTypeAccessor::new(slot, sources).leak();
        let args = generic_arguments_words(&shape, id);
        let global = pattern.then(|| decl_global(name, id.raw(), "pattern"));
        let descriptor = self.define_descriptor(
            id,
            decl,
            field_offsets_words(&shape, id).unwrap_or(0),
            accessor,
            global.as_deref().map(Symbol::global),
            args.unwrap_or(0),
        )?;
        // The superclass record when all of it is known now.
        let parent_record = parent
            .as_ref()
            .filter(|(_, summary)| !summary.runtime)
            .and_then(|(emitted, _)| emitted.record());
        let witnesses = reference_witnesses(self.type_cx().class_refcounting(decl));
        let own_offsets = instance.as_ref().map(|layout| layout.offsets.to_vec());
        let (instance_size, instance_align) = instance
            .as_ref()
            .map_or((0, 0), |layout| (to_u32(layout.size), to_u16(layout.align_mask)));
        let value = |field: ScanField| match field.slot {
            Slot::HeapDestroyer => SlotValue::Symbol(Symbol::Runtime(RuntimeFn::DestroyClassInstance)),
            Slot::ValueWitnesses => SlotValue::Symbol(Symbol::address(witnesses)),
            Slot::Kind => SlotValue::Word(MetadataKind::Class.as_word()),
            Slot::Superclass => SlotValue::Word(parent_record.map_or(0, MetadataRef::addr)),
            Slot::RoData => SlotValue::Word(CLASS_RODATA_NATIVE_BIT),
            Slot::ClassFlags | Slot::InstanceAddressPoint => SlotValue::U32(0),
            Slot::InstanceSize => SlotValue::U32(instance_size),
            Slot::InstanceAlignMask => SlotValue::U16(instance_align),
            Slot::Reserved => SlotValue::U16(0),
            Slot::ClassSize => SlotValue::U32(to_u32(size.size)),
            Slot::ClassAddressPoint => SlotValue::U32(to_u32(size.address_point)),
            Slot::Descriptor => SlotValue::Symbol(Symbol::global(descriptor.as_str())),
            Slot::FieldOffsets { owner, .. } if owner == id => {
                own_offsets.clone().map_or(SlotValue::Zero, SlotValue::Words)
            }
            Slot::SectionParent(owner)
            | Slot::GenericArguments { owner, .. }
            | Slot::FieldOffsets { owner, .. }
            | Slot::FieldTypeSlot(owner)
                if owner != id =>
            {
                match parent_record {
                    Some(parent) => SlotValue::Words(
                        (0..field.size as isize / WORD)
                            .map(|i| parent.word(field.offset + i * WORD))
                            .collect(),
                    ),
                    None => SlotValue::Zero,
                }
            }
            _ => SlotValue::Zero,
        };

        let register_legacy = self.options.legacy_interop;
        let emitted = match global {
            None => {
                let mut buffer = ConstantBuffer::new();
                let size = write_record(&mut buffer, &shape, value);
                let record = self.define_record(id, decl, buffer, size)?;
                let init = ClassInit {
                    superclass: if runtime_base { superclass } else { None },
                    layout: runtime_base,
                    register_legacy,
                };
                if init.is_needed() {
                    // Blocks racing first callers; completion writes are not atomic.
                    let once = Once::new();
                    let accessor = MetadataAccessor::leak(decl_global(name, id.raw(), "accessor"), move || {
                        once.call_once(|| init.run(record));
                        record
                    });
                    Emitted::Initialized { record, accessor }
                } else {
                    Emitted::Constant(record)
                }
            }
            Some(global) => {
                let ancestor_copies = if runtime_base {
                    shape.sections[..shape.sections.len() - 1]
                        .iter()
                        .map(|section| AncestorCopy {
                            offset: slot_offset(&shape, Slot::SectionParent(section.decl)),
                            len_words: section.class_words(),
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                let create = CreateFunction {
                    kind: MetadataKind::Class,
                    fill_ops: fill_ops(args, context.len()),
                    ancestor_copies,
                    dependent_witnesses: None,
                    field_type_slot,
                    superclass,
                    init: InitHook::Class {
                        dependent_layout: own_dependent || runtime_base,
                        register_legacy,
                    },
                }
                .leak();
                let buffer = pattern_buffer(&shape, create, context.len(), value);
                Emitted::Pattern(self.install_pattern(decl, &global, buffer)?)
            }
        };
        Ok(BuiltDecl {
            emitted,
            class: Some(summary),
        })
    }

    fn define_record(
        &mut self,
        id: DeclId,
        decl: &NominalDecl,
        buffer: ConstantBuffer,
        size: RecordSize,
    ) -> Result<MetadataRef> {
        let name = self.table.name(decl.name);
        let global = decl_global(name, id.raw(), "metadata");
        let start = self.sink.define_constant(&global, Linkage::from(decl.linkage), buffer)?;
        let record = record_at(&global, start, size)?;
        tracing::debug!(decl = name, record = ?record.as_ptr(), size = size.size, "metadata record");
        Ok(record)
    }

    fn install_pattern(
        &mut self,
        decl: &NominalDecl,
        global: &str,
        buffer: ConstantBuffer,
    ) -> Result<&'static GenericPattern> {
        let name = self.table.name(decl.name);
        let start = self.sink.define_constant(global, Linkage::from(decl.linkage), buffer)?;
        // SAFETY: the sink materialized the pattern in memory it never
        // frees, and nothing has instantiated it yet
        let pattern = unsafe { GenericPattern::install(name, start as *mut PatternHeader) };
        let pattern = pattern.ok_or_else(|| MetadataError::UnresolvedSymbol {
            symbol: format!("{global}.create"),
        })?;
        tracing::debug!(decl = name, pattern = global, "generic pattern");
        Ok(pattern)
    }

    /// Define the descriptor of `decl` and its name constants, returning
    /// the descriptor's global.
    fn define_descriptor(
        &mut self,
        id: DeclId,
        decl: &NominalDecl,
        vector_words: usize,
        field_types: &'static FieldTypeAccessor,
        pattern: Option<Symbol>,
        generic_words: usize,
    ) -> Result<String> {
        let table = self.table;
        let name = table.name(decl.name);
        let name_global = decl_global(name, id.raw(), "name");
        self.sink
            .define_constant(&name_global, Linkage::Private, name_buffer(name))?;
        let field_names = if self.options.emit_field_names {
            let global = decl_global(name, id.raw(), "field_names");
            self.sink.define_constant(
                &global,
                Linkage::Private,
                names_buffer(member_names(table, decl)),
            )?;
            Some(Symbol::global(global))
        } else {
            None
        };
        let (field_word0, field_word1) = field_words(decl, to_u32(vector_words));
        let fields = DescriptorFields {
            kind: decl.kind.descriptor_kind(),
            name: Symbol::global(name_global),
            field_word0,
            field_word1,
            field_names,
            field_types: Some(field_types),
            pattern,
            generic_param_vector_offset: to_u32(generic_words),
            num_primary_params: to_u32(decl.num_primary_params()),
            witness_counts: witness_counts(table, decl)?,
        };
        let global = decl_global(name, id.raw(), "descriptor");
        self.sink
            .define_constant(&global, Linkage::from(decl.linkage), fields.buffer())?;
        Ok(global)
    }
}

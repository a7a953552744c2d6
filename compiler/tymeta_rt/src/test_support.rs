//! Hand-built records for runtime tests.
//!
//! Everything here is leaked, like the records the generator emits.

use std::ffi::c_char;

use tymeta_abi::{
    offsets, EnumCaseCounts, MetadataKind, NominalTypeKind, GENERIC_PATTERN_HEADER_SIZE,
    POINTER_SIZE,
};

use crate::descriptor::NominalTypeDescriptor;
use crate::field_types::{FieldTypeAccessor, FieldTypeSlot, FieldTypeSource};
use crate::heap::{HEADER_ALIGN_MASK, HEADER_SIZE};
use crate::instantiate::{CreateFunction, FillOp, GenericPattern, InitHook, PatternHeader};
use crate::layout::{dynamic_pass, enum_layout, max_payload, ElementLayout};
use crate::metadata::{write_u32, Metadata, MetadataRef, ValueWitnessTable};
use crate::source::MetadataSource;
use crate::witness::{table, TypeLayout, WitnessFamily};

pub(crate) const W: usize = POINTER_SIZE;

pub(crate) fn leak_words(words: Vec<usize>) -> *mut usize {
    Box::leak(words.into_boxed_slice()).as_mut_ptr()
}

pub(crate) fn leak_table(witnesses: ValueWitnessTable) -> usize {
    std::ptr::from_ref(Box::leak(Box::new(witnesses))) as usize
}

pub(crate) fn name(text: &'static str) -> *const c_char {
    assert!(text.ends_with('\0'));
    text.as_ptr().cast()
}

/// Fields of a descriptor that vary between tests.
pub(crate) struct DescriptorSpec {
    pub kind: NominalTypeKind,
    pub name: &'static str,
    pub field_word0: u32,
    pub field_word1: u32,
    pub field_names: *const c_char,
    pub accessor: Option<&'static FieldTypeAccessor>,
    pub pattern: *const PatternHeader,
    pub generic_param_vector_offset: u32,
    pub witness_counts: Vec<u32>,
}

impl DescriptorSpec {
    pub(crate) fn new(kind: NominalTypeKind, name: &'static str) -> Self {
        Self {
            kind,
            name,
            field_word0: 0,
            field_word1: 0,
            field_names: std::ptr::null(),
            accessor: None,
            pattern: std::ptr::null(),
            generic_param_vector_offset: 0,
            witness_counts: Vec::new(),
        }
    }

    /// Leak the descriptor with its witness counts trailing it.
    pub(crate) fn leak(self) -> &'static NominalTypeDescriptor {
        let fixed = std::mem::size_of::<NominalTypeDescriptor>();
        let bytes = fixed + 4 * self.witness_counts.len();
        let base = leak_words(vec![0; bytes.div_ceil(W)]).cast::<u8>();
        let n = self.witness_counts.len() as u32;
        // SAFETY: the buffer is word-aligned and large enough for both parts
        unsafe {
            base.cast::<NominalTypeDescriptor>().write(NominalTypeDescriptor {
                kind: self.kind.as_word(),
                name: name(self.name),
                field_word0: self.field_word0,
                field_word1: self.field_word1,
                field_names: self.field_names,
                field_type_accessor: self
                    .accessor
                    .map_or(std::ptr::null(), std::ptr::from_ref),
                generic_pattern: self.pattern,
                generic_param_vector_offset: self.generic_param_vector_offset,
                num_generic_params: n,
                num_primary_params: n,
            });
            for (i, &count) in self.witness_counts.iter().enumerate() {
                write_u32(base, (fixed + 4 * i) as isize, count);
            }
            &*base.cast::<NominalTypeDescriptor>()
        }
    }
}

fn record(words: Vec<usize>, address_point_words: usize) -> MetadataRef {
    let base = leak_words(words);
    // SAFETY: the address point lies inside the leaked words
    MetadataRef::new(unsafe { base.add(address_point_words) }.cast()).unwrap()
}

fn direct_fields(fields: &[MetadataRef]) -> Vec<FieldTypeSource> {
    fields
        .iter()
        .map(|&f| FieldTypeSource {
            source: MetadataSource::Direct(f),
            indirect: false,
        })
        .collect()
}

/// A non-generic struct record: `[vwt][kind][descriptor][parent][offsets]`.
pub(crate) fn struct_record(name: &'static str, fields: &[MetadataRef]) -> MetadataRef {
    let layout = dynamic_pass(0, 0, fields.iter().map(|&f| ElementLayout::of(f)));
    let witnesses = table(
        WitnessFamily::Struct,
        TypeLayout {
            size: layout.size,
            align_mask: layout.align_mask,
            pod: fields.iter().all(|f| f.is_pod()),
            extra_inhabitants: false,
        },
    );
    let accessor = FieldTypeAccessor::new(FieldTypeSlot::global(), direct_fields(fields)).leak();
    let descriptor = DescriptorSpec {
        field_word0: fields.len() as u32,
        field_word1: (offsets::VALUE_MEMBERS as usize / W) as u32,
        accessor: Some(accessor),
        ..DescriptorSpec::new(NominalTypeKind::Struct, name)
    }
    .leak();
    let mut words = vec![
        leak_table(witnesses),
        MetadataKind::Struct.as_word(),
        std::ptr::from_ref(descriptor) as usize,
        0,
    ];
    words.extend(layout.offsets.iter().copied());
    record(words, 1)
}

/// A non-generic enum record: `[vwt][kind][descriptor][parent]`.
pub(crate) fn enum_record(
    name: &'static str,
    payloads: &[(MetadataRef, bool)],
    empty_cases: u32,
) -> MetadataRef {
    let payload = max_payload(payloads.iter().map(|&(p, indirect)| {
        if indirect {
            ElementLayout::pointer()
        } else {
            ElementLayout::of(p)
        }
    }));
    let value = enum_layout(payload, payloads.len() + empty_cases as usize);
    let witnesses = table(
        WitnessFamily::Enum,
        TypeLayout {
            size: value.size,
            align_mask: value.align_mask,
            pod: payloads.iter().all(|&(p, indirect)| p.is_pod() && !indirect),
            extra_inhabitants: false,
        },
    );
    let sources = payloads
        .iter()
        .map(|&(p, indirect)| FieldTypeSource {
            source: MetadataSource::Direct(p),
            indirect,
        })
        .collect();
    let accessor = FieldTypeAccessor::new(FieldTypeSlot::global(), sources).leak();
    let descriptor = DescriptorSpec {
        field_word0: EnumCaseCounts::new(payloads.len() as u32, 0).bits(),
        field_word1: empty_cases,
        accessor: Some(accessor),
        ..DescriptorSpec::new(NominalTypeKind::Enum, name)
    }
    .leak();
    record(
        vec![
            leak_table(witnesses),
            MetadataKind::Enum.as_word(),
            std::ptr::from_ref(descriptor) as usize,
            0,
        ],
        1,
    )
}

/// Words from a class record's start to its address point.
pub(crate) const CLASS_ADDRESS_POINT_WORDS: usize = 2;

/// Words of the fixed class prefix before the first member section.
pub(crate) fn class_members_words() -> usize {
    offsets::CLASS_MEMBERS as usize / W
}

/// A non-generic class record with one member section:
/// `[parent][field offsets]`, laid out after `superclass`'s instance.
pub(crate) fn class_record(
    name: &'static str,
    superclass: Option<MetadataRef>,
    fields: &[MetadataRef],
) -> MetadataRef {
    let inherited_words = superclass.map_or(0, |s| {
        (s.u32_at(offsets::CLASS_SIZE) as isize - s.u32_at(offsets::CLASS_ADDRESS_POINT) as isize
            - offsets::CLASS_MEMBERS) as usize
            / W
    });
    let own_section = class_members_words() + inherited_words;
    let start = superclass.map_or(ElementLayout::new(HEADER_SIZE, HEADER_ALIGN_MASK), |s| {
        crate::class::instance_layout(s)
    });
    let layout = dynamic_pass(
        start.size,
        start.align_mask,
        fields.iter().map(|&f| ElementLayout::of(f)),
    );
    let accessor = FieldTypeAccessor::new(FieldTypeSlot::global(), direct_fields(fields)).leak();
    let descriptor = DescriptorSpec {
        field_word0: fields.len() as u32,
        field_word1: (own_section + 1) as u32,
        accessor: Some(accessor),
        ..DescriptorSpec::new(NominalTypeKind::Class, name)
    }
    .leak();

    let total_words = CLASS_ADDRESS_POINT_WORDS + own_section + 1 + fields.len();
    let mut words = vec![0; total_words];
    words[0] = crate::symbols::runtime_address(tymeta_abi::RuntimeFn::DestroyClassInstance);
    words[1] = std::ptr::from_ref(&crate::witness::NATIVE_OBJECT_WITNESSES) as usize;
    let ap = CLASS_ADDRESS_POINT_WORDS;
    words[ap] = MetadataKind::Class.as_word();
    words[ap + 1] = superclass.map_or(0, MetadataRef::addr);
    words[ap + 4] = tymeta_abi::CLASS_RODATA_NATIVE_BIT;
    if let Some(s) = superclass {
        for i in class_members_words()..own_section {
            words[ap + i] = s.word((i * W) as isize);
        }
    }
    words[ap + own_section] = 0;
    for (i, &offset) in layout.offsets.iter().enumerate() {
        words[ap + own_section + 1 + i] = offset;
    }
    let metadata = record(words, ap);
    let base = metadata.as_ptr().cast_mut().cast::<u8>();
    // SAFETY: the record is fresh and private to the test
    unsafe {
        write_u32(base, offsets::CLASS_INSTANCE_SIZE, layout.size as u32);
        crate::metadata::write_u16(
            base,
            offsets::CLASS_INSTANCE_ALIGN_MASK,
            layout.align_mask as u16,
        );
        write_u32(base, offsets::CLASS_SIZE, (total_words * W) as u32);
        write_u32(base, offsets::CLASS_ADDRESS_POINT, (ap * W) as u32);
        crate::metadata::write_word(
            base,
            offsets::CLASS_DESCRIPTOR,
            std::ptr::from_ref(descriptor) as usize,
        );
    }
    metadata
}

/// Word offsets of the generic struct template built by
/// [`generic_pair_pattern`], relative to the address point.
pub(crate) mod pair {
    use super::W;

    pub const OFFSETS: usize = 3;
    pub const ARGS: usize = 5;
    pub const FIELD_TYPES: usize = 7;
    pub const WITNESSES: usize = 8;
    /// Template words, including the value-witness word before the address
    /// point and the five-word dependent table.
    pub const TEMPLATE_WORDS: usize = 14;

    pub const fn offset(words: usize) -> isize {
        (words * W) as isize
    }
}

/// A zeroed pattern: header followed by `template_words` template words.
pub(crate) fn pattern_buffer(template_words: usize) -> (*mut PatternHeader, *mut usize) {
    let header_words = GENERIC_PATTERN_HEADER_SIZE / W;
    let base = leak_words(vec![0; header_words + template_words]);
    // SAFETY: the template follows the header inside the buffer
    (base.cast(), unsafe { base.add(header_words) })
}

/// Fill in a pattern header and attach its runtime owner.
///
/// # Safety
/// `header` must come from [`pattern_buffer`] with `template_words` words.
pub(crate) unsafe fn install_pattern(
    name: &str,
    header: *mut PatternHeader,
    template_words: usize,
    address_point_words: usize,
    num_arguments: u16,
    create: CreateFunction,
) -> &'static GenericPattern {
    header.write(PatternHeader {
        create_function: create.leak(),
        metadata_size: (template_words * W) as u32,
        num_arguments,
        address_point: (address_point_words * W) as u16,
        private_data: [0; tymeta_abi::NUM_GENERIC_METADATA_PRIVATE_DATA_WORDS],
    });
    GenericPattern::install(name, header).unwrap()
}

/// `struct Pair<A, B> { a: A, b: B }` as an installed generic pattern.
pub(crate) fn generic_pair_pattern(name: &'static str) -> &'static GenericPattern {
    let (header, template) = pattern_buffer(pair::TEMPLATE_WORDS);

    let accessor = FieldTypeAccessor::new(
        FieldTypeSlot::InMetadata {
            offset: pair::offset(pair::FIELD_TYPES),
        },
        vec![
            FieldTypeSource {
                source: MetadataSource::Argument(0),
                indirect: false,
            },
            FieldTypeSource {
                source: MetadataSource::Argument(1),
                indirect: false,
            },
        ],
    )
    .leak();
    let descriptor = DescriptorSpec {
        field_word0: 2,
        field_word1: pair::OFFSETS as u32,
        accessor: Some(accessor),
        pattern: header,
        generic_param_vector_offset: pair::ARGS as u32,
        witness_counts: vec![0, 0],
        ..DescriptorSpec::new(NominalTypeKind::Struct, name)
    }
    .leak();
    let create = CreateFunction {
        kind: MetadataKind::Struct,
        fill_ops: vec![
            FillOp {
                source: 0,
                dest: pair::offset(pair::ARGS),
            },
            FillOp {
                source: 1,
                dest: pair::offset(pair::ARGS + 1),
            },
        ],
        ancestor_copies: Vec::new(),
        dependent_witnesses: Some(pair::offset(pair::WITNESSES)),
        field_type_slot: Some(pair::offset(pair::FIELD_TYPES)),
        superclass: None,
        init: InitHook::Struct,
    };

    // SAFETY: the buffer is private until install returns
    unsafe {
        template.add(1).write(MetadataKind::Struct.as_word());
        template.add(2).write(std::ptr::from_ref(descriptor) as usize);
        install_pattern(
            name.trim_end_matches('\0'),
            header,
            pair::TEMPLATE_WORDS,
            1,
            2,
            create,
        )
    }
}

pub(crate) fn as_metadata(ptr: *const Metadata) -> MetadataRef {
    MetadataRef::new(ptr).unwrap()
}

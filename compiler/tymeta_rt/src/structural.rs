//! Structural metadata: tuples, functions, metatypes and existentials.
//!
//! These records are built at runtime on first request and uniqued by a
//! process-wide insert-if-absent cache keyed by their components. A record
//! is only built while its cache entry is vacant, so no duplicate is ever
//! allocated.

use std::ffi::c_char;
use std::ptr::NonNull;
use std::sync::LazyLock;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use smallvec::SmallVec;
use tymeta_abi::{
    ExistentialTypeFlags, FunctionMetadataConvention, FunctionTypeFlags, MetadataKind,
    ProtocolClassConstraint, ReferenceCounting, SpecialProtocol, POINTER_ALIGN_MASK, POINTER_SIZE,
};

use crate::descriptor::ProtocolDescriptor;
use crate::layout::{dynamic_pass, ElementLayout};
use crate::metadata::{Metadata, MetadataRef, ValueWitnessTable};
use crate::witness::{
    empty_tuple_metadata, reference_witnesses, table, TypeLayout, WitnessFamily,
    BLOCK_WITNESSES, POD_WITNESSES_WORD, THICK_FUNCTION_WITNESSES,
};

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
enum StructuralKey {
    Tuple {
        elements: SmallVec<[usize; 4]>,
        labels: usize,
    },
    Function {
        flags: FunctionTypeFlags,
        params: SmallVec<[usize; 4]>,
        result: usize,
    },
    Metatype(usize),
    ExistentialMetatype(usize),
    Existential(SmallVec<[usize; 4]>),
}

static RECORDS: LazyLock<DashMap<StructuralKey, MetadataRef>> = LazyLock::new(DashMap::new);

fn uniqued(key: StructuralKey, build: impl FnOnce() -> MetadataRef) -> MetadataRef {
    if let Some(hit) = RECORDS.get(&key) {
        return *hit;
    }
    match RECORDS.entry(key) {
        Entry::Occupied(existing) => *existing.get(),
        Entry::Vacant(slot) => {
            let record = build();
            tracing::debug!(key = ?slot.key(), metadata = ?record.as_ptr(), "structural metadata");
            *slot.insert(record)
        }
    }
}

/// Leak a `[value witnesses][kind][...]` word record; the address point is
/// word 1.
fn leak_record(words: Vec<usize>) -> MetadataRef {
    let words: &'static [usize] = Box::leak(words.into_boxed_slice());
    MetadataRef::from_non_null(NonNull::from(&words[1]).cast())
}

fn leak_table(witnesses: ValueWitnessTable) -> usize {
    std::ptr::from_ref(Box::leak(Box::new(witnesses))) as usize
}

fn table_addr(table: &'static ValueWitnessTable) -> usize {
    std::ptr::from_ref(table) as usize
}

// === Tuples ===

/// Tuple metadata. No elements gives the canonical empty tuple; one
/// unlabeled element gives the element's own metadata.
pub fn tuple_metadata(elements: &[MetadataRef], labels: *const c_char) -> MetadataRef {
    match elements {
        [] => return empty_tuple_metadata(),
        [single] if labels.is_null() => return *single,
        _ => {}
    }
    let key = StructuralKey::Tuple {
        elements: elements.iter().map(|m| m.addr()).collect(),
        labels: labels as usize,
    };
    uniqued(key, || {
        let layout = dynamic_pass(0, 0, elements.iter().map(|&m| ElementLayout::of(m)));
        let witnesses = table(
            WitnessFamily::Tuple,
            TypeLayout {
                size: layout.size,
                align_mask: layout.align_mask,
                pod: elements.iter().all(|m| m.is_pod()),
                extra_inhabitants: false,
            },
        );
        let mut words = vec![
            leak_table(witnesses),
            MetadataKind::Tuple.as_word(),
            elements.len(),
            labels as usize,
        ];
        for (element, offset) in elements.iter().zip(&layout.offsets) {
            words.extend([element.addr(), *offset]);
        }
        leak_record(words)
    })
}

fn tuple_ptr(elements: &[*const Metadata], labels: *const c_char) -> *const Metadata {
    let elements: Option<SmallVec<[MetadataRef; 4]>> =
        elements.iter().map(|&e| MetadataRef::new(e)).collect();
    elements.map_or(std::ptr::null(), |e| tuple_metadata(&e, labels).as_ptr())
}

#[no_mangle]
pub extern "C" fn tymeta_get_tuple_metadata(
    num_elements: usize,
    elements: *const *const Metadata,
    labels: *const c_char,
) -> *const Metadata {
    if num_elements == 0 {
        return empty_tuple_metadata().as_ptr();
    }
    if elements.is_null() {
        return std::ptr::null();
    }
    // SAFETY: elements holds num_elements metadata pointers
    let elements = unsafe { std::slice::from_raw_parts(elements, num_elements) };
    tuple_ptr(elements, labels)
}

#[no_mangle]
pub extern "C" fn tymeta_get_tuple_metadata2(
    elt0: *const Metadata,
    elt1: *const Metadata,
    labels: *const c_char,
) -> *const Metadata {
    tuple_ptr(&[elt0, elt1], labels)
}

#[no_mangle]
pub extern "C" fn tymeta_get_tuple_metadata3(
    elt0: *const Metadata,
    elt1: *const Metadata,
    elt2: *const Metadata,
    labels: *const c_char,
) -> *const Metadata {
    tuple_ptr(&[elt0, elt1, elt2], labels)
}

// === Functions ===

/// Parameter words carry the `inout` flag in bit 0.
const INOUT_BIT: usize = 1;

fn function_witnesses(flags: FunctionTypeFlags) -> &'static ValueWitnessTable {
    match flags.convention() {
        Some(FunctionMetadataConvention::Thin | FunctionMetadataConvention::CFunctionPointer) => {
            &POD_WITNESSES_WORD
        }
        Some(FunctionMetadataConvention::Block) => &BLOCK_WITNESSES,
        Some(FunctionMetadataConvention::Swift) | None => &THICK_FUNCTION_WITNESSES,
    }
}

/// Function type metadata. The argument count in `flags` is replaced by the
/// actual parameter count.
pub fn function_metadata(
    flags: FunctionTypeFlags,
    params: &[(MetadataRef, bool)],
    result: MetadataRef,
) -> MetadataRef {
    let flags = flags.with_num_arguments(params.len());
    let param_words: SmallVec<[usize; 4]> = params
        .iter()
        .map(|&(p, inout)| p.addr() | if inout { INOUT_BIT } else { 0 })
        .collect();
    let key = StructuralKey::Function {
        flags,
        params: param_words.clone(),
        result: result.addr(),
    };
    uniqued(key, || {
        let mut words = vec![
            table_addr(function_witnesses(flags)),
            MetadataKind::Function.as_word(),
            flags.bits(),
            result.addr(),
        ];
        words.extend(param_words);
        leak_record(words)
    })
}

/// Parameter metadata and `inout` flag of a function record.
pub fn function_parameters(function: MetadataRef) -> Vec<(MetadataRef, bool)> {
    let flags = FunctionTypeFlags::from_bits(function.word(tymeta_abi::offsets::FUNCTION_FLAGS));
    (0..flags.num_arguments())
        .filter_map(|i| {
            let word = function
                .word(tymeta_abi::offsets::FUNCTION_ARGUMENTS + (i * POINTER_SIZE) as isize);
            Some((MetadataRef::from_addr(word & !INOUT_BIT)?, word & INOUT_BIT != 0))
        })
        .collect()
}

fn function_ptr(flags: usize, args: &[usize], result: *const Metadata) -> *const Metadata {
    let params: Option<SmallVec<[(MetadataRef, bool); 4]>> = args
        .iter()
        .map(|&w| Some((MetadataRef::from_addr(w & !INOUT_BIT)?, w & INOUT_BIT != 0)))
        .collect();
    match (params, MetadataRef::new(result)) {
        (Some(params), Some(result)) => {
            function_metadata(FunctionTypeFlags::from_bits(flags), &params, result).as_ptr()
        }
        _ => std::ptr::null(),
    }
}

/// `flags_args_result` is `[flags][argument words...][result]`, with the
/// argument count taken from the flags.
#[no_mangle]
pub extern "C" fn tymeta_get_function_metadata(flags_args_result: *const usize) -> *const Metadata {
    if flags_args_result.is_null() {
        return std::ptr::null();
    }
    // SAFETY: the array starts with a flags word describing its length
    unsafe {
        let flags = flags_args_result.read();
        let count = FunctionTypeFlags::from_bits(flags).num_arguments();
        let args = std::slice::from_raw_parts(flags_args_result.add(1), count);
        let result = flags_args_result.add(1 + count).read() as *const Metadata;
        function_ptr(flags, args, result)
    }
}

#[no_mangle]
pub extern "C" fn tymeta_get_function_metadata1(
    flags: usize,
    arg0: usize,
    result: *const Metadata,
) -> *const Metadata {
    function_ptr(flags, &[arg0], result)
}

#[no_mangle]
pub extern "C" fn tymeta_get_function_metadata2(
    flags: usize,
    arg0: usize,
    arg1: usize,
    result: *const Metadata,
) -> *const Metadata {
    function_ptr(flags, &[arg0, arg1], result)
}

#[no_mangle]
pub extern "C" fn tymeta_get_function_metadata3(
    flags: usize,
    arg0: usize,
    arg1: usize,
    arg2: usize,
    result: *const Metadata,
) -> *const Metadata {
    function_ptr(flags, &[arg0, arg1, arg2], result)
}

// === Metatypes ===

pub fn metatype_metadata(instance: MetadataRef) -> MetadataRef {
    uniqued(StructuralKey::Metatype(instance.addr()), || {
        leak_record(vec![
            table_addr(&POD_WITNESSES_WORD),
            MetadataKind::Metatype.as_word(),
            instance.addr(),
        ])
    })
}

/// Metatype of an existential. Carries the existential's flags.
pub fn existential_metatype_metadata(instance: MetadataRef) -> MetadataRef {
    uniqued(StructuralKey::ExistentialMetatype(instance.addr()), || {
        let flags = if instance.kind() == Some(MetadataKind::Existential) {
            ExistentialTypeFlags::from_bits(instance.word(tymeta_abi::offsets::EXISTENTIAL_FLAGS))
        } else {
            ExistentialTypeFlags::new()
        };
        let size = (1 + flags.num_witness_tables()) * POINTER_SIZE;
        leak_record(vec![
            leak_table(table(WitnessFamily::Pod, TypeLayout::pod(size, POINTER_ALIGN_MASK))),
            MetadataKind::ExistentialMetatype.as_word(),
            instance.addr(),
            flags.bits(),
        ])
    })
}

#[no_mangle]
pub extern "C" fn tymeta_get_metatype_metadata(instance: *const Metadata) -> *const Metadata {
    MetadataRef::new(instance).map_or(std::ptr::null(), |m| metatype_metadata(m).as_ptr())
}

#[no_mangle]
pub extern "C" fn tymeta_get_existential_metatype_metadata(
    instance: *const Metadata,
) -> *const Metadata {
    MetadataRef::new(instance)
        .map_or(std::ptr::null(), |m| existential_metatype_metadata(m).as_ptr())
}

// === Existentials ===

/// Existential flags for a protocol composition.
pub fn existential_flags(protocols: &[usize]) -> ExistentialTypeFlags {
    let mut witness_tables = 0;
    let mut class_bound = false;
    let mut special = SpecialProtocol::None;
    for &addr in protocols {
        // SAFETY: existential records are built from emitted protocol descriptors
        let Some(desc) = (unsafe { ProtocolDescriptor::from_addr(addr) }) else {
            continue;
        };
        let flags = desc.flags();
        if flags.needs_witness_table() {
            witness_tables += 1;
        }
        class_bound |= flags.class_constraint() == ProtocolClassConstraint::Class;
        if protocols.len() == 1 {
            special = flags.special_protocol().unwrap_or(SpecialProtocol::None);
        }
    }
    ExistentialTypeFlags::new()
        .with_num_witness_tables(witness_tables)
        .with_class_constraint(if class_bound {
            ProtocolClassConstraint::Class
        } else {
            ProtocolClassConstraint::Any
        })
        .with_special_protocol(special)
}

fn existential_witnesses(flags: ExistentialTypeFlags) -> usize {
    let tables = flags.num_witness_tables();
    if flags.special_protocol() == Some(SpecialProtocol::ErrorType) {
        return table_addr(reference_witnesses(ReferenceCounting::Error));
    }
    let (family, words) = match flags.class_constraint() {
        ProtocolClassConstraint::Class => (WitnessFamily::ClassExistential, 1 + tables),
        ProtocolClassConstraint::Any => (WitnessFamily::Existential, 2 + tables),
    };
    leak_table(table(
        family,
        TypeLayout {
            size: words * POINTER_SIZE,
            align_mask: POINTER_ALIGN_MASK,
            pod: false,
            extra_inhabitants: true,
        },
    ))
}

/// Existential metadata for a protocol composition. Protocol order and
/// duplicates do not matter.
pub fn existential_metadata(protocols: &[usize]) -> MetadataRef {
    let mut sorted: SmallVec<[usize; 4]> = protocols.iter().copied().collect();
    sorted.sort_unstable();
    sorted.dedup();
    uniqued(StructuralKey::Existential(sorted.clone()), || {
        let flags = existential_flags(&sorted);
        let mut words = vec![
            existential_witnesses(flags),
            MetadataKind::Existential.as_word(),
            flags.bits(),
            sorted.len(),
        ];
        words.extend(sorted.iter().copied());
        leak_record(words)
    })
}

#[no_mangle]
pub extern "C" fn tymeta_get_existential_metadata(
    num_protocols: usize,
    protocols: *const usize,
) -> *const Metadata {
    if num_protocols == 0 {
        return existential_metadata(&[]).as_ptr();
    }
    if protocols.is_null() {
        return std::ptr::null();
    }
    // SAFETY: protocols holds num_protocols descriptor addresses
    let protocols = unsafe { std::slice::from_raw_parts(protocols, num_protocols) };
    existential_metadata(protocols).as_ptr()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

//! Nominal type descriptors.
//!
//! A descriptor is the part of a type's identity shared by every instance:
//! kind, name, stored field (or case) names and counts, the field-type
//! accessor and the generic parameter section. Each parameter's count of
//! witness tables follows the fixed part as a `u32`.

use std::mem::{offset_of, size_of};

use tymeta_abi::{EnumCaseCounts, NominalTypeKind, POINTER_ALIGN_MASK};
use tymeta_ir::{DeclTable, NominalDecl, NominalKind};
use tymeta_rt::descriptor::NominalTypeDescriptor;
use tymeta_rt::FieldTypeAccessor;

use crate::buffer::ConstantBuffer;
use crate::error::{MetadataError, Result};
use crate::symbol::Symbol;

/// Everything a descriptor holds, resolved to symbols.
pub struct DescriptorFields {
    pub kind: NominalTypeKind,
    pub name: Symbol,
    /// Struct/class: field count. Enum: packed case counts.
    pub field_word0: u32,
    /// Struct/class: field-offset vector offset in words. Enum: empty cases.
    pub field_word1: u32,
    pub field_names: Option<Symbol>,
    pub field_types: Option<&'static FieldTypeAccessor>,
    pub pattern: Option<Symbol>,
    /// Offset in words of the generic argument vector from the address point.
    pub generic_param_vector_offset: u32,
    pub num_primary_params: u32,
    pub witness_counts: Vec<u32>,
}

fn at(buffer: &ConstantBuffer, expected: usize, field: &str) {
    assert_eq!(
        buffer.len(),
        expected,
        "descriptor field `{field}` out of place"
    );
}

fn add_optional(buffer: &mut ConstantBuffer, symbol: Option<Symbol>) {
    match symbol {
        Some(symbol) => buffer.add_symbol(symbol),
        None => buffer.add_word(0),
    }
}

impl DescriptorFields {
    pub fn buffer(self) -> ConstantBuffer {
        let mut buffer = ConstantBuffer::new();
        buffer.add_word(self.kind.as_word());
        at(&buffer, offset_of!(NominalTypeDescriptor, name), "name");
        buffer.add_symbol(self.name);
        at(&buffer, offset_of!(NominalTypeDescriptor, field_word0), "field_word0");
        buffer.add_u32(self.field_word0);
        buffer.add_u32(self.field_word1);
        at(&buffer, offset_of!(NominalTypeDescriptor, field_names), "field_names");
        add_optional(&mut buffer, self.field_names);
        add_optional(&mut buffer, self.field_types.map(Symbol::address));
        at(
            &buffer,
            offset_of!(NominalTypeDescriptor, generic_pattern),
            "generic_pattern",
        );
        add_optional(&mut buffer, self.pattern);
        buffer.add_u32(self.generic_param_vector_offset);
        buffer.add_u32(len_u32(self.witness_counts.len()));
        at(
            &buffer,
            offset_of!(NominalTypeDescriptor, num_primary_params),
            "num_primary_params",
        );
        buffer.add_u32(self.num_primary_params);
        buffer.align_to(POINTER_ALIGN_MASK);
        at(&buffer, size_of::<NominalTypeDescriptor>(), "witness_counts");
        for count in self.witness_counts {
            buffer.add_u32(count);
        }
        buffer
    }
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Witness tables carried by each generic parameter of `decl`.
pub fn witness_counts(table: &DeclTable, decl: &NominalDecl) -> Result<Vec<u32>> {
    decl.generic_params
        .iter()
        .map(|param| {
            let mut count = 0;
            for &id in &param.conformances {
                let protocol = table
                    .protocol(id)
                    .ok_or(MetadataError::UnknownProtocol(id))?;
                if protocol.needs_witness_table() {
                    count += 1;
                }
            }
            Ok(count)
        })
        .collect()
}

/// The two field words of `decl`'s descriptor.
///
/// `vector_words` is the field-offset vector offset (struct/class) or the
/// payload-size offset, zero when there is none (enum).
pub fn field_words(decl: &NominalDecl, vector_words: u32) -> (u32, u32) {
    match decl.kind {
        NominalKind::Struct | NominalKind::Class => (len_u32(decl.fields.len()), vector_words),
        NominalKind::Enum => (
            EnumCaseCounts::new(len_u32(decl.payload_cases().count()), vector_words).bits(),
            len_u32(decl.empty_cases().count()),
        ),
    }
}

/// Stored field names, or case names with payload cases first.
pub fn member_names<'t>(table: &'t DeclTable, decl: &NominalDecl) -> Vec<&'t str> {
    match decl.kind {
        NominalKind::Struct | NominalKind::Class => {
            decl.fields.iter().map(|f| table.name(f.name)).collect()
        }
        NominalKind::Enum => decl
            .payload_cases()
            .chain(decl.empty_cases())
            .map(|c| table.name(c.name))
            .collect(),
    }
}

/// A NUL-terminated string constant.
pub fn name_buffer(text: &str) -> ConstantBuffer {
    let mut buffer = ConstantBuffer::new();
    buffer.add_bytes(text.as_bytes());
    buffer.add_bytes(&[0]);
    buffer
}

/// NUL-terminated names followed by an empty name.
pub fn names_buffer<'a>(names: impl IntoIterator<Item = &'a str>) -> ConstantBuffer {
    let mut buffer = ConstantBuffer::new();
    for name in names {
        buffer.add_bytes(name.as_bytes());
        buffer.add_bytes(&[0]);
    }
    buffer.add_bytes(&[0]);
    buffer
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

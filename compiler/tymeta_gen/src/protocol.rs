//! Protocol descriptors.
//!
//! `[null isa][name][inherited list or null][5 null legacy tables]
//! [u32 size][u32 flags]`. The inherited list is its own constant: a count
//! word followed by the inherited descriptors.

use std::mem::{offset_of, size_of};

use tymeta_abi::{ProtocolClassConstraint, ProtocolDescriptorFlags};
use tymeta_ir::{DeclTable, ProtocolDecl, ProtocolId};
use tymeta_rt::descriptor::ProtocolDescriptor;

use crate::buffer::ConstantBuffer;
use crate::descriptor::name_buffer;
use crate::error::{MetadataError, Result};
use crate::symbol::{decl_global, Symbol};

pub fn protocol_flags(decl: &ProtocolDecl) -> ProtocolDescriptorFlags {
    let constraint = if decl.class_bound {
        ProtocolClassConstraint::Class
    } else {
        ProtocolClassConstraint::Any
    };
    ProtocolDescriptorFlags::new()
        .with_source_defined(decl.source_defined)
        .with_class_constraint(constraint)
        .with_dispatch_strategy(decl.dispatch)
        .with_special_protocol(decl.special)
}

/// Global name of protocol `id`'s descriptor.
pub fn protocol_global(table: &DeclTable, id: ProtocolId) -> Result<String> {
    let decl = table.protocol(id).ok_or(MetadataError::UnknownProtocol(id))?;
    Ok(decl_global(table.name(decl.name), id.raw(), "protocol"))
}

/// The constants making up one protocol descriptor, in definition order.
pub struct ProtocolConstants {
    pub descriptor: String,
    pub constants: Vec<(String, ConstantBuffer)>,
    /// Protocols whose descriptors the inherited list refers to.
    pub inherited: Vec<ProtocolId>,
}

pub fn protocol_constants(table: &DeclTable, id: ProtocolId) -> Result<ProtocolConstants> {
    let decl = table.protocol(id).ok_or(MetadataError::UnknownProtocol(id))?;
    let name = table.name(decl.name);
    let descriptor = decl_global(name, id.raw(), "protocol");
    let name_global = decl_global(name, id.raw(), "name");
    let mut constants = vec![(name_global.clone(), name_buffer(name))];

    let inherited_global = if decl.inherited.is_empty() {
        None
    } else {
        let mut list = ConstantBuffer::new();
        list.add_word(decl.inherited.len());
        for &parent in &decl.inherited {
            list.add_symbol(Symbol::global(protocol_global(table, parent)?));
        }
        let global = decl_global(name, id.raw(), "inherited");
        constants.push((global.clone(), list));
        Some(global)
    };

    let mut buffer = ConstantBuffer::new();
    buffer.add_word(0);
    buffer.add_symbol(Symbol::global(name_global));
    match inherited_global {
        Some(global) => buffer.add_symbol(Symbol::global(global)),
        None => buffer.add_word(0),
    }
    assert_eq!(
        buffer.len(),
        offset_of!(ProtocolDescriptor, legacy_tables),
        "protocol descriptor legacy tables out of place"
    );
    buffer.add_zeros(5 * size_of::<usize>());
    let size = u32::try_from(size_of::<ProtocolDescriptor>()).unwrap_or(u32::MAX);
    buffer.add_u32(size);
    assert_eq!(
        buffer.len(),
        offset_of!(ProtocolDescriptor, flags),
        "protocol descriptor flags out of place"
    );
    buffer.add_u32(protocol_flags(decl).bits());
    tracing::trace!(protocol = name, flags = protocol_flags(decl).bits(), "protocol descriptor");

    constants.push((descriptor.clone(), buffer));
    Ok(ProtocolConstants {
        descriptor,
        constants,
        inherited: decl.inherited.clone(),
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

//! Generator errors.
//!
//! Only conditions a caller can act on are errors. Violations of the record
//! layout rules are bugs in the generator itself and assert instead.

use std::fmt;

use tymeta_ir::{DeclId, ProtocolId};

/// Error codes for metadata generation.
///
/// Format: E5xxx.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// A construct the generator does not support
    E5001,
    /// A declaration id that is not in the table
    E5002,
    /// A protocol id that is not in the table
    E5003,
    /// Wrong number of generic arguments
    E5004,
    /// A constant refers to a symbol that was never defined
    E5005,
    /// A generic argument lacks a conformance its parameter requires
    E5006,
    /// The runtime could not allocate a constant image
    E5007,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E5001 => "E5001",
            ErrorCode::E5002 => "E5002",
            ErrorCode::E5003 => "E5003",
            ErrorCode::E5004 => "E5004",
            ErrorCode::E5005 => "E5005",
            ErrorCode::E5006 => "E5006",
            ErrorCode::E5007 => "E5007",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why metadata could not be generated.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum MetadataError {
    /// Returned as-is; never degraded into a partial record.
    Unimplemented { feature: &'static str },
    UnknownDecl(DeclId),
    UnknownProtocol(ProtocolId),
    ArgumentCount {
        decl: String,
        expected: usize,
        found: usize,
    },
    UnresolvedSymbol { symbol: String },
    MissingConformance { ty: String, protocol: String },
    ImageAllocation { symbol: String, len: usize },
}

impl MetadataError {
    pub fn unimplemented(feature: &'static str) -> Self {
        Self::Unimplemented { feature }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unimplemented { .. } => ErrorCode::E5001,
            Self::UnknownDecl(_) => ErrorCode::E5002,
            Self::UnknownProtocol(_) => ErrorCode::E5003,
            Self::ArgumentCount { .. } => ErrorCode::E5004,
            Self::UnresolvedSymbol { .. } => ErrorCode::E5005,
            Self::MissingConformance { .. } => ErrorCode::E5006,
            Self::ImageAllocation { .. } => ErrorCode::E5007,
        }
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: ", self.code())?;
        match self {
            Self::Unimplemented { feature } => write!(f, "unimplemented: {feature}"),
            Self::UnknownDecl(id) => write!(f, "unknown declaration #{}", id.raw()),
            Self::UnknownProtocol(id) => write!(f, "unknown protocol #{}", id.raw()),
            Self::ArgumentCount {
                decl,
                expected,
                found,
            } => write!(
                f,
                "`{decl}` takes {expected} generic argument(s) but {found} were supplied"
            ),
            Self::UnresolvedSymbol { symbol } => {
                write!(f, "constant refers to undefined symbol `{symbol}`")
            }
            Self::MissingConformance { ty, protocol } => {
                write!(f, "`{ty}` has no registered conformance to `{protocol}`")
            }
            Self::ImageAllocation { symbol, len } => {
                write!(f, "failed to allocate {len} bytes for `{symbol}`")
            }
        }
    }
}

impl std::error::Error for MetadataError {}

pub type Result<T> = std::result::Result<T, MetadataError>;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

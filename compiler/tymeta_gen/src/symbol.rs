//! Symbols that generated constants refer to.

use std::fmt;

use tymeta_abi::RuntimeFn;
use tymeta_ir::FormalLinkage;

/// A pointer-sized reference inside a constant.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Symbol {
    /// A runtime entry point.
    Runtime(RuntimeFn),
    /// A global defined through the sink, possibly later.
    Global(String),
    /// An object the runtime already owns (a shared witness table, a leaked
    /// create function or field-type accessor).
    Address(usize),
}

impl Symbol {
    pub fn global(name: impl Into<String>) -> Self {
        Self::Global(name.into())
    }

    pub fn address<T>(object: &'static T) -> Self {
        Self::Address(std::ptr::from_ref(object) as usize)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime(func) => f.write_str(func.symbol()),
            Self::Global(name) => f.write_str(name),
            Self::Address(addr) => write!(f, "{addr:#x}"),
        }
    }
}

/// Name of the global holding `what` for the declaration `name` whose
/// table index is `raw`. The index keeps same-named declarations apart.
pub fn decl_global(name: &str, raw: u32, what: &str) -> String {
    format!("{name}.{raw}.{what}")
}

/// Linkage of a generated global.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Linkage {
    Public,
    Hidden,
    Private,
    /// May be defined by several modules; the first definition wins.
    SharedNonUnique,
}

impl From<FormalLinkage> for Linkage {
    fn from(linkage: FormalLinkage) -> Self {
        match linkage {
            FormalLinkage::PublicUnique => Self::Public,
            FormalLinkage::HiddenUnique => Self::Hidden,
            FormalLinkage::Private => Self::Private,
            FormalLinkage::PublicNonUnique => Self::SharedNonUnique,
        }
    }
}

/// A symbolic word at `offset` within a constant.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Relocation {
    pub offset: usize,
    pub symbol: Symbol,
    pub addend: isize,
}

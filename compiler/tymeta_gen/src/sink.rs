//! Where finished constants go.
//!
//! The generator never writes memory itself: every record, descriptor and
//! pattern is handed to a [`CodegenSink`] as a [`ConstantBuffer`]. The sink
//! decides what a global is. [`MaterializingSink`] makes it real process
//! memory, so the runtime can consume what the generator builds.

use rustc_hash::FxHashMap;
use tymeta_rt::{runtime_address, Image};

use crate::buffer::ConstantBuffer;
use crate::error::{MetadataError, Result};
use crate::symbol::{Linkage, Symbol};

/// Backend interface of the generator.
pub trait CodegenSink {
    /// Create a global constant named `name` with the buffer's bytes and
    /// return its address.
    ///
    /// Symbolic words may name globals that are defined later; the sink
    /// resolves them when they are.
    fn define_constant(
        &mut self,
        name: &str,
        linkage: Linkage,
        buffer: ConstantBuffer,
    ) -> Result<usize>;

    /// Address of a symbol, if it is known yet.
    fn resolve(&self, symbol: &Symbol) -> Option<usize>;

    /// Fail if any constant still refers to an undefined global.
    fn finish(&self) -> Result<()>;
}

struct Global {
    image: Image,
    linkage: Linkage,
}

/// A word of an image waiting for a global to be defined.
struct Fixup {
    image: Image,
    offset: usize,
    addend: isize,
}

/// Materializes each constant as an [`Image`] in process memory.
#[derive(Default)]
pub struct MaterializingSink {
    globals: FxHashMap<String, Global>,
    pending: FxHashMap<String, Vec<Fixup>>,
}

impl MaterializingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_globals(&self) -> usize {
        self.globals.len()
    }

    pub fn image(&self, name: &str) -> Option<Image> {
        self.globals.get(name).map(|g| g.image)
    }

    pub fn linkage(&self, name: &str) -> Option<Linkage> {
        self.globals.get(name).map(|g| g.linkage)
    }

    /// Names referenced but not yet defined.
    pub fn unresolved(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pending.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn patch(image: Image, offset: usize, value: usize) {
    // SAFETY: images are patched while the generator still owns them, before
    // any record that reaches them is handed to the runtime
    unsafe { image.patch_word(offset, value) };
}

impl CodegenSink for MaterializingSink {
    fn define_constant(
        &mut self,
        name: &str,
        linkage: Linkage,
        buffer: ConstantBuffer,
    ) -> Result<usize> {
        if let Some(existing) = self.globals.get(name) {
            assert!(
                linkage == Linkage::SharedNonUnique && existing.linkage == Linkage::SharedNonUnique,
                "global `{name}` defined twice"
            );
            return Ok(existing.image.address_of(0));
        }
        assert!(buffer.is_complete(), "global `{name}` has an unfilled reservation");

        let image = Image::materialize(buffer.bytes(), buffer.align_mask()).ok_or_else(|| {
            MetadataError::ImageAllocation {
                symbol: name.to_owned(),
                len: buffer.len(),
            }
        })?;
        let address = image.address_of(0);
        self.globals
            .insert(name.to_owned(), Global { image, linkage });

        for reloc in buffer.relocations() {
            let target = match &reloc.symbol {
                Symbol::Global(target) if !self.globals.contains_key(target) => {
                    self.pending.entry(target.clone()).or_default().push(Fixup {
                        image,
                        offset: reloc.offset,
                        addend: reloc.addend,
                    });
                    continue;
                }
                symbol => self.resolve(symbol),
            };
            if let Some(target) = target {
                patch(image, reloc.offset, target.wrapping_add_signed(reloc.addend));
            }
        }
        for fixup in self.pending.remove(name).unwrap_or_default() {
            patch(
                fixup.image,
                fixup.offset,
                address.wrapping_add_signed(fixup.addend),
            );
        }
        tracing::debug!(name, ?linkage, len = buffer.len(), address, "defined constant");
        Ok(address)
    }

    fn resolve(&self, symbol: &Symbol) -> Option<usize> {
        match symbol {
            Symbol::Runtime(func) => Some(runtime_address(*func)),
            Symbol::Global(name) => self.globals.get(name).map(|g| g.image.address_of(0)),
            Symbol::Address(addr) => Some(*addr),
        }
    }

    fn finish(&self) -> Result<()> {
        match self.unresolved().first() {
            Some(symbol) => Err(MetadataError::UnresolvedSymbol {
                symbol: (*symbol).to_owned(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

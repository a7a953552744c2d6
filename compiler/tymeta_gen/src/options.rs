//! Generator configuration.

/// Memory ordering used by generated cache-cell loads.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum CacheOrdering {
    /// Acquire load on the fast path, release store on publication.
    #[default]
    AcquireRelease,
    /// Rely on address dependency instead of an acquire load. Recorded in
    /// accessor diagnostics only: cache cells still use acquire loads and
    /// release stores, so generated code matches `AcquireRelease`.
    Dependency,
}

/// Options for one generator session.
#[derive(Clone, Debug)]
pub struct GenOptions {
    /// Reference fixed, non-generic nominal records directly instead of
    /// through an accessor.
    pub prefer_direct_access: bool,
    /// Register class records with the legacy object runtime and use its
    /// reference counting for foreign classes.
    pub legacy_interop: bool,
    /// Reported by accessor tracing; does not change generated code.
    pub cache_ordering: CacheOrdering,
    /// Emit field and case name lists in nominal descriptors.
    pub emit_field_names: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            prefer_direct_access: true,
            legacy_interop: false,
            cache_ordering: CacheOrdering::default(),
            emit_field_names: true,
        }
    }
}

impl GenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `TYMETA_DIRECT_ACCESS` and
    /// `TYMETA_LEGACY_INTEROP`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(value) = lookup("TYMETA_DIRECT_ACCESS").as_deref().and_then(parse_bool) {
            options.prefer_direct_access = value;
        }
        if let Some(value) = lookup("TYMETA_LEGACY_INTEROP").as_deref().and_then(parse_bool) {
            options.legacy_interop = value;
        }
        tracing::debug!(?options, "generator options");
        options
    }

    #[must_use]
    pub fn with_direct_access(mut self, value: bool) -> Self {
        self.prefer_direct_access = value;
        self
    }

    #[must_use]
    pub fn with_legacy_interop(mut self, value: bool) -> Self {
        self.legacy_interop = value;
        self
    }

    #[must_use]
    pub fn with_cache_ordering(mut self, ordering: CacheOrdering) -> Self {
        self.cache_ordering = ordering;
        self
    }

    #[must_use]
    pub fn with_field_names(mut self, value: bool) -> Self {
        self.emit_field_names = value;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        other => {
            tracing::warn!(value = other, "ignoring unrecognized boolean option");
            None
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;

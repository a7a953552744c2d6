use super::*;
use pretty_assertions::assert_eq;

#[test]
fn defaults() {
    let options = GenOptions::default();
    assert!(options.prefer_direct_access);
    assert!(!options.legacy_interop);
    assert!(options.emit_field_names);
    assert_eq!(options.cache_ordering, CacheOrdering::AcquireRelease);
}

#[test]
fn environment_overrides() {
    let options = GenOptions::from_lookup(|key| match key {
        "TYMETA_DIRECT_ACCESS" => Some("0".into()),
        "TYMETA_LEGACY_INTEROP" => Some("true".into()),
        _ => None,
    });
    assert!(!options.prefer_direct_access);
    assert!(options.legacy_interop);
}

#[test]
fn unrecognized_values_keep_defaults() {
    let options = GenOptions::from_lookup(|_| Some("maybe".into()));
    assert!(options.prefer_direct_access);
    assert!(!options.legacy_interop);
}

#[test]
fn builders_set_one_field() {
    let options = GenOptions::new()
        .with_direct_access(false)
        .with_cache_ordering(CacheOrdering::Dependency)
        .with_field_names(false);
    assert!(!options.prefer_direct_access);
    assert!(!options.emit_field_names);
    assert!(!options.legacy_interop);
    assert_eq!(options.cache_ordering, CacheOrdering::Dependency);
    assert!(GenOptions::new().with_legacy_interop(true).legacy_interop);
}

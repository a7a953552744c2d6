use super::*;

#[test]
fn empty_string_is_preinterned() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.lookup(Name::EMPTY), "");
}

#[test]
fn interning_is_idempotent() {
    let interner = StringInterner::new();
    let a = interner.intern("Pair");
    let b = interner.intern("Pair");
    let c = interner.intern("Point");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.lookup(c), "Point");
    assert_eq!(interner.len(), 3);
}

#[test]
fn concurrent_interning_agrees() {
    let interner = StringInterner::new();
    let names: Vec<Name> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| interner.intern("shared")))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(Name::EMPTY))
            .collect()
    });
    assert!(names.iter().all(|&n| n == names[0] && n != Name::EMPTY));
}

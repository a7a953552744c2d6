use super::*;

#[test]
fn zero_size_is_null() {
    assert!(tymeta_alloc(0, 7).is_null());
}

#[test]
fn allocation_is_zeroed_and_aligned() {
    let ptr = tymeta_alloc(64, 15);
    assert!(!ptr.is_null());
    assert_eq!(ptr as usize % 16, 0);
    // SAFETY: 64 bytes were just allocated
    let bytes = unsafe { std::slice::from_raw_parts(ptr, 64) };
    assert!(bytes.iter().all(|&b| b == 0));
    tymeta_free(ptr, 64, 15);
}

#[test]
fn free_null_is_noop() {
    tymeta_free(std::ptr::null_mut(), 8, 7);
}

#[test]
fn tracking_follows_alloc_and_free() {
    let ptr = tymeta_alloc(8, 7);
    let watch = Watch::new(ptr);
    assert!(is_live(ptr));
    assert!(watch.is_live());
    tymeta_free(ptr, 8, 7);
    assert!(!watch.is_live());
}

#[test]
fn watch_ignores_a_reused_address() {
    let ptr = tymeta_alloc(8, 7);
    let first = Watch::new(ptr);
    tymeta_free(ptr, 8, 7);
    // The allocator may hand the address out again.
    let mut held = Vec::new();
    let reused = loop {
        let next = tymeta_alloc(8, 7);
        if next == ptr || held.len() == 64 {
            break next;
        }
        held.push(next);
    };
    if reused == ptr {
        assert!(is_live(ptr));
        assert!(Watch::new(ptr).is_live());
    }
    assert!(!first.is_live());
    tymeta_free(reused, 8, 7);
    for block in held {
        tymeta_free(block, 8, 7);
    }
}

#[test]
fn watching_nothing_is_never_live() {
    assert!(!Watch::new(std::ptr::null()).is_live());
}

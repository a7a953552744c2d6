use super::*;
use pretty_assertions::assert_eq;
use tymeta_abi::{RuntimeFn, POINTER_SIZE};
use tymeta_rt::runtime_fn_at;

const W: usize = POINTER_SIZE;

fn words(values: &[usize]) -> ConstantBuffer {
    let mut buffer = ConstantBuffer::new();
    for &v in values {
        buffer.add_word(v);
    }
    buffer
}

// ── Definition ──

#[test]
fn constants_are_copied_into_memory() {
    let mut sink = MaterializingSink::new();
    let address = sink
        .define_constant("answer", Linkage::Private, words(&[42, 43]))
        .unwrap();
    let image = sink.image("answer").unwrap();
    assert_eq!(image.address_of(0), address);
    assert_eq!(image.read_word(W), 43);
    assert_eq!(sink.linkage("answer"), Some(Linkage::Private));
    assert_eq!(sink.resolve(&Symbol::global("answer")), Some(address));
}

#[test]
fn runtime_and_address_symbols_resolve_immediately() {
    let mut sink = MaterializingSink::new();
    let mut buffer = ConstantBuffer::new();
    buffer.add_symbol(Symbol::Runtime(RuntimeFn::DestroyClassInstance));
    buffer.add_symbol_offset(Symbol::Address(0x1000), 8);
    sink.define_constant("refs", Linkage::Hidden, buffer).unwrap();

    let image = sink.image("refs").unwrap();
    assert_eq!(
        runtime_fn_at(image.read_word(0)),
        Some(RuntimeFn::DestroyClassInstance)
    );
    assert_eq!(image.read_word(W), 0x1008);
    sink.finish().unwrap();
}

// ── Forward references ──

#[test]
fn forward_references_patch_on_definition() {
    let mut sink = MaterializingSink::new();
    let mut descriptor = ConstantBuffer::new();
    descriptor.add_word(1);
    descriptor.add_symbol(Symbol::global("T.pattern"));
    sink.define_constant("T.descriptor", Linkage::Public, descriptor)
        .unwrap();
    assert_eq!(sink.unresolved(), vec!["T.pattern"]);
    assert_eq!(
        sink.finish().unwrap_err(),
        MetadataError::UnresolvedSymbol {
            symbol: "T.pattern".into()
        }
    );

    let mut pattern = ConstantBuffer::new();
    pattern.add_symbol_offset(Symbol::global("T.descriptor"), W as isize);
    let pattern_addr = sink
        .define_constant("T.pattern", Linkage::Public, pattern)
        .unwrap();

    let descriptor_image = sink.image("T.descriptor").unwrap();
    assert_eq!(descriptor_image.read_word(W), pattern_addr);
    assert_eq!(
        sink.image("T.pattern").unwrap().read_word(0),
        descriptor_image.address_of(W)
    );
    assert!(sink.unresolved().is_empty());
    sink.finish().unwrap();
}

// ── Linkage ──

#[test]
fn shared_globals_keep_the_first_definition() {
    let mut sink = MaterializingSink::new();
    let first = sink
        .define_constant("shared", Linkage::SharedNonUnique, words(&[1]))
        .unwrap();
    let second = sink
        .define_constant("shared", Linkage::SharedNonUnique, words(&[2]))
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(sink.image("shared").unwrap().read_word(0), 1);
    assert_eq!(sink.num_globals(), 1);
}

#[test]
#[should_panic(expected = "defined twice")]
fn unique_globals_define_once() {
    let mut sink = MaterializingSink::new();
    sink.define_constant("unique", Linkage::Public, words(&[1]))
        .unwrap();
    let _ = sink.define_constant("unique", Linkage::Public, words(&[2]));
}

#[test]
fn formal_linkage_maps_to_global_linkage() {
    use tymeta_ir::FormalLinkage;
    assert_eq!(Linkage::from(FormalLinkage::PublicUnique), Linkage::Public);
    assert_eq!(Linkage::from(FormalLinkage::HiddenUnique), Linkage::Hidden);
    assert_eq!(Linkage::from(FormalLinkage::Private), Linkage::Private);
    assert_eq!(
        Linkage::from(FormalLinkage::PublicNonUnique),
        Linkage::SharedNonUnique
    );
}

mod common;

use common::Builder;
use fdt_core::{Dtb, FdtError, InitConfig};

fn writable_dtb(blob: &[u8]) -> Dtb<'_> {
    Dtb::parse_with_config(
        blob,
        InitConfig {
            config_version: 1,
            writable: true,
        },
    )
    .unwrap()
}

#[test]
fn create_child_rejects_duplicate_sibling_name() {
    let mut b = Builder::new();
    b.begin_node("").end_node();
    let blob = b.build();

    let mut dtb = writable_dtb(&blob);
    let root = dtb.root();
    dtb.create_child(root, "uart").unwrap();
    let err = dtb.create_child(root, "uart").unwrap_err();
    assert!(matches!(err, FdtError::DuplicateName(_)));
}

#[test]
fn create_child_does_not_confuse_name_prefixes() {
    // A length-bounded prefix comparison would wrongly treat "uart" as
    // a duplicate of "uart@1000"; full-string comparison must not.
    let mut b = Builder::new();
    b.begin_node("").end_node();
    let blob = b.build();

    let mut dtb = writable_dtb(&blob);
    let root = dtb.root();
    dtb.create_child(root, "uart").unwrap();
    dtb.create_child(root, "uart@1000").unwrap();
    assert_eq!(dtb.stat(root).child_count, 2);
}

#[test]
fn create_sibling_attaches_under_shared_parent() {
    let mut b = Builder::new();
    b.begin_node("").begin_node("soc").end_node().end_node();
    let blob = b.build();

    let mut dtb = writable_dtb(&blob);
    let soc = dtb.find("/soc").unwrap();
    let gpio = dtb.create_child(soc, "gpio").unwrap();
    let uart = dtb.create_sibling(gpio, "uart").unwrap();

    assert_eq!(dtb.parent(uart), Some(soc));
    assert_eq!(dtb.stat(soc).child_count, 2);
}

#[test]
fn mutation_on_read_only_dtb_is_rejected() {
    let mut b = Builder::new();
    b.begin_node("").end_node();
    let blob = b.build();

    let mut dtb = Dtb::parse(&blob).unwrap();
    let root = dtb.root();
    assert!(matches!(
        dtb.create_child(root, "x"),
        Err(FdtError::NotWritable)
    ));
}

#[test]
fn write_prop_values_round_trips_through_decode() {
    let mut b = Builder::new();
    b.begin_node("").end_node();
    let blob = b.build();

    let mut dtb = writable_dtb(&blob);
    let root = dtb.root();
    dtb.write_prop_values(root, "interrupts", &[1, 2, 3], 1).unwrap();

    let prop = dtb.find_prop(root, "interrupts").unwrap();
    assert_eq!(prop.values(1), vec![1, 2, 3]);
}

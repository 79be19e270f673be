mod common;

use common::Builder;
use fdt_core::Dtb;

#[test]
fn parses_nested_tree_and_resolves_paths() {
    common::init_logging();

    let mut b = Builder::new();
    b.begin_node("")
        .prop_u32("#address-cells", 1)
        .prop_u32("#size-cells", 1)
        .begin_node("soc")
        .begin_node("uart@1000")
        .prop_string("compatible", "acme,uart")
        .prop("reg", &[0, 0, 0x10, 0, 0, 0, 0x10, 0])
        .end_node()
        .end_node()
        .end_node();
    let blob = b.build();

    let dtb = Dtb::parse(&blob).unwrap();
    let root = dtb.find("/").unwrap();
    assert_eq!(dtb.stat(root).child_count, 1);

    let uart = dtb.find("/soc/uart@1000").unwrap();
    let compatible = dtb.find_prop(uart, "compatible").unwrap();
    assert_eq!(compatible.as_str(), Some("acme,uart"));

    let found = dtb.find_compatible(None, "acme,uart").unwrap();
    assert_eq!(found, uart);
}

#[test]
fn find_compatible_resumes_past_previous_hit() {
    common::init_logging();

    let mut b = Builder::new();
    b.begin_node("")
        .prop("compatible", b"vendor,foo\0vendor,bar\0")
        .begin_node("child")
        .prop_string("compatible", "vendor,bar")
        .end_node()
        .end_node();
    let blob = b.build();

    let dtb = Dtb::parse(&blob).unwrap();
    let root = dtb.find("/").unwrap();
    let child = dtb.find("/child").unwrap();

    let first = dtb.find_compatible(None, "vendor,bar").unwrap();
    assert_eq!(first, root);

    let second = dtb.find_compatible(Some(first), "vendor,bar").unwrap();
    assert_eq!(second, child);

    assert!(dtb.find_compatible(Some(second), "vendor,bar").is_none());
}

#[test]
fn find_strips_unit_address_suffix() {
    common::init_logging();

    let mut b = Builder::new();
    b.begin_node("")
        .begin_node("cpus")
        .begin_node("cpu@0")
        .end_node()
        .end_node()
        .end_node();
    let blob = b.build();

    let dtb = Dtb::parse(&blob).unwrap();
    let cpu = dtb.find("/cpus/cpu@0").unwrap();
    assert_eq!(dtb.find("/cpus/cpu"), Some(cpu));
}

#[test]
fn rejects_blob_with_bad_magic() {
    let mut blob = Builder::new().build();
    blob[0] = 0;
    assert!(Dtb::parse(&blob).is_err());
}

#[test]
fn missing_path_segment_returns_none() {
    let mut b = Builder::new();
    b.begin_node("").end_node();
    let blob = b.build();
    let dtb = Dtb::parse(&blob).unwrap();
    assert!(dtb.find("/nonexistent").is_none());
}

#[test]
fn phandle_lookup_resolves_referenced_node() {
    let mut b = Builder::new();
    b.begin_node("")
        .begin_node("clk")
        .prop_u32("phandle", 7)
        .end_node()
        .end_node();
    let blob = b.build();
    let dtb = Dtb::parse(&blob).unwrap();
    let clk = dtb.find("/clk").unwrap();
    assert_eq!(dtb.find_phandle(7), Some(clk));
}

#[test]
fn phandle_at_or_above_node_count_is_ignored() {
    let mut b = Builder::new();
    // Two nodes total (root, clk), so a phandle of 2 is out of range
    // and must be silently dropped rather than registered.
    b.begin_node("")
        .begin_node("clk")
        .prop_u32("phandle", 2)
        .end_node()
        .end_node();
    let blob = b.build();
    let dtb = Dtb::parse(&blob).unwrap();
    assert_eq!(dtb.find_phandle(2), None);
}

#[test]
fn mem_reservations_are_read_in_order() {
    let mut b = Builder::new().mem_reservation(0x1000, 0x100).mem_reservation(0x2000, 0x200);
    b.begin_node("").end_node();
    let blob = b.build();
    let dtb = Dtb::parse(&blob).unwrap();
    assert_eq!(dtb.mem_reservations().len(), 2);
    assert_eq!(dtb.mem_reservations()[0].address, 0x1000);
    assert_eq!(dtb.mem_reservations()[1].size, 0x200);
}

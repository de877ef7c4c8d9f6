#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Capture, text form and restore of live trees
//!
//! ## Scenarios Covered
//!
//! - Capture → text → parse → restore reproduces classes, uuids, names,
//!   values and child order
//! - Hashes are stable across the text round trip
//! - An unknown class deep in the memento leaves no new nodes behind
//! - Unknown static properties are skipped, unknown dynamic ones are added
//! - Restoring with fresh uuids produces an independent copy
//! - Enum options containing the separator or markup survive text and restore

mod common;

use common::{sample_document, test_factory};
use proptest::prelude::*;
use strata_core::errors::RestoreError;
use strata_core::property::{DoubleProperty, PropertyKind};
use strata_core::{Memento, ObjectTree, PropertyEntry, RestoreOptions, Value};
use uuid::Uuid;

#[test]
fn test_capture_text_restore_round_trip() {
    // GIVEN a document with edited values and two layers
    let factory = test_factory();
    let mut tree = ObjectTree::new();
    let doc = sample_document(&factory, &mut tree);
    let original = Memento::capture(&tree, doc).unwrap();

    // WHEN it goes through the text form into a fresh tree
    let text = original.to_text();
    let parsed = Memento::parse(&text).unwrap();
    let mut restored_tree = ObjectTree::new();
    let restored = parsed.restore(&factory, &mut restored_tree, None).unwrap();

    // THEN the restored tree captures to the same memento
    assert_eq!(Memento::capture(&restored_tree, restored).unwrap(), original);
    assert_eq!(restored_tree.len(), 3);
    let flaps = restored_tree.children(restored)[1];
    let opacity = restored_tree
        .get(flaps)
        .unwrap()
        .property_as::<DoubleProperty>("opacity")
        .unwrap()
        .value()
        .to_bits();
    assert_eq!(opacity, (0.1f64 + 0.2).to_bits());
}

#[test]
fn test_text_form_escapes_markup_in_values() {
    // GIVEN a title containing markup characters
    let factory = test_factory();
    let mut tree = ObjectTree::new();
    let doc = sample_document(&factory, &mut tree);

    // WHEN the document is written as text
    let text = tree.to_memento(doc).unwrap().to_text();

    // THEN the markup is escaped and the value survives parsing
    assert!(text.contains("Wing &lt;draft&gt;"));
    let parsed: Memento = text.parse().unwrap();
    assert_eq!(parsed.property("title").unwrap().value, "Wing <draft>");
    assert_eq!(parsed.property("units").unwrap().options, vec!["mm", "m", "in"]);
}

#[test]
fn test_hashes_survive_text_round_trip() {
    let factory = test_factory();
    let mut tree = ObjectTree::new();
    let doc = sample_document(&factory, &mut tree);
    let memento = Memento::capture(&tree, doc).unwrap();

    let reparsed = Memento::parse(&memento.to_text()).unwrap();

    assert_eq!(reparsed.full_hash(), memento.full_hash());
    assert_eq!(reparsed.property_hash(), memento.property_hash());
    assert_eq!(memento.full_hash().len(), 64);
}

#[test]
fn test_property_hash_ignores_children_and_name() {
    // GIVEN two captures differing only below the root
    let factory = test_factory();
    let mut tree = ObjectTree::new();
    let doc = sample_document(&factory, &mut tree);
    let before = Memento::capture(&tree, doc).unwrap();
    let layer = tree.children(doc)[0];
    tree.set_property(layer, "opacity", Value::Double(0.5)).unwrap();
    tree.rename(doc, "renamed").unwrap();

    // WHEN both are hashed
    let after = Memento::capture(&tree, doc).unwrap();

    // THEN only the full hash changes
    assert_eq!(before.property_hash(), after.property_hash());
    assert_ne!(before.full_hash(), after.full_hash());
}

#[test]
fn test_unknown_class_deep_in_tree_leaves_no_nodes() {
    // GIVEN a memento whose grandchild names an unregistered class
    let factory = test_factory();
    let stranger = Uuid::new_v4();
    let memento = Memento::new("Document", Uuid::new_v4(), "doc").with_child(
        Memento::new("Layer", Uuid::new_v4(), "layer")
            .with_child(Memento::new("Layer", Uuid::new_v4(), "ok"))
            .with_child(Memento::new("Spline", stranger, "spline")),
    );
    let mut tree = ObjectTree::new();
    let existing = factory.create("Document", &mut tree, None).unwrap();

    // WHEN it is restored below an existing node
    let err = memento
        .restore(&factory, &mut tree, Some(existing))
        .unwrap_err();

    // THEN the error names the class and no new node is left over
    assert_eq!(
        err,
        RestoreError::UnknownType {
            class_name: "Spline".to_string(),
            uuid: stranger,
        }
    );
    assert_eq!(tree.len(), 1);
    assert!(tree.children(existing).is_empty());
    assert!(!memento.is_restorable(&factory));
}

#[test]
fn test_restore_skips_unknown_static_and_adds_dynamic() {
    // GIVEN a memento written by a newer class version
    let factory = test_factory();
    let memento = Memento::new("Layer", Uuid::new_v4(), "layer")
        .with_property(PropertyEntry::new("opacity", PropertyKind::Double, "0.25"))
        .with_property(PropertyEntry::new("blend", PropertyKind::String, "multiply"))
        .with_dynamic_property(PropertyEntry::new("note", PropertyKind::String, "check"));
    let mut tree = ObjectTree::new();

    // WHEN it is restored
    let id = memento.restore(&factory, &mut tree, None).unwrap();

    // THEN known values apply, the removed static is dropped, the dynamic one exists
    let layer = tree.get(id).unwrap();
    assert_eq!(layer.property_as::<DoubleProperty>("opacity").unwrap().value(), &0.25);
    assert!(layer.find_property("blend").is_none());
    assert!(layer.has_dynamic_property("note"));
    assert_eq!(layer.find_property("note").unwrap().get(), Value::String("check".to_string()));
}

#[test]
fn test_restore_writes_read_only_values() {
    let factory = test_factory();
    let memento = Memento::new("Document", Uuid::new_v4(), "doc")
        .with_property(PropertyEntry::new("revision", PropertyKind::Int, "12"));
    let mut tree = ObjectTree::new();

    let id = memento.restore(&factory, &mut tree, None).unwrap();

    let revision = tree.get(id).unwrap().find_property("revision").unwrap();
    assert!(revision.is_read_only());
    assert_eq!(revision.get(), Value::Int(12));
}

#[test]
fn test_restore_with_fresh_uuids_is_independent_copy() {
    // GIVEN a captured document
    let factory = test_factory();
    let mut tree = ObjectTree::new();
    let doc = sample_document(&factory, &mut tree);
    let memento = Memento::capture(&tree, doc).unwrap();

    // WHEN it is pasted into the same tree with fresh identities
    let copy = memento
        .restore_with(
            &factory,
            &mut tree,
            None,
            RestoreOptions { fresh_uuids: true },
        )
        .unwrap();

    // THEN structure and values match but no uuid is shared
    let pasted = Memento::capture(&tree, copy).unwrap();
    assert_ne!(pasted.uuid(), memento.uuid());
    assert_eq!(pasted.children().len(), 2);
    for (a, b) in pasted.children().iter().zip(memento.children()) {
        assert_ne!(a.uuid(), b.uuid());
        assert_eq!(a.name(), b.name());
        assert_eq!(a.properties(), b.properties());
    }
    assert_eq!(pasted.properties(), memento.properties());
}

#[test]
fn test_parse_error_reports_position() {
    let text = "<object uuid=\"{67e55044-10b1-426f-9247-bb680e5fe0c8}\" class=\"Layer\">\n  <property name=\"x\" type=\"complex\">1</property>\n</object>\n";

    let err = Memento::parse(text).unwrap_err();

    assert_eq!(err.line, 2);
    assert_eq!(err.context, "property");
    assert!(err.message.contains("complex"));
}

proptest! {
    #[test]
    fn prop_round_trip_through_text(
        title in "[ -~]{0,12}",
        scale in 0.0f64..100.0,
        opacities in proptest::collection::vec(-1.0e9f64..1.0e9, 0..4),
        units in prop::sample::select(vec!["mm", "m", "in"]),
    ) {
        let factory = test_factory();
        let mut tree = ObjectTree::new();
        let doc = factory.create("Document", &mut tree, None).unwrap();
        tree.set_property(doc, "title", Value::String(title)).unwrap();
        tree.set_property(doc, "scale", Value::Double(scale)).unwrap();
        tree.set_property(doc, "units", Value::Enum(units.to_string())).unwrap();
        for opacity in &opacities {
            let layer = factory.create("Layer", &mut tree, Some(doc)).unwrap();
            tree.set_property(layer, "opacity", Value::Double(*opacity)).unwrap();
        }
        let original = Memento::capture(&tree, doc).unwrap();

        let parsed = Memento::parse(&original.to_text()).unwrap();
        let mut restored_tree = ObjectTree::new();
        let restored = parsed.restore(&factory, &mut restored_tree, None).unwrap();

        prop_assert_eq!(Memento::capture(&restored_tree, restored).unwrap(), original);
    }
}

#[test]
fn test_dynamic_enum_with_separator_in_option_restores() {
    // GIVEN a layer carrying a dynamic enum whose option contains ';'
    let factory = test_factory();
    let memento = Memento::new("Layer", Uuid::new_v4(), "layer").with_dynamic_property(
        PropertyEntry::new("mode", PropertyKind::Enum, "a;b")
            .with_options(vec!["a;b".to_string(), "c".to_string()]),
    );

    // WHEN it goes through the text form and is restored
    let parsed = Memento::parse(&memento.to_text()).unwrap();
    let mut tree = ObjectTree::new();
    let id = parsed.restore(&factory, &mut tree, None).unwrap();

    // THEN the options and the value are intact
    assert_eq!(parsed, memento);
    assert_eq!(
        tree.get(id).unwrap().find_property("mode").unwrap().get(),
        Value::Enum("a;b".to_string())
    );
    let captured = Memento::capture(&tree, id).unwrap();
    assert_eq!(captured.dynamic_properties(), memento.dynamic_properties());
}

proptest! {
    #[test]
    fn prop_enum_options_round_trip(
        options in proptest::collection::vec(r#"[a-c;<>&"\\ ]{0,4}"#, 1..4),
        pick in any::<prop::sample::Index>(),
    ) {
        let value = pick.get(&options).clone();
        let memento = Memento::new("Layer", Uuid::from_u128(7), "layer").with_dynamic_property(
            PropertyEntry::new("mode", PropertyKind::Enum, value).with_options(options),
        );

        let parsed = Memento::parse(&memento.to_text()).unwrap();
        let mut tree = ObjectTree::new();
        let id = parsed.restore(&test_factory(), &mut tree, None).unwrap();

        prop_assert_eq!(&parsed, &memento);
        let captured = Memento::capture(&tree, id).unwrap();
        prop_assert_eq!(captured.dynamic_properties(), memento.dynamic_properties());
    }
}

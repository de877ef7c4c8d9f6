#![allow(clippy::unwrap_used, clippy::expect_used)]

//! `PolyVector` used from outside the crate
//!
//! ## Scenarios Covered
//!
//! - A downstream base trait declared with `poly_base!`
//! - Base, two cloneable derived types (one with a field) and one
//!   non-cloneable type keep order and dynamic type
//! - Whole-container clone is refused while a moved-in element is present
//! - Property containers clone their properties independently

use strata_core::errors::PolyVectorError;
use strata_core::poly_base;
use strata_core::polyvector::{PolyBase, PolyVector};
use strata_core::property::{DoubleProperty, StringProperty};
use strata_core::{AbstractProperty, Value};

trait Shape: PolyBase {
    fn label(&self) -> String;
}
poly_base!(Shape);

#[derive(Clone)]
struct Outline;

impl Shape for Outline {
    fn label(&self) -> String {
        "outline".to_string()
    }
}

#[derive(Clone)]
struct Circle;

impl Shape for Circle {
    fn label(&self) -> String {
        "circle".to_string()
    }
}

#[derive(Clone)]
struct Polygon {
    corners: usize,
}

impl Shape for Polygon {
    fn label(&self) -> String {
        format!("polygon/{}", self.corners)
    }
}

struct Mesh {
    buffer: Vec<u8>,
}

impl Shape for Mesh {
    fn label(&self) -> String {
        format!("mesh/{}", self.buffer.len())
    }
}

#[test]
fn test_heterogeneous_shapes_keep_order_and_type() {
    // GIVEN a base, two cloneable derived types and a non-cloneable one
    let mut shapes: PolyVector<dyn Shape> = PolyVector::new();
    shapes.push_clone(&Outline);
    shapes.push_clone(&Circle);
    shapes.push_cloneable(Polygon { corners: 5 });
    shapes.push_value(Mesh {
        buffer: vec![0; 16],
    });

    // WHEN they are read back
    let labels: Vec<String> = shapes.iter().map(|s| s.label()).collect();

    // THEN order and concrete types are intact
    assert_eq!(labels, vec!["outline", "circle", "polygon/5", "mesh/16"]);
    assert_eq!(shapes.downcast_ref::<Polygon>(2).unwrap().corners, 5);
    assert!(shapes.downcast_ref::<Circle>(2).is_none());
    assert!(shapes.get(4).is_none());
}

#[test]
fn test_clone_refused_with_moved_in_element() {
    let mut shapes: PolyVector<dyn Shape> = PolyVector::new();
    shapes.push_clone(&Circle);
    shapes.push_value(Mesh { buffer: Vec::new() });

    let err = shapes.try_clone().err().unwrap();

    assert!(matches!(err, PolyVectorError::NotCloneable { index: 1, .. }));

    shapes.remove(1);
    let copy = shapes.try_clone().unwrap();
    assert_eq!(copy.len(), 1);
    assert_eq!(copy[0].label(), "circle");
}

#[test]
fn test_property_container_clones_values() {
    // GIVEN a container of cloneable properties
    let mut properties: PolyVector<dyn AbstractProperty> = PolyVector::new();
    properties.push_clone(&DoubleProperty::new("span", 12.5));
    properties.push_clone(&StringProperty::new("label", "left"));

    // WHEN the copy is edited
    let mut copy = properties.try_clone().unwrap();
    copy[0].set(Value::Double(3.0)).unwrap();

    // THEN the original is untouched
    assert_eq!(properties[0].get(), Value::Double(12.5));
    assert_eq!(copy[0].get(), Value::Double(3.0));
    assert_eq!(copy[1].ident(), "label");
}

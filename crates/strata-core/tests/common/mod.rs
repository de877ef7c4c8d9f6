use std::cell::RefCell;
use std::rc::Rc;

use strata_core::errors::ModelError;
use strata_core::property::{
    BoolProperty, DoubleProperty, EnumProperty, IntProperty, StringProperty, StructProperty,
};
use strata_core::{NodeId, Object, ObjectClass, ObjectFactory, ObjectTree, Value};

/// Root class of the test documents
#[allow(dead_code)]
pub struct Document;

impl ObjectClass for Document {
    const CLASS_NAME: &'static str = "Document";

    fn build(object: &mut Object) -> Result<(), ModelError> {
        object.add_property(StringProperty::new("title", "untitled"))?;
        object.add_property(DoubleProperty::new("scale", 1.0).with_bounds(0.0, 100.0))?;
        object.add_property(IntProperty::monitoring("revision", 0))?;
        object.add_property(EnumProperty::new(
            "units",
            vec!["mm".to_string(), "m".to_string(), "in".to_string()],
            "mm",
        )?)?;
        Ok(())
    }
}

/// Child class with an optional flag and a struct property
#[allow(dead_code)]
pub struct Layer;

impl ObjectClass for Layer {
    const CLASS_NAME: &'static str = "Layer";
    const BASES: &'static [&'static str] = &["Element"];

    fn build(object: &mut Object) -> Result<(), ModelError> {
        object.add_property(DoubleProperty::new("opacity", 1.0))?;
        object.add_property(BoolProperty::new("visible", true).optional())?;
        object.add_property(
            StructProperty::new("origin")
                .with_member(DoubleProperty::new("x", 0.0))
                .with_member(DoubleProperty::new("y", 0.0)),
        )?;
        Ok(())
    }
}

/// Records, per change of its `value` property, whether the node already had
/// a parent when the handler ran.
#[allow(dead_code)]
pub type ParentLog = Rc<RefCell<Vec<bool>>>;

/// Class name of the parent observing test object
#[allow(dead_code)]
pub const TEST_OBJECT_358: &str = "TestObject358";

/// Factory knowing `Document`, `Layer` and `TestObject358`
#[allow(dead_code)]
pub fn test_factory() -> ObjectFactory {
    test_factory_with_log().0
}

/// Factory plus the shared log written by every `TestObject358` instance
#[allow(dead_code)]
pub fn test_factory_with_log() -> (ObjectFactory, ParentLog) {
    let log: ParentLog = Rc::new(RefCell::new(Vec::new()));
    let mut factory = ObjectFactory::new();
    factory.register::<Document>().unwrap();
    factory.register::<Layer>().unwrap();

    let handler_log = log.clone();
    factory
        .register_with(TEST_OBJECT_358, &["Element"], move || {
            let mut object = Object::new(TEST_OBJECT_358);
            object.add_property(DoubleProperty::new("value", 0.0))?;
            let log = handler_log.clone();
            object.on_property_changed(Some("value"), move |tree, id, _| {
                log.borrow_mut().push(tree.parent(id).is_some());
            });
            Ok(object)
        })
        .unwrap();

    (factory, log)
}

/// Document with two layers, the second one renamed and edited
#[allow(dead_code)]
pub fn sample_document(factory: &ObjectFactory, tree: &mut ObjectTree) -> NodeId {
    let doc = factory.create("Document", tree, None).unwrap();
    tree.set_property(doc, "title", Value::String("Wing <draft>".to_string()))
        .unwrap();
    tree.set_property(doc, "units", Value::Enum("m".to_string()))
        .unwrap();

    factory.create("Layer", tree, Some(doc)).unwrap();
    let second = factory.create("Layer", tree, Some(doc)).unwrap();
    tree.rename(second, "flaps").unwrap();
    tree.set_property(second, "opacity", Value::Double(0.1 + 0.2))
        .unwrap();
    tree.update_property(second, "visible", |p| {
        p.set_active(true);
        Ok(())
    })
    .unwrap();

    doc
}

use uuid::Uuid;

use super::{Memento, PropertyEntry};
use crate::errors::ParseError;
use crate::property::PropertyKind;
use crate::text::{Element, Writer};

const OBJECT: &str = "object";
const PROPERTY: &str = "property";
const DYNAMIC: &str = "dynamicproperties";
const CHILDREN: &str = "objectlist";
const OPTION_SEPARATOR: char = ';';
const OPTION_ESCAPE: char = '\\';

pub(crate) fn write_memento(w: &mut Writer, memento: &Memento) {
    let uuid = braced(&memento.uuid);
    let attributes = [
        ("uuid", uuid.as_str()),
        ("class", memento.class_name.as_str()),
        ("name", memento.name.as_str()),
    ];
    if memento.properties.is_empty()
        && memento.dynamic_properties.is_empty()
        && memento.children.is_empty()
    {
        w.empty(OBJECT, &attributes);
        return;
    }

    w.open(OBJECT, &attributes);
    for entry in &memento.properties {
        write_entry(w, entry);
    }
    if !memento.dynamic_properties.is_empty() {
        w.open(DYNAMIC, &[]);
        for entry in &memento.dynamic_properties {
            write_entry(w, entry);
        }
        w.close(DYNAMIC);
    }
    if !memento.children.is_empty() {
        w.open(CHILDREN, &[]);
        for child in &memento.children {
            write_memento(w, child);
        }
        w.close(CHILDREN);
    }
    w.close(OBJECT);
}

pub(crate) fn write_entry(w: &mut Writer, entry: &PropertyEntry) {
    let options = join_options(&entry.options);
    let mut attributes = vec![("name", entry.ident.as_str()), ("type", entry.kind.tag())];
    if entry.optional {
        attributes.push(("optional", "true"));
    }
    if !entry.active {
        attributes.push(("active", "false"));
    }
    if !entry.options.is_empty() {
        attributes.push(("options", options.as_str()));
    }

    if entry.kind == PropertyKind::Struct {
        if entry.members.is_empty() {
            w.empty(PROPERTY, &attributes);
            return;
        }
        w.open(PROPERTY, &attributes);
        for member in &entry.members {
            write_entry(w, member);
        }
        w.close(PROPERTY);
    } else {
        w.leaf(PROPERTY, &attributes, &entry.value);
    }
}

pub(crate) fn read_memento(element: &Element) -> Result<Memento, ParseError> {
    element.expect_name(OBJECT)?;
    element.expect_no_text()?;
    let uuid = element.uuid("uuid")?;
    let class_name = element.required("class")?;
    if class_name.is_empty() {
        return Err(element.error("empty class name"));
    }
    let name = element.attr("name").unwrap_or(class_name);
    let mut memento = Memento::new(class_name, uuid, name);

    for child in &element.children {
        match child.name.as_str() {
            PROPERTY => memento.properties.push(read_entry(child)?),
            DYNAMIC => {
                child.expect_no_text()?;
                for entry in &child.children {
                    memento.dynamic_properties.push(read_entry(entry)?);
                }
            }
            CHILDREN => {
                child.expect_no_text()?;
                for object in &child.children {
                    memento.children.push(read_memento(object)?);
                }
            }
            other => return Err(child.error(format!("unexpected element <{}>", other))),
        }
    }
    Ok(memento)
}

pub(crate) fn read_entry(element: &Element) -> Result<PropertyEntry, ParseError> {
    element.expect_name(PROPERTY)?;
    let ident = element.required("name")?;
    let tag = element.required("type")?;
    let kind = PropertyKind::from_tag(tag)
        .ok_or_else(|| element.error(format!("unknown property type '{}'", tag)))?;
    let optional = element.flag("optional", false)?;
    let active = element.flag("active", true)?;

    let value = if kind == PropertyKind::Struct {
        String::new()
    } else {
        element.text.clone()
    };
    let mut entry = PropertyEntry::new(ident, kind, value).with_flags(optional, active);
    if let Some(options) = element.attr("options") {
        entry.options = split_options(options);
    }
    if kind == PropertyKind::Struct {
        element.expect_no_text()?;
        for member in &element.children {
            entry.members.push(read_entry(member)?);
        }
    } else if let Some(stray) = element.children.first() {
        return Err(stray.error(format!("{} property cannot contain elements", kind)));
    }
    Ok(entry)
}

/// Options separated by `;`, with `;` and `\` inside an option escaped by `\`.
fn join_options(options: &[String]) -> String {
    let mut out = String::new();
    for (i, option) in options.iter().enumerate() {
        if i > 0 {
            out.push(OPTION_SEPARATOR);
        }
        for c in option.chars() {
            if c == OPTION_SEPARATOR || c == OPTION_ESCAPE {
                out.push(OPTION_ESCAPE);
            }
            out.push(c);
        }
    }
    out
}

fn split_options(raw: &str) -> Vec<String> {
    let mut options = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            OPTION_ESCAPE => current.push(chars.next().unwrap_or(OPTION_ESCAPE)),
            OPTION_SEPARATOR => options.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    options.push(current);
    options
}

fn braced(uuid: &Uuid) -> String {
    uuid.braced().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse_document;

    #[test]
    fn test_flags_are_written_only_when_not_default() {
        let mut w = Writer::new();
        write_entry(&mut w, &PropertyEntry::new("a", PropertyKind::Int, "3"));
        write_entry(
            &mut w,
            &PropertyEntry::new("b", PropertyKind::Int, "3").with_flags(true, false),
        );
        let text = w.finish();
        assert_eq!(
            text,
            "<property name=\"a\" type=\"int\">3</property>\n\
             <property name=\"b\" type=\"int\" optional=\"true\" active=\"false\">3</property>\n"
        );
    }

    #[test]
    fn test_read_nested_object() {
        let text = r#"
<object uuid="{67e55044-10b1-426f-9247-bb680e5fe0c8}" class="Wing" name="left">
  <property name="span" type="double">2</property>
  <property name="grp" type="struct">
    <property name="a" type="bool">true</property>
  </property>
  <property name="mode" type="enum" options="slow;fast">fast</property>
  <dynamicproperties>
    <property name="dyn" type="string">text</property>
  </dynamicproperties>
  <objectlist>
    <object uuid="67e55044-10b1-426f-9247-bb680e5fe0c9" class="Flap"/>
  </objectlist>
</object>"#;
        let memento = read_memento(&parse_document(text).unwrap()).unwrap();

        assert_eq!(memento.properties.len(), 3);
        assert_eq!(memento.properties[1].members[0].value, "true");
        assert_eq!(memento.properties[2].options, vec!["slow", "fast"]);
        assert_eq!(memento.dynamic_properties[0].value, "text");
        assert_eq!(memento.children[0].name, "Flap");
    }

    #[test]
    fn test_enum_options_keep_separator_and_markup() {
        let options = vec![
            "a;b".to_string(),
            "c\\".to_string(),
            String::new(),
            "<x & \"y\">".to_string(),
        ];
        let entry = PropertyEntry::new("mode", PropertyKind::Enum, "a;b").with_options(options.clone());

        let mut w = Writer::new();
        write_entry(&mut w, &entry);
        let text = w.finish();
        let back = read_entry(&parse_document(&text).unwrap()).unwrap();

        assert!(text.contains(r#"options="a\;b;c\\;;&lt;x &amp; &quot;y&quot;&gt;""#));
        assert_eq!(back.options, options);
        assert_eq!(back, entry);
    }

    #[test]
    fn test_stray_text_in_object_is_rejected() {
        let text = "<object uuid=\"{67e55044-10b1-426f-9247-bb680e5fe0c8}\" class=\"A\">\n  <objectlist>\n    oops\n  </objectlist>\n</object>";

        let err = read_memento(&parse_document(text).unwrap()).unwrap_err();

        assert_eq!((err.line, err.column), (3, 5));
        assert_eq!(err.context, CHILDREN);
        assert!(err.message.contains("unexpected text"));
    }

    #[test]
    fn test_unknown_type_tag_is_rejected() {
        let text = r#"<object uuid="{67e55044-10b1-426f-9247-bb680e5fe0c8}" class="A">
  <property name="x" type="float">1</property>
</object>"#;
        let err = read_memento(&parse_document(text).unwrap()).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.context, "property");
        assert!(err.message.contains("float"));
    }

    #[test]
    fn test_bad_uuid_and_missing_class() {
        let bad_uuid = parse_document(r#"<object uuid="nope" class="A"/>"#).unwrap();
        assert!(read_memento(&bad_uuid).is_err());

        let no_class =
            parse_document(r#"<object uuid="{67e55044-10b1-426f-9247-bb680e5fe0c8}"/>"#).unwrap();
        let err = read_memento(&no_class).unwrap_err();
        assert!(err.message.contains("class"));
    }
}

use std::fmt;
use std::str::FromStr;

use super::{DiffEdit, MementoDiff, PropertyScope};
use crate::errors::ParseError;
use crate::memento::{read_entry, read_memento, write_entry, write_memento};
use crate::text::{parse_document, Element, Writer};

const DIFF: &str = "diff";
const CHANGE_VALUE: &str = "changeValue";
const INSERT_CHILD: &str = "insertChild";
const REMOVE_CHILD: &str = "removeChild";
const MOVE_CHILD: &str = "moveChild";
const ADD_PROPERTY: &str = "addProperty";
const REMOVE_PROPERTY: &str = "removeProperty";
const RENAME: &str = "rename";
const OLD_VALUE: &str = "oldVal";
const NEW_VALUE: &str = "newVal";

impl MementoDiff {
    /// Canonical text form.
    pub fn to_text(&self) -> String {
        let mut w = Writer::new();
        if self.edits.is_empty() {
            w.empty(DIFF, &[]);
            return w.finish();
        }
        w.open(DIFF, &[]);
        for edit in &self.edits {
            write_edit(&mut w, edit);
        }
        w.close(DIFF);
        w.finish()
    }

    /// Parse the canonical text form.
    ///
    /// # Errors
    ///
    /// `ParseError` for malformed text or unknown edit elements.
    pub fn parse(text: &str) -> Result<MementoDiff, ParseError> {
        let root = parse_document(text)?;
        root.expect_name(DIFF)?;
        root.expect_no_text()?;
        let edits = root
            .children
            .iter()
            .map(read_edit)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MementoDiff { edits })
    }
}

impl fmt::Display for MementoDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for MementoDiff {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn write_edit(w: &mut Writer, edit: &DiffEdit) {
    let uuid = edit.target().braced().to_string();
    match edit {
        DiffEdit::ChangeValue { ident, old, new, .. } => {
            w.open(CHANGE_VALUE, &[("uuid", uuid.as_str()), ("ident", ident.as_str())]);
            w.open(OLD_VALUE, &[]);
            write_entry(w, old);
            w.close(OLD_VALUE);
            w.open(NEW_VALUE, &[]);
            write_entry(w, new);
            w.close(NEW_VALUE);
            w.close(CHANGE_VALUE);
        }
        DiffEdit::InsertChild { index, subtree, .. } | DiffEdit::RemoveChild { index, subtree, .. } => {
            let tag = if matches!(edit, DiffEdit::InsertChild { .. }) {
                INSERT_CHILD
            } else {
                REMOVE_CHILD
            };
            let index = index.to_string();
            w.open(tag, &[("uuid", uuid.as_str()), ("index", index.as_str())]);
            write_memento(w, subtree);
            w.close(tag);
        }
        DiffEdit::MoveChild {
            uuid: child, from, to, ..
        } => {
            let child = child.braced().to_string();
            let (from, to) = (from.to_string(), to.to_string());
            w.empty(
                MOVE_CHILD,
                &[
                    ("uuid", uuid.as_str()),
                    ("child", child.as_str()),
                    ("from", from.as_str()),
                    ("to", to.as_str()),
                ],
            );
        }
        DiffEdit::AddProperty {
            scope, index, entry, ..
        }
        | DiffEdit::RemoveProperty {
            scope, index, entry, ..
        } => {
            let tag = if matches!(edit, DiffEdit::AddProperty { .. }) {
                ADD_PROPERTY
            } else {
                REMOVE_PROPERTY
            };
            let index = index.to_string();
            w.open(
                tag,
                &[
                    ("uuid", uuid.as_str()),
                    ("scope", scope.tag()),
                    ("index", index.as_str()),
                ],
            );
            write_entry(w, entry);
            w.close(tag);
        }
        DiffEdit::Rename { old, new, .. } => {
            w.empty(
                RENAME,
                &[
                    ("uuid", uuid.as_str()),
                    ("old", old.as_str()),
                    ("new", new.as_str()),
                ],
            );
        }
    }
}

fn read_edit(element: &Element) -> Result<DiffEdit, ParseError> {
    element.expect_no_text()?;
    let uuid = element.uuid("uuid")?;
    match element.name.as_str() {
        CHANGE_VALUE => {
            let ident = element.required("ident")?.to_string();
            let old = read_entry(single(element, OLD_VALUE)?)?;
            let new = read_entry(single(element, NEW_VALUE)?)?;
            Ok(DiffEdit::ChangeValue {
                uuid,
                ident,
                old,
                new,
            })
        }
        INSERT_CHILD | REMOVE_CHILD => {
            let index = element.index("index")?;
            let subtree = read_memento(only_child(element)?)?;
            Ok(if element.name == INSERT_CHILD {
                DiffEdit::InsertChild {
                    parent: uuid,
                    index,
                    subtree,
                }
            } else {
                DiffEdit::RemoveChild {
                    parent: uuid,
                    index,
                    subtree,
                }
            })
        }
        MOVE_CHILD => Ok(DiffEdit::MoveChild {
            parent: uuid,
            uuid: element.uuid("child")?,
            from: element.index("from")?,
            to: element.index("to")?,
        }),
        ADD_PROPERTY | REMOVE_PROPERTY => {
            let scope = read_scope(element)?;
            let index = element.index("index")?;
            let entry = read_entry(only_child(element)?)?;
            Ok(if element.name == ADD_PROPERTY {
                DiffEdit::AddProperty {
                    uuid,
                    scope,
                    index,
                    entry,
                }
            } else {
                DiffEdit::RemoveProperty {
                    uuid,
                    scope,
                    index,
                    entry,
                }
            })
        }
        RENAME => Ok(DiffEdit::Rename {
            uuid,
            old: element.required("old")?.to_string(),
            new: element.required("new")?.to_string(),
        }),
        other => Err(element.error(format!("unknown edit <{}>", other))),
    }
}

fn read_scope(element: &Element) -> Result<PropertyScope, ParseError> {
    match element.required("scope")? {
        "static" => Ok(PropertyScope::Static),
        "dynamic" => Ok(PropertyScope::Dynamic),
        other => Err(element.error(format!("unknown property scope '{}'", other))),
    }
}

/// The single element wrapped by `<oldVal>` or `<newVal>`.
fn single<'a>(element: &'a Element, wrapper: &str) -> Result<&'a Element, ParseError> {
    let wrapped = element
        .children
        .iter()
        .find(|c| c.name == wrapper)
        .ok_or_else(|| element.error(format!("missing <{}>", wrapper)))?;
    wrapped.expect_no_text()?;
    only_child(wrapped)
}

fn only_child(element: &Element) -> Result<&Element, ParseError> {
    match element.children.as_slice() {
        [child] => Ok(child),
        _ => Err(element.error(format!(
            "<{}> must contain exactly one element",
            element.name
        ))),
    }
}

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::{DiffEdit, MementoDiff, PropertyScope};
use crate::errors::DiffError;
use crate::memento::{Memento, PropertyEntry};

impl MementoDiff {
    /// Edits that turn `old` into `new`.
    ///
    /// Per node the edits come in a fixed order: rename, property removals
    /// and additions, value changes, child removals, child inserts and
    /// moves, then the edits of matched children.
    ///
    /// # Errors
    ///
    /// `IdentityMismatch` or `ClassMismatch` for different roots,
    /// `AmbiguousChild` if siblings share a uuid.
    pub fn between(old: &Memento, new: &Memento) -> Result<MementoDiff, DiffError> {
        if old.uuid != new.uuid {
            return Err(DiffError::IdentityMismatch {
                left: old.uuid,
                right: new.uuid,
            });
        }
        if old.class_name != new.class_name {
            return Err(DiffError::ClassMismatch {
                uuid: old.uuid,
                left: old.class_name.clone(),
                right: new.class_name.clone(),
            });
        }

        let mut diff = MementoDiff::new();
        if old.full_hash() == new.full_hash() {
            return Ok(diff);
        }
        diff_node(old, new, &mut diff.edits)?;
        tracing::debug!(node_uuid = %old.uuid, edit_count = diff.len(), "computed diff");
        Ok(diff)
    }
}

fn diff_node(old: &Memento, new: &Memento, edits: &mut Vec<DiffEdit>) -> Result<(), DiffError> {
    if old == new {
        return Ok(());
    }
    let uuid = old.uuid;

    if old.name != new.name {
        edits.push(DiffEdit::Rename {
            uuid,
            old: old.name.clone(),
            new: new.name.clone(),
        });
    }

    diff_properties(uuid, PropertyScope::Static, &old.properties, &new.properties, edits);
    diff_properties(
        uuid,
        PropertyScope::Dynamic,
        &old.dynamic_properties,
        &new.dynamic_properties,
        edits,
    );

    diff_children(old, new, edits)
}

fn diff_properties(
    uuid: Uuid,
    scope: PropertyScope,
    old: &[PropertyEntry],
    new: &[PropertyEntry],
    edits: &mut Vec<DiffEdit>,
) {
    // An ident whose kind changed is not the same property any more.
    let matches = |a: &PropertyEntry, b: &PropertyEntry| a.ident == b.ident && a.kind == b.kind;
    let kept_old: Vec<&PropertyEntry> = old
        .iter()
        .filter(|a| new.iter().any(|b| matches(a, b)))
        .collect();
    let kept_new: Vec<&PropertyEntry> = new
        .iter()
        .filter(|b| old.iter().any(|a| matches(a, b)))
        .collect();
    let reordered = kept_old
        .iter()
        .zip(kept_new.iter())
        .any(|(a, b)| a.ident != b.ident);

    let keep_old = |entry: &PropertyEntry| !reordered && kept_old.iter().any(|k| k.ident == entry.ident);
    let keep_new = |entry: &PropertyEntry| !reordered && kept_new.iter().any(|k| k.ident == entry.ident);

    for (index, entry) in old.iter().enumerate().rev() {
        if !keep_old(entry) {
            edits.push(DiffEdit::RemoveProperty {
                uuid,
                scope,
                index,
                entry: entry.clone(),
            });
        }
    }
    for (index, entry) in new.iter().enumerate() {
        if !keep_new(entry) {
            edits.push(DiffEdit::AddProperty {
                uuid,
                scope,
                index,
                entry: entry.clone(),
            });
        }
    }
    if reordered {
        return;
    }
    for (before, after) in kept_old.iter().zip(kept_new.iter()) {
        if before != after {
            edits.push(DiffEdit::ChangeValue {
                uuid,
                ident: after.ident.clone(),
                old: (*before).clone(),
                new: (*after).clone(),
            });
        }
    }
}

fn diff_children(old: &Memento, new: &Memento, edits: &mut Vec<DiffEdit>) -> Result<(), DiffError> {
    let parent = old.uuid;
    let old_index = index_children(parent, &old.children)?;
    let new_index = index_children(parent, &new.children)?;

    // Same uuid with a different class is a replacement.
    let matched = |uuid: &Uuid| match (old_index.get(uuid), new_index.get(uuid)) {
        (Some(a), Some(b)) => old.children[*a].class_name == new.children[*b].class_name,
        _ => false,
    };

    for (index, child) in old.children.iter().enumerate().rev() {
        if !matched(&child.uuid) {
            edits.push(DiffEdit::RemoveChild {
                parent,
                index,
                subtree: child.clone(),
            });
        }
    }

    let mut working: Vec<Uuid> = old
        .children
        .iter()
        .map(|c| c.uuid)
        .filter(|uuid| matched(uuid))
        .collect();
    for (to, child) in new.children.iter().enumerate() {
        if !matched(&child.uuid) {
            edits.push(DiffEdit::InsertChild {
                parent,
                index: to,
                subtree: child.clone(),
            });
            working.insert(to, child.uuid);
            continue;
        }
        let Some(from) = working.iter().position(|u| *u == child.uuid) else {
            continue;
        };
        if from != to {
            edits.push(DiffEdit::MoveChild {
                parent,
                uuid: child.uuid,
                from,
                to,
            });
            working.remove(from);
            working.insert(to, child.uuid);
        }
    }

    for child in &new.children {
        if let Some(index) = old_index.get(&child.uuid) {
            if matched(&child.uuid) {
                diff_node(&old.children[*index], child, edits)?;
            }
        }
    }
    Ok(())
}

fn index_children(parent: Uuid, children: &[Memento]) -> Result<HashMap<Uuid, usize>, DiffError> {
    let mut seen = HashSet::new();
    let mut index = HashMap::new();
    for (i, child) in children.iter().enumerate() {
        if !seen.insert(child.uuid) {
            return Err(DiffError::AmbiguousChild {
                parent,
                uuid: child.uuid,
            });
        }
        index.insert(child.uuid, i);
    }
    Ok(index)
}

//! Pure structural edits on a composer tree.
//!
//! Every operation takes the current root and returns a root. The input is
//! never modified: nodes on the path from the root to the edited node are
//! copied, everything else is shared with the input through its `Arc`. When an
//! operation has nothing to do it returns a clone of the input handle, so
//! `Arc::ptr_eq(&before, &after)` tells the caller that nothing changed.
//!
//! Targets are located in one canonical order: the node itself, then its
//! `children` in sequence, then its entity-typed variables in key order. Only
//! the first match is edited, even when an id is reachable through both
//! linkages.

use std::sync::Arc;
use tracing::debug;
use crate::dsl::{ComposerNode, NodePatch, NodeRef, VariableValue};

enum Outcome {
    /// Target id does not occur below this node.
    Missing,
    /// Target found, but the edit was a no-op.
    Unchanged,
    Replaced(NodeRef),
}

/// Rebuilds the path down to the first node whose id is `target_id` and lets
/// `edit` produce its replacement.
fn rewrite<F>(node: &NodeRef, target_id: &str, edit: &mut F) -> Outcome
where
    F: FnMut(&NodeRef) -> Option<NodeRef>,
{
    if node.id == target_id {
        return match edit(node) {
            Some(replacement) => Outcome::Replaced(replacement),
            None => Outcome::Unchanged,
        };
    }

    for (idx, child) in node.children.iter().enumerate() {
        match rewrite(child, target_id, edit) {
            Outcome::Missing => continue,
            Outcome::Unchanged => return Outcome::Unchanged,
            Outcome::Replaced(new_child) => {
                let mut copy = ComposerNode::clone(node);
                copy.children[idx] = new_child;
                return Outcome::Replaced(Arc::new(copy));
            }
        }
    }

    for (name, value) in &node.variables {
        let Some(entity) = value.as_entity() else {
            continue;
        };
        match rewrite(entity, target_id, edit) {
            Outcome::Missing => continue,
            Outcome::Unchanged => return Outcome::Unchanged,
            Outcome::Replaced(new_entity) => {
                let mut copy = ComposerNode::clone(node);
                copy.variables.insert(name.clone(), VariableValue::Entity { node: Some(new_entity) });
                return Outcome::Replaced(Arc::new(copy));
            }
        }
    }

    Outcome::Missing
}

fn apply<F>(root: &NodeRef, target_id: &str, op: &str, mut edit: F) -> NodeRef
where
    F: FnMut(&NodeRef) -> Option<NodeRef>,
{
    match rewrite(root, target_id, &mut edit) {
        Outcome::Replaced(new_root) => new_root,
        Outcome::Unchanged => {
            debug!(op, target_id, "Edit left the tree unchanged");
            Arc::clone(root)
        }
        Outcome::Missing => {
            debug!(op, target_id, "Target node not found");
            Arc::clone(root)
        }
    }
}

/// Merge `patch` into the fields of the node with `target_id`.
pub fn update_node(root: &NodeRef, target_id: &str, patch: &NodePatch) -> NodeRef {
    apply(root, target_id, "update_node", |node| {
        let mut updated = ComposerNode::clone(node);
        patch.apply_to(&mut updated);
        if updated == **node {
            None
        } else {
            Some(Arc::new(updated))
        }
    })
}

/// Append `child` to the children of `parent_id`, after any existing children.
pub fn add_child(root: &NodeRef, parent_id: &str, child: impl Into<NodeRef>) -> NodeRef {
    let child = child.into();
    apply(root, parent_id, "add_child", |node| {
        let mut updated = ComposerNode::clone(node);
        updated.children.push(Arc::clone(&child));
        Some(Arc::new(updated))
    })
}

/// Insert or overwrite `variables[name]` on `target_id`.
pub fn set_variable(root: &NodeRef, target_id: &str, name: &str, value: VariableValue) -> NodeRef {
    apply(root, target_id, "set_variable", |node| {
        if node.variables.get(name) == Some(&value) {
            return None;
        }
        let mut updated = ComposerNode::clone(node);
        updated.variables.insert(name.to_string(), value.clone());
        Some(Arc::new(updated))
    })
}

/// Remove `variables[name]` from `target_id`. An absent key is a no-op.
pub fn delete_variable(root: &NodeRef, target_id: &str, name: &str) -> NodeRef {
    apply(root, target_id, "delete_variable", |node| {
        if !node.variables.contains_key(name) {
            return None;
        }
        let mut updated = ComposerNode::clone(node);
        updated.variables.remove(name);
        Some(Arc::new(updated))
    })
}

/// Swap the whole subtree rooted at `target_id` for `replacement`.
pub fn replace_subtree(root: &NodeRef, target_id: &str, replacement: impl Into<NodeRef>) -> NodeRef {
    let replacement = replacement.into();
    apply(root, target_id, "replace_subtree", |node| {
        if Arc::ptr_eq(node, &replacement) || **node == *replacement {
            None
        } else {
            Some(Arc::clone(&replacement))
        }
    })
}

/// Detach the first node with `target_id` from whichever slot holds it.
///
/// A node held in `children` is removed from the sequence; a node held by an
/// entity variable takes the variable with it. The root has no holder and is
/// never removed. When the root itself carries `target_id` it is the first
/// match, so nothing below it is touched either.
pub fn remove_node(root: &NodeRef, target_id: &str) -> NodeRef {
    if root.id == target_id {
        debug!(op = "remove_node", target_id, "Target is the root, left in place");
        return Arc::clone(root);
    }
    match detach(root, target_id) {
        Some(new_root) => new_root,
        None => {
            debug!(op = "remove_node", target_id, "Target node not found below root");
            Arc::clone(root)
        }
    }
}

fn detach(node: &NodeRef, target_id: &str) -> Option<NodeRef> {
    for (idx, child) in node.children.iter().enumerate() {
        if child.id == target_id {
            let mut copy = ComposerNode::clone(node);
            copy.children.remove(idx);
            return Some(Arc::new(copy));
        }
        if let Some(new_child) = detach(child, target_id) {
            let mut copy = ComposerNode::clone(node);
            copy.children[idx] = new_child;
            return Some(Arc::new(copy));
        }
    }

    for (name, value) in &node.variables {
        let Some(entity) = value.as_entity() else {
            continue;
        };
        if entity.id == target_id {
            let mut copy = ComposerNode::clone(node);
            copy.variables.remove(name);
            return Some(Arc::new(copy));
        }
        if let Some(new_entity) = detach(entity, target_id) {
            let mut copy = ComposerNode::clone(node);
            copy.variables.insert(name.clone(), VariableValue::Entity { node: Some(new_entity) });
            return Some(Arc::new(copy));
        }
    }

    None
}

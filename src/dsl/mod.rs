pub mod builder;
pub mod codec;
pub mod mutator;

use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use crate::compiler::substitution;

/// Shared handle to a node. Untouched subtrees are shared between tree versions.
pub type NodeRef = Arc<ComposerNode>;

/// Closed set of node kinds. Descriptive only, compilation ignores it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum EntityType {
    #[default]
    Prompt,
    Context,
    Instruction,
    Example,
    Persona,
    Format,
}

/// Composer tree node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposerNode {
    pub id: String,
    #[serde(rename = "entityType", default)]
    pub entity_type: EntityType,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableValue>,
    #[serde(default)]
    pub children: Vec<NodeRef>,
}

/// Value bound to a placeholder name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VariableValue {
    Literal {
        value: String,
    },
    /// An embedded node. `None` is a dangling reference and compiles as unresolved.
    Entity {
        #[serde(default)]
        node: Option<NodeRef>,
    },
}

impl VariableValue {
    pub fn literal(value: impl Into<String>) -> Self {
        VariableValue::Literal { value: value.into() }
    }

    pub fn entity(node: impl Into<NodeRef>) -> Self {
        VariableValue::Entity { node: Some(node.into()) }
    }

    pub fn as_entity(&self) -> Option<&NodeRef> {
        match self {
            VariableValue::Entity { node } => node.as_ref(),
            VariableValue::Literal { .. } => None,
        }
    }
}

/// Partial update applied by `mutator::update_node`. `None` fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "entityType")]
    pub entity_type: Option<EntityType>,
}

impl NodePatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.entity_type.is_none()
    }

    pub(crate) fn apply_to(&self, node: &mut ComposerNode) {
        if let Some(title) = &self.title {
            node.title = title.clone();
        }
        if let Some(content) = &self.content {
            node.content = content.clone();
        }
        if let Some(entity_type) = self.entity_type {
            node.entity_type = entity_type;
        }
    }
}

impl ComposerNode {
    pub fn new(id: impl Into<String>, entity_type: EntityType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type,
            title: title.into(),
            content: String::new(),
            variables: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Locate a node by id.
    ///
    /// Search order is the node itself, then `children` in order, then the
    /// entity-typed variables in key order. The first match wins.
    pub fn find(&self, id: &str) -> Option<&ComposerNode> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find(id))
            .or_else(|| {
                self.variables
                    .values()
                    .filter_map(VariableValue::as_entity)
                    .find_map(|node| node.find(id))
            })
    }

    /// Placeholder names used in `content`, in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        substitution::placeholders(&self.content)
    }

    /// Placeholders with no binding in `variables`.
    pub fn missing_variables(&self) -> Vec<String> {
        self.placeholders()
            .into_iter()
            .filter(|name| !self.variables.contains_key(name))
            .collect()
    }

    /// Number of nodes reachable through both linkages, this node included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
            + self
                .variables
                .values()
                .filter_map(VariableValue::as_entity)
                .map(|n| n.node_count())
                .sum::<usize>()
    }
}

/// Persisted form of one tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComposerTreeRecord {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tree_data: ComposerNode,
}

impl ComposerTreeRecord {
    pub fn summary(&self) -> TreeSummary {
        TreeSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Catalog entry for an available tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeSummary {
    pub id: String,
    pub name: String,
}

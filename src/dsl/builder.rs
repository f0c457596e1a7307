use crate::dsl::{ComposerNode, EntityType, NodeRef, VariableValue};
use std::sync::Arc;

pub struct NodeBuilder {
    node: ComposerNode,
}

impl NodeBuilder {
    /// Title defaults to the id until `title` is called.
    pub fn new(id: &str) -> Self {
        Self {
            node: ComposerNode::new(id, EntityType::Prompt, id),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.node.title = title.to_string();
        self
    }

    pub fn kind(mut self, entity_type: EntityType) -> Self {
        self.node.entity_type = entity_type;
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.node.content = content.to_string();
        self
    }

    pub fn literal(mut self, name: &str, value: &str) -> Self {
        self.node.variables.insert(name.to_string(), VariableValue::literal(value));
        self
    }

    pub fn entity(mut self, name: &str, node: impl Into<NodeRef>) -> Self {
        self.node.variables.insert(name.to_string(), VariableValue::entity(node));
        self
    }

    /// Entity variable with no node attached
    pub fn dangling(mut self, name: &str) -> Self {
        self.node.variables.insert(name.to_string(), VariableValue::Entity { node: None });
        self
    }

    pub fn child(mut self, node: impl Into<NodeRef>) -> Self {
        self.node.children.push(node.into());
        self
    }

    pub fn build(self) -> ComposerNode {
        self.node
    }

    pub fn build_ref(self) -> NodeRef {
        Arc::new(self.node)
    }
}

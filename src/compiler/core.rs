use crate::compiler::substitution::substitute;
use crate::dsl::{ComposerNode, VariableValue};
use serde::{Serialize, Deserialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub const CIRCULAR_REFERENCE_MARKER: &str = "[Circular Reference]";
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// One visited node in the expansion sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpandedNode {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "resolvedContent")]
    pub resolved_content: String,
}

/// Recoverable problems found while compiling. Each one is also rendered
/// inline in the affected node's resolved content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum CompileWarning {
    UnresolvedVariable {
        node_id: String,
        name: String,
    },
    /// `variable` names the entity slot that closed the cycle; `None` when
    /// the repeated node sits in `children`.
    CircularReference {
        node_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variable: Option<String>,
        target_id: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledTree {
    pub expanded: Vec<ExpandedNode>,
    pub document: String,
    pub warnings: Vec<CompileWarning>,
}

impl CompiledTree {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Flattens a composer tree into an expansion sequence and a document.
///
/// Entity variables are compiled before the node that references them and
/// contribute only their title to its text. Children are compiled after
/// their parent, in order. A node whose id is already on the current path is
/// not entered again; the referencing slot gets `CIRCULAR_REFERENCE_MARKER`.
pub struct Compiler {
    /// Ids on the path from the root to the node being compiled.
    resolving: HashSet<String>,
    expanded: Vec<ExpandedNode>,
    warnings: Vec<CompileWarning>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            resolving: HashSet::new(),
            expanded: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn compile(mut self, root: &ComposerNode) -> CompiledTree {
        self.compile_node(root);

        let document = self
            .expanded
            .iter()
            .map(|n| n.resolved_content.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);

        debug!(
            root_id = %root.id,
            nodes = self.expanded.len(),
            warnings = self.warnings.len(),
            "Compiled composer tree"
        );

        CompiledTree {
            expanded: self.expanded,
            document,
            warnings: self.warnings,
        }
    }

    fn compile_node(&mut self, node: &ComposerNode) {
        self.resolving.insert(node.id.clone());

        // 1. Build the substitution map, expanding entities first
        let mut resolved: HashMap<String, String> = HashMap::new();
        for (name, value) in &node.variables {
            match value {
                VariableValue::Literal { value } => {
                    resolved.insert(name.clone(), value.clone());
                }
                VariableValue::Entity { node: Some(target) } => {
                    if self.resolving.contains(&target.id) {
                        warn!(node_id = %node.id, variable = %name, target_id = %target.id, "Circular reference");
                        self.warnings.push(CompileWarning::CircularReference {
                            node_id: node.id.clone(),
                            variable: Some(name.clone()),
                            target_id: target.id.clone(),
                        });
                        resolved.insert(name.clone(), CIRCULAR_REFERENCE_MARKER.to_string());
                    } else {
                        self.compile_node(target);
                        resolved.insert(name.clone(), target.title.clone());
                    }
                }
                // Dangling entity: left out of the map so it renders as unresolved
                VariableValue::Entity { node: None } => {}
            }
        }

        // 2. Substitute
        for name in node.placeholders() {
            if !resolved.contains_key(&name) {
                warn!(node_id = %node.id, variable = %name, "Unresolved variable");
                self.warnings.push(CompileWarning::UnresolvedVariable {
                    node_id: node.id.clone(),
                    name,
                });
            }
        }
        let resolved_content = substitute(&node.content, &resolved);

        // 3. Record
        self.expanded.push(ExpandedNode {
            id: node.id.clone(),
            title: node.title.clone(),
            content: node.content.clone(),
            resolved_content,
        });

        // 4. Children
        for child in &node.children {
            if self.resolving.contains(&child.id) {
                warn!(node_id = %node.id, target_id = %child.id, "Circular child reference");
                self.warnings.push(CompileWarning::CircularReference {
                    node_id: node.id.clone(),
                    variable: None,
                    target_id: child.id.clone(),
                });
                continue;
            }
            self.compile_node(child);
        }

        self.resolving.remove(&node.id);
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile `root` with a fresh compiler.
pub fn compile(root: &ComposerNode) -> CompiledTree {
    Compiler::new().compile(root)
}

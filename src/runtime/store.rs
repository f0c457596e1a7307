use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn};
use crate::compiler::{compile, CompiledTree};
use crate::dsl::{ComposerNode, ComposerTreeRecord, EntityType, NodeRef, TreeSummary};
use crate::error::StoreError;
use crate::runtime::storage::{IdAllocator, InMemoryTreeRepository, TreeRepository, UuidAllocator};

/// Editing session: the active tree plus the catalog of saved trees.
///
/// Root changes are wholesale swaps. Persistence calls either complete and
/// update the session, or fail and leave it as it was (except `list`, which
/// empties the catalog on failure instead of keeping a stale one).
pub struct TreeStore {
    repository: Arc<dyn TreeRepository>,
    ids: Arc<dyn IdAllocator>,
    active_tree_id: Option<String>,
    root: Option<NodeRef>,
    available_trees: Vec<TreeSummary>,
}

impl TreeStore {
    pub fn new() -> Self {
        Self::new_with_storage(Arc::new(InMemoryTreeRepository::new()), Arc::new(UuidAllocator))
    }

    pub fn new_with_storage(repository: Arc<dyn TreeRepository>, ids: Arc<dyn IdAllocator>) -> Self {
        Self {
            repository,
            ids,
            active_tree_id: None,
            root: None,
            available_trees: Vec::new(),
        }
    }

    pub fn root(&self) -> Option<&NodeRef> {
        self.root.as_ref()
    }

    pub fn active_tree_id(&self) -> Option<&str> {
        self.active_tree_id.as_deref()
    }

    pub fn available_trees(&self) -> &[TreeSummary] {
        &self.available_trees
    }

    /// Whether `tree_id` is still the active tree. Callers use this to drop
    /// results of a load/save that was overtaken by another one.
    pub fn is_active(&self, tree_id: &str) -> bool {
        self.active_tree_id.as_deref() == Some(tree_id)
    }

    /// Fresh node with an allocated id.
    pub fn new_node(&self, entity_type: EntityType, title: &str) -> ComposerNode {
        ComposerNode::new(self.ids.allocate(), entity_type, title)
    }

    /// Install a new root, discarding the previous one. The active tree id is kept,
    /// so a later `save` overwrites the tree being edited.
    pub fn set_root(&mut self, node: impl Into<NodeRef>) {
        self.root = Some(node.into());
    }

    /// Run a mutator against the current root. Returns `false` when there is
    /// no root to edit.
    pub fn apply<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&NodeRef) -> NodeRef,
    {
        match &self.root {
            Some(root) => {
                let next = edit(root);
                self.root = Some(next);
                true
            }
            None => false,
        }
    }

    pub fn compile(&self) -> Option<CompiledTree> {
        self.root.as_deref().map(compile)
    }

    pub fn clear(&mut self) {
        self.active_tree_id = None;
        self.root = None;
    }

    pub async fn load(&mut self, tree_id: &str) -> Result<NodeRef, StoreError> {
        let record = self
            .repository
            .get(tree_id)
            .await
            .map_err(StoreError::persistence)?
            .ok_or_else(|| StoreError::NotFound(tree_id.to_string()))?;

        let root: NodeRef = Arc::new(record.tree_data);
        self.active_tree_id = Some(record.id);
        self.root = Some(Arc::clone(&root));
        info!(tree_id, name = %record.name, "Loaded tree");
        Ok(root)
    }

    /// Persist the current root under the active id, or a fresh one when no
    /// tree is active. Returns the id the tree was stored under.
    pub async fn save(&mut self, name: &str) -> Result<String, StoreError> {
        let root = self.root.as_ref().ok_or(StoreError::EmptyRoot)?;
        let id = match &self.active_tree_id {
            Some(id) => id.clone(),
            None => self.ids.allocate(),
        };

        let now = Utc::now();
        let record = ComposerTreeRecord {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            tree_data: ComposerNode::clone(root),
        };

        let stored_id = self
            .repository
            .upsert(record)
            .await
            .map_err(StoreError::persistence)?;

        match self.available_trees.iter_mut().find(|t| t.id == stored_id) {
            Some(entry) => entry.name = name.to_string(),
            None => self.available_trees.push(TreeSummary {
                id: stored_id.clone(),
                name: name.to_string(),
            }),
        }
        self.active_tree_id = Some(stored_id.clone());
        info!(tree_id = %stored_id, name, "Saved tree");
        Ok(stored_id)
    }

    pub async fn list(&mut self) -> Result<&[TreeSummary], StoreError> {
        match self.repository.list().await {
            Ok(records) => {
                self.available_trees = records.iter().map(ComposerTreeRecord::summary).collect();
                Ok(&self.available_trees)
            }
            Err(e) => {
                warn!(error = %e, "Failed to list trees");
                self.available_trees.clear();
                Err(StoreError::persistence(e))
            }
        }
    }

    /// Remove a stored tree. Deleting the active tree also clears the session root.
    pub async fn delete(&mut self, tree_id: &str) -> Result<(), StoreError> {
        let removed = self
            .repository
            .delete(tree_id)
            .await
            .map_err(StoreError::persistence)?;
        if !removed {
            return Err(StoreError::NotFound(tree_id.to_string()));
        }

        self.available_trees.retain(|t| t.id != tree_id);
        if self.is_active(tree_id) {
            self.clear();
        }
        info!(tree_id, "Deleted tree");
        Ok(())
    }
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

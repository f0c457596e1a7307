use async_trait::async_trait;
use uuid::Uuid;
use crate::dsl::ComposerTreeRecord;
use anyhow::Result;
use dashmap::DashMap;
use std::cmp::Reverse;

// --- Interfaces ---

/// Backend that persists whole tree records.
#[async_trait]
pub trait TreeRepository: Send + Sync {
    /// Insert or replace the record with `record.id`. Returns the stored id.
    /// An existing record keeps its original `created_at`.
    async fn upsert(&self, record: ComposerTreeRecord) -> Result<String>;
    async fn get(&self, id: &str) -> Result<Option<ComposerTreeRecord>>;
    /// All records, most recently updated first.
    async fn list(&self) -> Result<Vec<ComposerTreeRecord>>;
    /// Returns whether a record was actually removed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Source of fresh, globally unique ids for trees and nodes.
pub trait IdAllocator: Send + Sync {
    fn allocate(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidAllocator;

impl IdAllocator for UuidAllocator {
    fn allocate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

pub(crate) fn sort_recent_first(records: &mut [ComposerTreeRecord]) {
    records.sort_by(|a, b| {
        Reverse(a.updated_at)
            .cmp(&Reverse(b.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

// --- In-Memory Implementation ---

#[derive(Default)]
pub struct InMemoryTreeRepository {
    records: DashMap<String, ComposerTreeRecord>,
}

impl InMemoryTreeRepository {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TreeRepository for InMemoryTreeRepository {
    async fn upsert(&self, mut record: ComposerTreeRecord) -> Result<String> {
        let id = record.id.clone();
        if let Some(existing) = self.records.get(&id) {
            record.created_at = existing.created_at;
        }
        // Read guard must be released before insert (same shard)
        self.records.insert(id.clone(), record);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<ComposerTreeRecord>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn list(&self) -> Result<Vec<ComposerTreeRecord>> {
        let mut records: Vec<ComposerTreeRecord> =
            self.records.iter().map(|item| item.value().clone()).collect();
        sort_recent_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.records.remove(id).is_some())
    }
}

use async_trait::async_trait;
use crate::dsl::ComposerTreeRecord;
use crate::dsl::codec::from_json;
use crate::runtime::storage::{sort_recent_first, TreeRepository};
use anyhow::{Result, Context as AnyhowContext};
use redis::AsyncCommands;
use tracing::debug;

/// Stores every record as JSON in one Redis hash, keyed by tree id.
pub struct RedisTreeRepository {
    client: redis::Client,
    key_prefix: String,
}

impl RedisTreeRepository {
    pub fn new(client: redis::Client, key_prefix: String) -> Self {
        Self {
            client,
            key_prefix,
        }
    }

    pub fn open(url: &str, key_prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("Invalid Redis URL: {}", url))?;
        Ok(Self::new(client, key_prefix.to_string()))
    }

    fn trees_key(&self) -> String {
        format!("{}:trees", self.key_prefix)
    }
}

#[async_trait]
impl TreeRepository for RedisTreeRepository {
    async fn upsert(&self, mut record: ComposerTreeRecord) -> Result<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = self.trees_key();

        let existing: Option<String> = conn.hget(&key, &record.id).await?;
        if let Some(json) = existing {
            let previous: ComposerTreeRecord = from_json(&json)
                .with_context(|| format!("Corrupt record for tree {}", record.id))?;
            record.created_at = previous.created_at;
        }

        let serialized = serde_json::to_string(&record)?;
        let _: () = conn.hset(&key, &record.id, serialized).await?;
        debug!(tree_id = %record.id, "Upserted tree record in Redis");
        Ok(record.id)
    }

    async fn get(&self, id: &str) -> Result<Option<ComposerTreeRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let val_str: Option<String> = conn.hget(self.trees_key(), id).await?;

        if let Some(s) = val_str {
            let record = from_json(&s)
                .with_context(|| format!("Corrupt record for tree {}", id))?;
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    async fn list(&self) -> Result<Vec<ComposerTreeRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let entries: Vec<(String, String)> = conn.hgetall(self.trees_key()).await?;

        let mut records = Vec::with_capacity(entries.len());
        for (id, json) in entries {
            let record: ComposerTreeRecord = from_json(&json)
                .with_context(|| format!("Corrupt record for tree {}", id))?;
            records.push(record);
        }
        sort_recent_first(&mut records);
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let removed: usize = conn.hdel(self.trees_key(), id).await?;
        Ok(removed > 0)
    }
}

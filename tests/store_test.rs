use async_trait::async_trait;
use composer::dsl::builder::NodeBuilder;
use composer::dsl::mutator::set_variable;
use composer::dsl::{ComposerTreeRecord, EntityType, VariableValue};
use composer::error::StoreError;
use composer::runtime::storage::{IdAllocator, InMemoryTreeRepository, TreeRepository};
use composer::runtime::store::TreeStore;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Hands out "id-1", "id-2", ...
#[derive(Default)]
struct SequentialIds {
    next: AtomicUsize,
}

impl IdAllocator for SequentialIds {
    fn allocate(&self) -> String {
        format!("id-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Wraps the in-memory repository and fails every call while `broken` is set.
#[derive(Default)]
struct FlakyRepository {
    inner: InMemoryTreeRepository,
    broken: AtomicBool,
}

impl FlakyRepository {
    fn check(&self) -> anyhow::Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            anyhow::bail!("backend unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl TreeRepository for FlakyRepository {
    async fn upsert(&self, record: ComposerTreeRecord) -> anyhow::Result<String> {
        self.check()?;
        self.inner.upsert(record).await
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<ComposerTreeRecord>> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn list(&self) -> anyhow::Result<Vec<ComposerTreeRecord>> {
        self.check()?;
        self.inner.list().await
    }

    async fn delete(&self, id: &str) -> anyhow::Result<bool> {
        self.check()?;
        self.inner.delete(id).await
    }
}

fn store_with(repo: Arc<FlakyRepository>) -> TreeStore {
    TreeStore::new_with_storage(repo, Arc::new(SequentialIds::default()))
}

fn greeting_tree() -> composer::dsl::ComposerNode {
    NodeBuilder::new("root")
        .title("Greeting")
        .content("Hello {{name}}")
        .literal("name", "World")
        .child(
            NodeBuilder::new("sig")
                .content("Regards, {{sender}}")
                .entity("sender", NodeBuilder::new("me").title("Me").content("Me").build())
                .build(),
        )
        .build()
}

#[tokio::test]
async fn test_save_allocates_id_then_reuses_it() {
    let repo = Arc::new(FlakyRepository::default());
    let mut store = store_with(repo.clone());
    store.set_root(greeting_tree());

    let first = store.save("Greeting").await.expect("Save failed");
    assert_eq!(first, "id-1");
    assert_eq!(store.active_tree_id(), Some("id-1"));

    store.apply(|root| set_variable(root, "root", "name", VariableValue::literal("Rust")));
    let second = store.save("Greeting v2").await.expect("Second save failed");
    assert_eq!(second, "id-1");
    assert_eq!(repo.inner.len(), 1);

    let stored = repo.inner.get("id-1").await.unwrap().expect("Record missing");
    assert_eq!(stored.name, "Greeting v2");
    assert_eq!(stored.tree_data.variables["name"], VariableValue::literal("Rust"));
    assert!(stored.created_at <= stored.updated_at);
    assert_eq!(store.available_trees().len(), 1);
    assert_eq!(store.available_trees()[0].name, "Greeting v2");
}

#[tokio::test]
async fn test_save_without_root_is_rejected() {
    let repo = Arc::new(FlakyRepository::default());
    let mut store = store_with(repo.clone());

    let err = store.save("nothing").await.unwrap_err();

    assert_eq!(err, StoreError::EmptyRoot);
    assert!(repo.inner.is_empty());
    assert_eq!(store.active_tree_id(), None);
}

#[tokio::test]
async fn test_load_replaces_root_and_round_trips() {
    let repo = Arc::new(FlakyRepository::default());
    let mut writer = store_with(repo.clone());
    writer.set_root(greeting_tree());
    let id = writer.save("Greeting").await.unwrap();

    let mut reader = store_with(repo);
    reader.set_root(NodeBuilder::new("scratch").build());
    let loaded = reader.load(&id).await.expect("Load failed");

    assert_eq!(*loaded, greeting_tree());
    assert!(reader.is_active(&id));
    assert_eq!(reader.root().unwrap().id, "root");
    assert_eq!(reader.compile().unwrap().document, "Hello World\n\nMe\n\nRegards, Me");
}

#[tokio::test]
async fn test_load_unknown_id_keeps_state() {
    let repo = Arc::new(FlakyRepository::default());
    let mut store = store_with(repo);
    store.set_root(greeting_tree());
    let id = store.save("Greeting").await.unwrap();

    let err = store.load("missing").await.unwrap_err();

    assert_eq!(err, StoreError::NotFound("missing".to_string()));
    assert!(store.is_active(&id));
    assert_eq!(store.root().unwrap().title, "Greeting");
}

#[tokio::test]
async fn test_persistence_failure_leaves_state_unchanged() {
    let repo = Arc::new(FlakyRepository::default());
    let mut store = store_with(repo.clone());
    store.set_root(greeting_tree());
    store.save("Greeting").await.unwrap();

    repo.broken.store(true, Ordering::SeqCst);
    store.apply(|root| set_variable(root, "root", "name", VariableValue::literal("Changed")));

    let err = store.save("Broken").await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence(ref m) if m.contains("backend unavailable")));
    assert_eq!(store.available_trees()[0].name, "Greeting");

    let err = store.load("id-1").await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence(_)));
    assert_eq!(
        store.root().unwrap().variables["name"],
        VariableValue::literal("Changed")
    );
}

#[tokio::test]
async fn test_list_refreshes_and_resets_on_failure() {
    let repo = Arc::new(FlakyRepository::default());
    let mut store = store_with(repo.clone());

    for name in ["One", "Two"] {
        store.clear();
        store.set_root(NodeBuilder::new(name).build());
        store.save(name).await.unwrap();
    }

    let mut names: Vec<String> = store
        .list()
        .await
        .expect("List failed")
        .iter()
        .map(|t| t.name.clone())
        .collect();
    names.sort();
    assert_eq!(names, vec!["One".to_string(), "Two".to_string()]);

    repo.broken.store(true, Ordering::SeqCst);
    assert!(store.list().await.is_err());
    assert!(store.available_trees().is_empty());
}

#[tokio::test]
async fn test_clear_keeps_catalog() {
    let repo = Arc::new(FlakyRepository::default());
    let mut store = store_with(repo);
    store.set_root(greeting_tree());
    store.save("Greeting").await.unwrap();

    store.clear();

    assert!(store.root().is_none());
    assert!(store.active_tree_id().is_none());
    assert_eq!(store.available_trees().len(), 1);
    assert!(store.compile().is_none());
}

#[tokio::test]
async fn test_delete_active_tree_clears_session() {
    let repo = Arc::new(FlakyRepository::default());
    let mut store = store_with(repo.clone());
    store.set_root(greeting_tree());
    let id = store.save("Greeting").await.unwrap();

    store.delete(&id).await.expect("Delete failed");

    assert!(store.root().is_none());
    assert!(store.active_tree_id().is_none());
    assert!(store.available_trees().is_empty());
    assert!(repo.inner.is_empty());

    let err = store.delete(&id).await.unwrap_err();
    assert_eq!(err, StoreError::NotFound(id));
}

#[tokio::test]
async fn test_delete_other_tree_keeps_session() {
    let repo = Arc::new(FlakyRepository::default());
    let mut store = store_with(repo);
    store.set_root(NodeBuilder::new("first").build());
    let first = store.save("First").await.unwrap();
    store.clear();
    store.set_root(NodeBuilder::new("second").build());
    let second = store.save("Second").await.unwrap();

    store.delete(&first).await.unwrap();

    assert!(store.is_active(&second));
    assert_eq!(store.root().unwrap().id, "second");
}

#[test]
fn test_new_node_uses_allocator() {
    let store = store_with(Arc::new(FlakyRepository::default()));

    let a = store.new_node(EntityType::Instruction, "Step");
    let b = store.new_node(EntityType::Prompt, "Other");

    assert_eq!(a.id, "id-1");
    assert_eq!(b.id, "id-2");
    assert_eq!(a.entity_type, EntityType::Instruction);
}

//! Repository Integration Tests
//!
//! LocalStore and RemoteStore over the in-memory and SQLite backends.

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::domain::{Item, ItemId, ItemList, OwnerId, Session};
    use crate::repository::{
        init_db, BlobStore, LocalStore, MemoryBlobStore, MemoryRowBackend, RemoteStore, RowBackend,
        RowDraft, SqliteBlobStore, SqliteRowBackend, GUEST_ITEMS_KEY,
    };

    fn session(owner: &str) -> Session {
        Session::new(format!("token-{}", owner), OwnerId::new(owner))
    }

    fn guest_list() -> ItemList {
        ItemList::from_items(vec![
            Item::new(ItemId::generate_local(), "Buy milk", false, 0),
            Item::new(ItemId::generate_local(), "Pay rent", true, 1),
        ])
    }

    fn setup_sqlite() -> (Arc<SqliteBlobStore>, Arc<SqliteRowBackend>) {
        // Use in-memory database for tests
        let db_state = init_db(&PathBuf::from(":memory:")).expect("Failed to init test DB");
        (
            Arc::new(SqliteBlobStore::new(db_state.connection())),
            Arc::new(SqliteRowBackend::new(db_state.connection())),
        )
    }

    fn drafts(contents: &[(&str, bool)], start: usize) -> Vec<RowDraft> {
        contents
            .iter()
            .enumerate()
            .map(|(index, (content, done))| RowDraft {
                content: content.to_string(),
                is_completed: *done,
                position: start + index,
            })
            .collect()
    }

    fn tuples(items: &[Item]) -> Vec<(ItemId, String, bool)> {
        items
            .iter()
            .map(|item| (item.id.clone(), item.content.clone(), item.is_completed))
            .collect()
    }

    #[tokio::test]
    async fn test_local_roundtrip_memory() {
        let store = LocalStore::new(Arc::new(MemoryBlobStore::new()));
        let list = guest_list();

        store.save(&list).await;
        assert_eq!(tuples(&store.load().await), tuples(list.as_slice()));
    }

    #[tokio::test]
    async fn test_local_roundtrip_sqlite() {
        let (blobs, _) = setup_sqlite();
        let store = LocalStore::new(blobs);
        let list = guest_list();

        store.save(&list).await;
        store.save(&list.clone().with_toggled(&list.as_slice()[0].id)).await;

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|item| item.is_completed));
    }

    #[tokio::test]
    async fn test_local_missing_and_malformed_are_empty() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = LocalStore::new(blobs.clone());
        assert!(store.load().await.is_empty());

        blobs.set(GUEST_ITEMS_KEY, "{\"oops\": ").await.unwrap();
        assert!(store.load().await.is_empty());

        blobs.set(GUEST_ITEMS_KEY, "[{\"id\": \"a\"}]").await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_local_failures_are_swallowed() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = LocalStore::new(blobs.clone());

        blobs.set_fail_writes(true);
        store.save(&guest_list()).await;
        assert_eq!(blobs.raw(GUEST_ITEMS_KEY).await, None);

        blobs.set_unavailable(true);
        assert!(store.load().await.is_empty());
        store.clear().await;
        store.clear().await;
    }

    #[tokio::test]
    async fn test_local_clear_is_idempotent() {
        let (blobs, _) = setup_sqlite();
        let store = LocalStore::new(blobs.clone());
        store.save(&guest_list()).await;

        store.clear().await;
        store.clear().await;
        assert!(store.load().await.is_empty());
        assert_eq!(blobs.get(GUEST_ITEMS_KEY).await.unwrap(), None);
    }

    async fn check_remote_crud(backend: Arc<dyn RowBackend>) {
        let remote = RemoteStore::new(backend.clone(), session("alice"));

        remote
            .insert_many(drafts(&[("first", false), ("second", true)], 0))
            .await
            .expect("insert_many failed");
        let inserted = remote
            .insert_one(&Item::new(ItemId::generate_local(), "third", false, 2))
            .await
            .expect("insert_one failed");
        assert!(!inserted.id.is_local());
        assert_eq!(inserted.position, 2);

        let fetched = remote.fetch_ordered().await.unwrap();
        let contents: Vec<&str> = fetched.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);

        // Reverse the order and push the whole list back
        let reversed: ItemList = fetched.into_iter().rev().collect();
        remote.upsert_many(&reversed.reindex()).await.unwrap();
        let fetched = remote.fetch_ordered().await.unwrap();
        let contents: Vec<&str> = fetched.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["third", "second", "first"]);

        remote.delete_one(&fetched[1].id).await.unwrap();
        assert_eq!(remote.fetch_ordered().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remote_crud_memory() {
        check_remote_crud(Arc::new(MemoryRowBackend::new())).await;
    }

    #[tokio::test]
    async fn test_remote_crud_sqlite() {
        let (_, rows) = setup_sqlite();
        check_remote_crud(rows).await;
    }

    async fn check_owner_isolation(backend: Arc<dyn RowBackend>) {
        let alice = RemoteStore::new(backend.clone(), session("alice"));
        let bob = RemoteStore::new(backend.clone(), session("bob"));

        alice.insert_many(drafts(&[("alice's", false)], 0)).await.unwrap();
        let alice_item = alice.fetch_ordered().await.unwrap().remove(0);
        assert!(bob.fetch_ordered().await.unwrap().is_empty());

        // Bob writing and deleting with Alice's id changes nothing for her
        let hijack = ItemList::from_items(vec![Item::new(alice_item.id.clone(), "bob's", true, 0)]);
        bob.upsert_many(&hijack).await.unwrap();
        bob.delete_one(&alice_item.id).await.unwrap();

        let after = alice.fetch_ordered().await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].content, "alice's");
        assert!(!after[0].is_completed);
    }

    #[tokio::test]
    async fn test_owner_isolation_memory() {
        check_owner_isolation(Arc::new(MemoryRowBackend::new())).await;
    }

    #[tokio::test]
    async fn test_owner_isolation_sqlite() {
        let (_, rows) = setup_sqlite();
        check_owner_isolation(rows).await;
    }

    #[tokio::test]
    async fn test_unset_positions_sort_last_by_creation() {
        let backend = Arc::new(MemoryRowBackend::new());
        let owner = OwnerId::new("alice");
        backend.seed(&owner, "legacy-1", false, None).await;
        backend.seed(&owner, "ranked", false, Some(0)).await;
        backend.seed(&owner, "legacy-2", false, None).await;

        let remote = RemoteStore::new(backend, session("alice"));
        let contents: Vec<String> = remote
            .fetch_ordered()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.content)
            .collect();
        assert_eq!(contents, vec!["ranked", "legacy-1", "legacy-2"]);
    }

    #[tokio::test]
    async fn test_sqlite_equal_positions_fall_back_to_insert_order() {
        let (_, rows) = setup_sqlite();
        let remote = RemoteStore::new(rows, session("alice"));
        remote.insert_many(drafts(&[("one", false)], 0)).await.unwrap();
        remote.insert_many(drafts(&[("two", false)], 0)).await.unwrap();

        let fetched = remote.fetch_ordered().await.unwrap();
        assert_eq!(fetched[0].content, "one");
        assert_eq!(fetched[1].content, "two");
    }

    #[tokio::test]
    async fn test_upsert_skips_local_ids() {
        let backend = Arc::new(MemoryRowBackend::new());
        let remote = RemoteStore::new(backend.clone(), session("alice"));
        let list = ItemList::from_items(vec![Item::new(ItemId::generate_local(), "pending", false, 0)]);

        remote.upsert_many(&list).await.unwrap();
        remote.delete_one(&list.as_slice()[0].id).await.unwrap();
        assert_eq!(backend.upsert_count(), 0);
        assert!(backend.rows_for(&OwnerId::new("alice")).await.is_empty());
    }

    #[tokio::test]
    async fn test_remote_errors_propagate_verbatim() {
        let backend = Arc::new(MemoryRowBackend::new());
        backend.set_fail_inserts(true);
        let remote = RemoteStore::new(backend, session("alice"));

        let err = remote
            .insert_many(drafts(&[("x", false)], 0))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to insert items");
    }
}

//! End-to-end flows over the SQLite-backed stores

use tasklist::domain::{AuthEvent, OwnerId, Session};
use tasklist::repository::GUEST_ITEMS_KEY;
use tasklist::sync::{MergeOutcome, Transition};
use tasklist::{App, AppConfig, ItemFilter};

fn config(dir: &std::path::Path) -> AppConfig {
    AppConfig {
        data_dir: dir.to_path_buf(),
        guest_key: GUEST_ITEMS_KEY.to_string(),
        sync: None,
    }
}

fn alice() -> Session {
    Session::new("token-alice", OwnerId::new("alice"))
}

fn contents(app: &App) -> Vec<String> {
    app.store()
        .items()
        .iter()
        .map(|item| item.content.clone())
        .collect()
}

#[tokio::test]
async fn test_guest_items_survive_restart_and_merge_once() {
    let dir = tempfile::tempdir().unwrap();

    {
        let app = App::open(&config(dir.path())).await.unwrap();
        assert_eq!(app.start(None).await, Transition::GuestLoaded { count: 0 });
        app.commands().submit_draft("Buy milk").unwrap();
        let rent = app.commands().submit_draft("Pay rent").unwrap();
        app.commands().toggle_item(&rent.id).unwrap();
        app.flush().await;
    }

    let app = App::open(&config(dir.path())).await.unwrap();
    assert_eq!(app.start(None).await, Transition::GuestLoaded { count: 2 });
    assert_eq!(contents(&app), vec!["Buy milk", "Pay rent"]);

    app.handle_auth_event(AuthEvent::signed_in(alice())).await;
    assert_eq!(
        app.wait_for_merge().await,
        Some(MergeOutcome::Merged { inserted: 2, total: 2 })
    );
    let state = app.store().snapshot();
    assert!(state.items.iter().all(|item| !item.id.is_local()));
    assert!(state.items.is_normalized());
    assert_eq!(state.items.completed_count(), 1);

    // Signing out leaves nothing to merge a second time
    app.handle_auth_event(AuthEvent::signed_out()).await;
    assert!(app.store().items().is_empty());
    app.handle_auth_event(AuthEvent::signed_in(alice())).await;
    assert_eq!(
        app.wait_for_merge().await,
        Some(MergeOutcome::Adopted { total: 2 })
    );
    assert_eq!(contents(&app), vec!["Buy milk", "Pay rent"]);
}

#[tokio::test]
async fn test_signed_in_edits_persist_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let app = App::open(&config(dir.path())).await.unwrap();
    app.start(Some(alice())).await;
    app.wait_for_merge().await;

    for text in ["A", "B", "C"] {
        app.commands().submit_draft(text).unwrap();
    }
    app.flush().await;
    let c = app.store().items().as_slice()[2].id.clone();
    app.commands().toggle_item(&c).unwrap();
    let a = app.store().items().as_slice()[0].id.clone();
    app.commands().delete_item(&a).unwrap();
    app.flush().await;

    app.handle_auth_event(AuthEvent::signed_out()).await;
    app.handle_auth_event(AuthEvent::signed_in(alice())).await;
    app.wait_for_merge().await;

    assert_eq!(contents(&app), vec!["B", "C"]);
    app.commands().set_filter(ItemFilter::Active);
    let visible = app.commands().visible_items();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].content, "B");
}

#[tokio::test]
async fn test_auth_feed_drives_the_app() {
    let dir = tempfile::tempdir().unwrap();
    let app = App::open(&config(dir.path())).await.unwrap();
    app.start(None).await;
    app.commands().submit_draft("Offline note").unwrap();

    let (tx, rx) = tokio::sync::mpsc::channel(8);
    let listener = app.listen(rx);
    tx.send(AuthEvent::signed_in(alice())).await.unwrap();
    drop(tx);
    listener.await.unwrap();

    assert_eq!(
        app.wait_for_merge().await,
        Some(MergeOutcome::Merged { inserted: 1, total: 1 })
    );
    assert_eq!(app.store().session(), Some(alice()));
    assert_eq!(contents(&app), vec!["Offline note"]);
    assert!(app.db().is_some());
}

#[tokio::test]
async fn test_open_reports_to_the_rolling_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    tasklist::init_logging(&config).unwrap();

    App::open(&config).await.unwrap();
    assert!(rolling_logger::recent_lines()
        .iter()
        .any(|line| line.contains("Database ready")));
}

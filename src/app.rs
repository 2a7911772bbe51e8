//! Application wiring
//!
//! Builds the stores from configuration, connects the engine, commands and
//! session controller around one [`AppStore`], and exposes the auth feed.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::commands::{DragReorderController, ItemCommands};
use crate::config::AppConfig;
use crate::domain::{AuthEvent, DomainError, DomainResult, Session};
use crate::repository::{
    init_db, BlobStore, DbState, LocalStore, RestRowBackend, RowBackend, SqliteBlobStore,
    SqliteRowBackend,
};
use crate::store::AppStore;
use crate::sync::{MergeOutcome, ReconciliationEngine, SessionController, Transition};

/// Install the rolling file logger under the data directory
pub fn init_logging(config: &AppConfig) -> DomainResult<()> {
    rolling_logger::init_logger(config.log_dir(), "Tasklist").map_err(DomainError::Config)
}

pub struct App {
    store: AppStore,
    engine: Arc<ReconciliationEngine>,
    commands: ItemCommands,
    drag: DragReorderController,
    controller: Arc<Mutex<SessionController>>,
    db: Option<DbState>,
}

impl App {
    /// Open the database under `config.data_dir` and wire everything up
    ///
    /// Signed-in lists go to the configured REST endpoint, or to the local
    /// database when no endpoint is configured.
    pub async fn open(config: &AppConfig) -> DomainResult<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| DomainError::Config(e.to_string()))?;
        let db = match init_db(&config.db_path()) {
            Ok(db) => {
                let _ = rolling_logger::info("Database ready");
                db
            }
            Err(e) => {
                let _ = rolling_logger::error(&format!("Database init failed: {}", e));
                return Err(e);
            }
        };

        let blobs: Arc<dyn BlobStore> = Arc::new(SqliteBlobStore::new(db.connection()));
        let local = LocalStore::with_key(blobs, config.guest_key.clone());
        let backend: Arc<dyn RowBackend> = match &config.sync {
            Some(sync) => {
                log::info!("Syncing signed-in lists to {}", sync.url);
                Arc::new(RestRowBackend::new(sync))
            }
            None => Arc::new(SqliteRowBackend::new(db.connection())),
        };

        let mut app = Self::with_stores(local, backend);
        app.db = Some(db);
        Ok(app)
    }

    /// Wire up around explicit stores
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_stores(local: LocalStore, backend: Arc<dyn RowBackend>) -> Self {
        let store = AppStore::new();
        let engine = Arc::new(ReconciliationEngine::new(
            store.clone(),
            Arc::new(local),
            backend,
        ));
        let controller = SessionController::new(engine.clone(), store.clone());
        Self {
            commands: ItemCommands::new(store.clone(), engine.clone()),
            drag: DragReorderController::new(store.clone(), engine.clone()),
            controller: Arc::new(Mutex::new(controller)),
            store,
            engine,
            db: None,
        }
    }

    /// Apply the startup session probe
    pub async fn start(&self, initial: Option<Session>) -> Transition {
        self.handle_auth_event(AuthEvent::initial(initial)).await
    }

    pub async fn handle_auth_event(&self, event: AuthEvent) -> Transition {
        self.controller.lock().await.handle(event).await
    }

    /// Consume auth events from `feed` in the background
    pub fn listen(&self, feed: mpsc::Receiver<AuthEvent>) -> JoinHandle<()> {
        SessionController::listen(self.controller.clone(), feed)
    }

    /// Wait for the merge started by the last sign-in
    pub async fn wait_for_merge(&self) -> Option<MergeOutcome> {
        let handle = self.controller.lock().await.take_merge()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::error!("Merge task failed: {}", e);
                None
            }
        }
    }

    /// Await every pending write
    pub async fn flush(&self) {
        self.engine.flush().await;
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    pub fn commands(&self) -> &ItemCommands {
        &self.commands
    }

    pub fn drag(&self) -> &DragReorderController {
        &self.drag
    }

    pub fn db(&self) -> Option<&DbState> {
        self.db.as_ref()
    }
}

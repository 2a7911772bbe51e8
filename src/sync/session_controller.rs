//! Session lifecycle
//!
//! Turns auth feed events into state transitions. Sign-in starts a merge,
//! sign-out cancels it and wipes every trace of the previous owner.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::cancel::SessionEpoch;
use super::reconcile::{MergeOutcome, ReconciliationEngine};
use crate::domain::{AuthEvent, AuthEventKind, OwnerId, Session};
use crate::store::{AppStore, AuthView};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    pub fn owner(&self) -> Option<&OwnerId> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(session) => Some(&session.owner_id),
        }
    }
}

/// What an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// Startup without a session; guest list loaded
    GuestLoaded { count: usize },
    SignedIn(OwnerId),
    SignedOut,
    /// Same owner, new token
    Refreshed,
    PasswordRecovery,
}

pub struct SessionController {
    state: SessionState,
    engine: Arc<ReconciliationEngine>,
    store: AppStore,
    epoch: SessionEpoch,
    merge: Option<JoinHandle<MergeOutcome>>,
}

impl SessionController {
    pub fn new(engine: Arc<ReconciliationEngine>, store: AppStore) -> Self {
        Self {
            state: SessionState::Anonymous,
            engine,
            store,
            epoch: SessionEpoch::new(),
            merge: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Apply one auth event
    pub async fn handle(&mut self, event: AuthEvent) -> Transition {
        if event.kind == AuthEventKind::PasswordRecovery {
            self.store.update(|state| state.auth_view = AuthView::ResetPassword);
            return Transition::PasswordRecovery;
        }

        let current = self.state.owner().cloned();
        match (current, event.session) {
            (None, None) if event.kind == AuthEventKind::InitialSession => {
                let guest = self.engine.load_guest().await.partition_by_completion();
                let count = guest.len();
                self.store.update(|state| state.items = guest);
                log::info!("Started as guest with {} item(s)", count);
                Transition::GuestLoaded { count }
            }
            (None, None) => Transition::Unchanged,
            (None, Some(session)) => self.sign_in(session),
            (Some(_), None) => {
                self.sign_out().await;
                Transition::SignedOut
            }
            (Some(owner), Some(session)) if owner == session.owner_id => {
                self.state = SessionState::Authenticated(session.clone());
                self.store.update(|state| state.session = Some(session));
                log::debug!("Session refreshed for {}", owner);
                Transition::Refreshed
            }
            (Some(_), Some(session)) => {
                self.sign_out().await;
                self.sign_in(session)
            }
        }
    }

    fn sign_in(&mut self, session: Session) -> Transition {
        let owner = session.owner_id.clone();
        let token = self.epoch.advance();
        self.state = SessionState::Authenticated(session.clone());
        self.store.update(|state| state.session = Some(session.clone()));
        log::info!("Signed in as {}", owner);

        let engine = self.engine.clone();
        self.merge = Some(tokio::spawn(async move {
            engine.merge_on_sign_in(session, token).await
        }));
        Transition::SignedIn(owner)
    }

    async fn sign_out(&mut self) {
        self.epoch.invalidate();
        if let SessionState::Authenticated(session) = &self.state {
            log::info!("Signed out {}", session.owner_id);
        }
        self.state = SessionState::Anonymous;
        self.store.update(|state| {
            state.items = Default::default();
            state.session = None;
            state.loading = false;
            state.data_error = None;
            state.editing = None;
            state.dragging = None;
        });
        self.engine.clear_local().await;
    }

    /// Handle of the merge started by the last sign-in, if not yet taken
    pub fn take_merge(&mut self) -> Option<JoinHandle<MergeOutcome>> {
        self.merge.take()
    }

    /// Wait for the last merge; `None` when no merge is pending
    pub async fn wait_for_merge(&mut self) -> Option<MergeOutcome> {
        let handle = self.take_merge()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::error!("Merge task failed: {}", e);
                None
            }
        }
    }

    /// Feed events from an auth channel into `controller` until it closes
    pub fn listen(controller: Arc<Mutex<Self>>, mut events: mpsc::Receiver<AuthEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let kind = event.kind;
                let transition = controller.lock().await.handle(event).await;
                log::debug!("Auth event {:?}: {:?}", kind, transition);
            }
        })
    }
}

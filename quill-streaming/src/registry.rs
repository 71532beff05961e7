// File: quill-streaming/src/registry.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use quill_common::models::{AccountId, SessionState};
use quill_common::traits::StreamTransport;

use crate::presenter::StatePresenter;

/// Shared view of one session's lifecycle state.
#[derive(Clone)]
pub struct SessionStateHandle(Arc<Mutex<SessionState>>);

impl SessionStateHandle {
    pub fn new(state: SessionState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    pub fn set(&self, state: SessionState) {
        *self.0.lock() = state;
    }

    pub fn get(&self) -> SessionState {
        *self.0.lock()
    }
}

/// One live streaming connection for one account.
pub struct StreamSession {
    account_id: AccountId,
    session_id: Uuid,
    transport: Arc<dyn StreamTransport>,
    state: SessionStateHandle,
    handle: Option<JoinHandle<()>>,
}

impl StreamSession {
    pub fn new(
        account_id: AccountId,
        transport: Arc<dyn StreamTransport>,
        state: SessionStateHandle,
    ) -> Self {
        Self {
            account_id,
            session_id: Uuid::new_v4(),
            transport,
            state,
            handle: None,
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Tells the transport to drop the connection. Signal only; the
    /// session task exits on its own schedule.
    pub fn signal_disconnect(&self) {
        self.state.set(SessionState::Disconnecting);
        self.transport.disconnect();
    }

    pub(crate) fn attach_handle(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }

    pub(crate) fn take_handle(&mut self) -> Option<JoinHandle<()>> {
        self.handle.take()
    }
}

/// Single source of truth for which sessions are running. One mutex
/// guards both the map and the indicator refresh, so "stop all, then
/// start all" and "a session removes itself" serialize against each
/// other and the indicator can never disagree with the map. The lock is
/// held only across map mutation plus refresh, never across an await.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<AccountId, StreamSession>>,
    presenter: StatePresenter,
}

impl SessionRegistry {
    pub fn new(presenter: StatePresenter) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            presenter,
        }
    }

    /// Inserts a session, returning any session it replaced so the
    /// caller can signal it. At most one session per account exists.
    pub fn insert(&self, session: StreamSession) -> Option<StreamSession> {
        let mut sessions = self.sessions.lock();
        let replaced = sessions.insert(session.account_id().clone(), session);
        self.presenter.refresh(sessions.len());
        replaced
    }

    /// Attaches the spawned task handle to an existing entry. A missing
    /// entry means the session already tore itself down; the handle is
    /// dropped and the task finishes detached.
    pub fn attach_handle(&self, account_id: &AccountId, handle: JoinHandle<()>) {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get_mut(account_id) {
            session.attach_handle(handle);
        }
    }

    /// Removes one session, matched by identity rather than account
    /// alone: a replaced session's late teardown must not evict the
    /// session that superseded it. An absent or mismatched entry is
    /// left untouched; either means the entry was already wiped or
    /// replaced.
    pub fn deregister(&self, account_id: &AccountId, session_id: Uuid) -> Option<StreamSession> {
        let mut sessions = self.sessions.lock();
        if sessions
            .get(account_id)
            .is_some_and(|s| s.session_id() == session_id)
        {
            let removed = sessions.remove(account_id);
            self.presenter.refresh(sessions.len());
            removed
        } else {
            None
        }
    }

    /// Empties the registry and hides the indicator, returning the
    /// drained sessions for the caller to signal.
    pub fn drain(&self) -> Vec<StreamSession> {
        let mut sessions = self.sessions.lock();
        let drained: Vec<StreamSession> = sessions.drain().map(|(_, s)| s).collect();
        self.presenter.refresh(0);
        drained
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn contains(&self, account_id: &AccountId) -> bool {
        self.sessions.lock().contains_key(account_id)
    }

    pub fn account_ids(&self) -> HashSet<AccountId> {
        self.sessions.lock().keys().cloned().collect()
    }

    pub fn state_of(&self, account_id: &AccountId) -> Option<SessionState> {
        self.sessions.lock().get(account_id).map(|s| s.state())
    }
}

// File: quill-streaming/src/supervisor.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use quill_common::error::Error;
use quill_common::models::{AccountId, AccountSnapshot, SessionState, StreamAccount};
use quill_common::traits::{AccountProvider, StatusStore, TransportFactory};

use crate::registry::{SessionRegistry, SessionStateHandle, StreamSession};
use crate::router::EventRouter;

/// Owns start/stop/restart policy for the whole session set.
///
/// Restart is coalescing: while one restart is in flight a newly
/// requested one only marks the pending bit and returns. The in-flight
/// pass keeps re-reading the account list while the bit is set, so a
/// request that lands mid-pass is observed before the flag is
/// released, never dropped.
pub struct StreamingSupervisor {
    accounts: Arc<dyn AccountProvider>,
    transports: Arc<dyn TransportFactory>,
    store: Arc<dyn StatusStore>,
    registry: Arc<SessionRegistry>,
    last_snapshot: Mutex<Option<AccountSnapshot>>,
    restarting: AtomicBool,
    restart_pending: AtomicBool,
}

struct RestartGuard<'a>(&'a AtomicBool);

impl<'a> RestartGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(Self(flag))
        } else {
            None
        }
    }
}

impl Drop for RestartGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl StreamingSupervisor {
    pub fn new(
        accounts: Arc<dyn AccountProvider>,
        transports: Arc<dyn TransportFactory>,
        store: Arc<dyn StatusStore>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            accounts,
            transports,
            store,
            registry,
            last_snapshot: Mutex::new(None),
            restarting: AtomicBool::new(false),
            restart_pending: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Id set of the snapshot the current session set was started from,
    /// if any restart has run yet.
    pub fn last_account_ids(&self) -> Option<HashSet<AccountId>> {
        self.last_snapshot.lock().as_ref().map(|s| s.account_ids())
    }

    /// Tears down every current session and starts one per enabled,
    /// stream-capable account in a fresh snapshot. A call that finds a
    /// restart in flight marks it pending and returns; the in-flight
    /// pass re-reads the account list and applies it when it differs
    /// from the set it just started. Signals and spawns only; never
    /// waits on network I/O.
    pub async fn restart(&self) -> Result<(), Error> {
        self.restart_pending.store(true, Ordering::SeqCst);
        let mut own_pass = true;
        loop {
            let Some(guard) = RestartGuard::acquire(&self.restarting) else {
                debug!("restart already in flight; coalescing");
                return Ok(());
            };
            while self.restart_pending.swap(false, Ordering::SeqCst) {
                let accounts = self.accounts.list_eligible_accounts().await?;
                if !own_pass && self.matches_last_snapshot(&accounts) {
                    debug!("account set unchanged after coalesced restart; nothing to apply");
                    continue;
                }
                own_pass = false;
                self.apply_snapshot(AccountSnapshot::capture(accounts));
            }
            drop(guard);
            // A request that raced the flag release still has its
            // pending bit set; pick it up instead of losing it.
            if !self.restart_pending.load(Ordering::SeqCst) {
                return Ok(());
            }
        }
    }

    fn matches_last_snapshot(&self, accounts: &[StreamAccount]) -> bool {
        let last = self.last_snapshot.lock();
        let Some(last) = last.as_ref() else {
            return false;
        };
        if last.len() != accounts.len() {
            return false;
        }
        let mut previous: Vec<&StreamAccount> = last.iter().collect();
        let mut current: Vec<&StreamAccount> = accounts.iter().collect();
        previous.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        current.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        previous == current
    }

    fn apply_snapshot(&self, snapshot: AccountSnapshot) {
        info!(accounts = snapshot.len(), "restarting streaming sessions");
        *self.last_snapshot.lock() = Some(snapshot.clone());

        self.stop_all();

        for account in snapshot.iter() {
            if !account.streaming_enabled {
                debug!(account = %account.id, "streaming disabled; skipping");
                continue;
            }
            if !account.credential_kind.supports_streaming() {
                debug!(
                    account = %account.id,
                    kind = %account.credential_kind,
                    "credential kind cannot stream; skipping"
                );
                continue;
            }
            if let Err(e) = self.start_session(account) {
                error!(
                    account = %account.id,
                    error = %e,
                    "failed to start streaming session; continuing with remaining accounts"
                );
            }
        }
    }

    /// Signals every session to disconnect, empties the registry and
    /// hides the indicator. Does not wait for session tasks to exit.
    /// Safe to call with nothing running.
    pub fn stop_all(&self) {
        let sessions = self.registry.drain();
        if sessions.is_empty() {
            return;
        }
        info!(count = sessions.len(), "disconnecting streaming sessions");
        for session in &sessions {
            session.signal_disconnect();
        }
    }

    /// `stop_all` plus a deterministic wait for every session task to
    /// finish. Used at service teardown and in tests.
    pub async fn shutdown(&self) {
        let mut sessions = self.registry.drain();
        for session in &sessions {
            session.signal_disconnect();
        }
        let handles: Vec<_> = sessions.iter_mut().filter_map(|s| s.take_handle()).collect();
        join_all(handles).await;
    }

    fn start_session(&self, account: &StreamAccount) -> Result<(), Error> {
        let transport = self.transports.create(account)?;
        let state = SessionStateHandle::new(SessionState::Connecting);
        let session = StreamSession::new(account.id.clone(), Arc::clone(&transport), state.clone());
        let session_id = session.session_id();
        info!(account = %account.id, %session_id, "starting streaming session");

        // Insert before spawning so the registry already reflects the
        // snapshot when restart() returns.
        if let Some(previous) = self.registry.insert(session) {
            previous.signal_disconnect();
        }

        let account_id = account.id.clone();
        let registry = Arc::clone(&self.registry);
        let router = EventRouter::new(account_id.clone(), Arc::clone(&self.store), state.clone());
        let handle = tokio::spawn(async move {
            match transport.connect(&router).await {
                Ok(()) => info!(account = %account_id, %session_id, "stream disconnected"),
                Err(e) => router.log_failure(&e),
            }
            state.set(SessionState::Stopped);
            registry.deregister(&account_id, session_id);
        });
        self.registry.attach_handle(&account.id, handle);
        Ok(())
    }
}

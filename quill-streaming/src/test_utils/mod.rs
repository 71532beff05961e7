// File: quill-streaming/src/test_utils/mod.rs

//! Fakes for exercising the supervisor, router and watcher without any
//! network or database I/O.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use quill_common::error::{Error, ErrorResponse, ProtocolError};
use quill_common::models::{AccountId, CredentialKind, Status, StreamAccount, StreamEvent, User};
use quill_common::traits::{
    AccountProvider, StatusStore, StreamHandler, StreamIndicator, StreamTransport,
    TransportFactory,
};

/// What a fake transport does once its scripted events are delivered.
pub enum FakeOutcome {
    /// Stay connected until `disconnect` is signalled.
    BlockUntilDisconnected,
    /// Return immediately, as if the remote side closed the stream.
    CloseStream,
    /// Fail with a protocol error carrying the given status code.
    ProtocolFailure(u16),
}

pub struct FakeTransport {
    events: Mutex<Vec<StreamEvent>>,
    outcome: FakeOutcome,
    cancel: CancellationToken,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl FakeTransport {
    /// Connects, reports `Connected`, then holds the stream open until
    /// disconnected.
    pub fn blocking() -> Arc<Self> {
        Self::scripted(
            vec![StreamEvent::Connected],
            FakeOutcome::BlockUntilDisconnected,
        )
    }

    pub fn scripted(events: Vec<StreamEvent>, outcome: FakeOutcome) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(events),
            outcome,
            cancel: CancellationToken::new(),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        })
    }

    pub fn was_disconnected(&self) -> bool {
        self.disconnects.load(Ordering::SeqCst) > 0
    }
}

#[async_trait]
impl StreamTransport for FakeTransport {
    async fn connect(&self, handler: &dyn StreamHandler) -> Result<(), Error> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let events: Vec<StreamEvent> = self.events.lock().drain(..).collect();
        for event in events {
            handler.on_event(event).await;
        }
        match &self.outcome {
            FakeOutcome::BlockUntilDisconnected => {
                self.cancel.cancelled().await;
                Ok(())
            }
            FakeOutcome::CloseStream => Ok(()),
            FakeOutcome::ProtocolFailure(status) => {
                Err(Error::Protocol(ProtocolError::new(Some(*status))))
            }
        }
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

/// Factory handing out pre-scripted transports, optionally refusing to
/// build one for chosen accounts (the malformed-credentials case).
#[derive(Default)]
pub struct FakeTransportFactory {
    scripted: Mutex<HashMap<AccountId, Arc<FakeTransport>>>,
    failing: Mutex<HashSet<AccountId>>,
    created: Mutex<Vec<(AccountId, Arc<FakeTransport>)>>,
}

impl FakeTransportFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Uses `transport` for the next session started for `account`.
    pub fn script(&self, account: &AccountId, transport: Arc<FakeTransport>) {
        self.scripted.lock().insert(account.clone(), transport);
    }

    pub fn fail_for(&self, account: &AccountId) {
        self.failing.lock().insert(account.clone());
    }

    /// How many transports have been built for `account` so far.
    pub fn created_count(&self, account: &AccountId) -> usize {
        self.created.lock().iter().filter(|(id, _)| id == account).count()
    }

    /// The most recently built transport for `account`.
    pub fn transport_for(&self, account: &AccountId) -> Option<Arc<FakeTransport>> {
        self.created
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| id == account)
            .map(|(_, t)| Arc::clone(t))
    }
}

impl TransportFactory for FakeTransportFactory {
    fn create(&self, account: &StreamAccount) -> Result<Arc<dyn StreamTransport>, Error> {
        if self.failing.lock().contains(&account.id) {
            return Err(Error::InvalidCredentialType(account.id.to_string()));
        }
        let transport = self
            .scripted
            .lock()
            .remove(&account.id)
            .unwrap_or_else(FakeTransport::blocking);
        self.created
            .lock()
            .push((account.id.clone(), Arc::clone(&transport)));
        Ok(transport)
    }
}

/// In-memory account provider whose account list can be swapped to
/// simulate account-manager changes.
#[derive(Default)]
pub struct FakeAccountProvider {
    accounts: Mutex<Vec<StreamAccount>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeAccountProvider {
    pub fn new(accounts: Vec<StreamAccount>) -> Arc<Self> {
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            delay: Mutex::new(None),
        })
    }

    pub fn set_accounts(&self, accounts: Vec<StreamAccount>) {
        *self.accounts.lock() = accounts;
    }

    /// Slows down listing so a test can hold a restart in flight.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

#[async_trait]
impl AccountProvider for FakeAccountProvider {
    async fn list_eligible_accounts(&self) -> Result<Vec<StreamAccount>, Error> {
        // Captured at call entry; a change made while the call is slow
        // is only visible to the next call.
        let accounts = self.accounts.lock().clone();
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(accounts)
    }
}

/// Indicator recording show/hide calls and its current visibility.
#[derive(Default)]
pub struct RecordingIndicator {
    pub shows: AtomicUsize,
    pub hides: AtomicUsize,
    visible: Mutex<bool>,
}

impl RecordingIndicator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.lock()
    }
}

impl StreamIndicator for RecordingIndicator {
    fn show(&self, _title: &str, _body: &str) {
        self.shows.fetch_add(1, Ordering::SeqCst);
        *self.visible.lock() = true;
    }

    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
        *self.visible.lock() = false;
    }
}

/// Store recording every call; deletions can be made to fail.
#[derive(Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<String>>,
    fail_deletes: Mutex<bool>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_deletes(&self) {
        *self.fail_deletes.lock() = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl StatusStore for RecordingStore {
    async fn delete_status(&self, status_id: &str) -> Result<u64, Error> {
        self.record(format!("delete_status:{status_id}"));
        if *self.fail_deletes.lock() {
            return Err(Error::Platform("store unavailable".into()));
        }
        Ok(0)
    }

    async fn delete_mentions_of(&self, status_id: &str) -> Result<u64, Error> {
        self.record(format!("delete_mentions_of:{status_id}"));
        if *self.fail_deletes.lock() {
            return Err(Error::Platform("store unavailable".into()));
        }
        Ok(0)
    }

    async fn delete_message(&self, message_id: &str) -> Result<u64, Error> {
        self.record(format!("delete_message:{message_id}"));
        Ok(0)
    }

    async fn scrub_geo(&self, user_id: &str, up_to_sort_id: i64) -> Result<u64, Error> {
        self.record(format!("scrub_geo:{user_id}:{up_to_sort_id}"));
        Ok(0)
    }
}

/// Error-response stub for exercising the bounded body read.
pub struct FakeErrorResponse {
    pub body: Result<String, String>,
}

impl ErrorResponse for FakeErrorResponse {
    fn read_body(&self, limit: usize) -> io::Result<String> {
        match &self.body {
            Ok(body) => {
                let mut body = body.clone();
                body.truncate(limit);
                Ok(body)
            }
            Err(msg) => Err(io::Error::other(msg.clone())),
        }
    }
}

pub fn account(id: &str, kind: CredentialKind, enabled: bool) -> StreamAccount {
    StreamAccount::new(AccountId::from(id), id, kind, enabled)
}

pub fn status(id: &str, user_id: &str, sort_id: i64, location: Option<&str>) -> Status {
    Status {
        id: id.to_string(),
        user: User {
            id: user_id.to_string(),
            screen_name: user_id.to_string(),
        },
        sort_id,
        text: format!("status {id}"),
        location: location.map(str::to_string),
    }
}

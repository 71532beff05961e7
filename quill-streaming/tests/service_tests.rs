// tests/service_tests.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_test::assert_ok;
use tokio::time::{sleep, timeout};

use quill_common::models::{AccountId, CredentialKind};
use quill_common::traits::{AccountProvider, StreamIndicator};
use quill_streaming::StreamingService;
use quill_streaming::test_utils::{
    account, FakeAccountProvider, FakeTransportFactory, RecordingIndicator, RecordingStore,
};
use quill_streaming::watcher::AccountsChanged;

fn ids(ids: &[&str]) -> HashSet<AccountId> {
    ids.iter().map(|s| AccountId::from(*s)).collect()
}

async fn wait_until(what: &str, predicate: impl Fn() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !predicate() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn service_lifecycle_brings_sessions_up_and_down() {
    quill_streaming::logging::init();
    let provider = FakeAccountProvider::new(vec![
        account("a@example.com", CredentialKind::OAuth, true),
        account("b@example.com", CredentialKind::OAuth, true),
    ]);
    let factory = FakeTransportFactory::new();
    let indicator = RecordingIndicator::new();
    let store = RecordingStore::new();

    let mut service = StreamingService::new(
        Arc::clone(&provider) as Arc<dyn AccountProvider>,
        factory,
        store,
        Arc::clone(&indicator) as Arc<dyn StreamIndicator>,
    );

    let (tx, rx) = mpsc::channel(4);
    tokio_test::assert_ok!(service.start(rx).await);

    let registry = Arc::clone(service.supervisor().registry());
    assert_eq!(
        registry.account_ids(),
        ids(&["a@example.com", "b@example.com"])
    );
    assert!(indicator.is_visible());

    // An account change while the service runs is reconciled.
    provider.set_accounts(vec![account("a@example.com", CredentialKind::OAuth, true)]);
    tx.send(AccountsChanged).await.unwrap();
    wait_until("watcher to reconcile", || {
        registry.account_ids() == ids(&["a@example.com"])
    })
    .await;

    service.stop().await;
    assert!(registry.is_empty());
    assert!(!indicator.is_visible());

    // The watcher is gone; nobody is listening for notifications.
    assert!(tx.send(AccountsChanged).await.is_err());
}

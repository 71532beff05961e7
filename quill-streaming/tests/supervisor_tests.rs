// tests/supervisor_tests.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use quill_common::models::{AccountId, CredentialKind, StreamAccount, StreamEvent};
use quill_common::traits::{AccountProvider, StreamIndicator, TransportFactory};
use quill_streaming::presenter::StatePresenter;
use quill_streaming::registry::SessionRegistry;
use quill_streaming::supervisor::StreamingSupervisor;
use quill_streaming::test_utils::{
    account, FakeAccountProvider, FakeOutcome, FakeTransport, FakeTransportFactory,
    RecordingIndicator, RecordingStore,
};

struct Harness {
    provider: Arc<FakeAccountProvider>,
    factory: Arc<FakeTransportFactory>,
    indicator: Arc<RecordingIndicator>,
    registry: Arc<SessionRegistry>,
    supervisor: Arc<StreamingSupervisor>,
}

fn harness(accounts: Vec<StreamAccount>) -> Harness {
    quill_streaming::logging::init();
    let provider = FakeAccountProvider::new(accounts);
    let factory = FakeTransportFactory::new();
    let indicator = RecordingIndicator::new();
    let store = RecordingStore::new();
    let registry = Arc::new(SessionRegistry::new(StatePresenter::new(
        Arc::clone(&indicator) as Arc<dyn StreamIndicator>,
    )));
    let supervisor = Arc::new(StreamingSupervisor::new(
        Arc::clone(&provider) as Arc<dyn AccountProvider>,
        Arc::clone(&factory) as Arc<dyn TransportFactory>,
        store,
        Arc::clone(&registry),
    ));
    Harness {
        provider,
        factory,
        indicator,
        registry,
        supervisor,
    }
}

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
async fn restart_starts_only_enabled_supported_accounts() {
    let h = harness(vec![
        account("a@example.com", CredentialKind::OAuth, true),
        account("b@example.com", CredentialKind::OAuth, false),
        account("c@example.com", CredentialKind::Basic, true),
    ]);

    h.supervisor.restart().await.unwrap();

    assert_eq!(h.registry.account_ids(), ids(&["a@example.com"]));
    assert!(h.indicator.is_visible());

    h.supervisor.shutdown().await;
}

#[tokio::test]
async fn stop_all_twice_leaves_registry_empty_and_indicator_hidden() {
    let h = harness(vec![account("a@example.com", CredentialKind::OAuth, true)]);
    h.supervisor.restart().await.unwrap();
    assert!(h.indicator.is_visible());

    h.supervisor.stop_all();
    assert!(h.registry.is_empty());
    assert!(!h.indicator.is_visible());

    h.supervisor.stop_all();
    assert!(h.registry.is_empty());
    assert!(!h.indicator.is_visible());

    h.supervisor.shutdown().await;
}

#[tokio::test]
async fn account_set_change_stops_removed_and_starts_added() {
    let h = harness(vec![
        account("a@example.com", CredentialKind::OAuth, true),
        account("b@example.com", CredentialKind::OAuth, true),
    ]);
    h.supervisor.restart().await.unwrap();
    assert_eq!(
        h.registry.account_ids(),
        ids(&["a@example.com", "b@example.com"])
    );

    let b_transport = h.factory.transport_for(&AccountId::from("b@example.com")).unwrap();

    h.provider.set_accounts(vec![
        account("a@example.com", CredentialKind::OAuth, true),
        account("c@example.com", CredentialKind::OAuth, true),
    ]);
    h.supervisor.restart().await.unwrap();

    assert_eq!(
        h.registry.account_ids(),
        ids(&["a@example.com", "c@example.com"])
    );
    assert!(b_transport.was_disconnected());
    // A was stopped and started fresh, not reused.
    assert_eq!(h.factory.created_count(&AccountId::from("a@example.com")), 2);
    assert_eq!(h.factory.created_count(&AccountId::from("c@example.com")), 1);

    h.supervisor.shutdown().await;
}

#[tokio::test]
async fn protocol_error_terminates_only_that_session() {
    let h = harness(vec![
        account("a@example.com", CredentialKind::OAuth, true),
        account("b@example.com", CredentialKind::OAuth, true),
    ]);
    h.factory.script(
        &AccountId::from("a@example.com"),
        FakeTransport::scripted(vec![StreamEvent::Connected], FakeOutcome::ProtocolFailure(420)),
    );

    h.supervisor.restart().await.unwrap();

    wait_until("failed session to deregister", || {
        h.registry.account_ids() == ids(&["b@example.com"])
    })
    .await;
    assert!(h.indicator.is_visible());

    h.supervisor.shutdown().await;
    assert!(!h.indicator.is_visible());
}

#[tokio::test]
async fn transport_construction_failure_skips_only_that_account() {
    let h = harness(vec![
        account("a@example.com", CredentialKind::OAuth, true),
        account("b@example.com", CredentialKind::OAuth, true),
    ]);
    h.factory.fail_for(&AccountId::from("a@example.com"));

    h.supervisor.restart().await.unwrap();

    assert_eq!(h.registry.account_ids(), ids(&["b@example.com"]));

    h.supervisor.shutdown().await;
}

#[tokio::test]
async fn concurrent_restarts_coalesce_without_duplicate_sessions() {
    let h = harness(vec![
        account("a@example.com", CredentialKind::OAuth, true),
        account("b@example.com", CredentialKind::OAuth, true),
    ]);
    h.provider.set_delay(Duration::from_millis(50));

    let (first, second) = tokio::join!(h.supervisor.restart(), h.supervisor.restart());
    first.unwrap();
    second.unwrap();

    assert_eq!(
        h.registry.account_ids(),
        ids(&["a@example.com", "b@example.com"])
    );
    // The coalesced request built nothing.
    assert_eq!(h.factory.created_count(&AccountId::from("a@example.com")), 1);
    assert_eq!(h.factory.created_count(&AccountId::from("b@example.com")), 1);

    h.supervisor.shutdown().await;
}

#[tokio::test]
async fn session_replaced_by_restart_stays_registered_after_old_teardown() {
    let h = harness(vec![account("a@example.com", CredentialKind::OAuth, true)]);
    let a = AccountId::from("a@example.com");

    h.supervisor.restart().await.unwrap();
    let original = h.factory.transport_for(&a).unwrap();

    h.supervisor.restart().await.unwrap();
    let replacement = h.factory.transport_for(&a).unwrap();
    assert_eq!(h.factory.created_count(&a), 2);
    assert!(original.was_disconnected());

    // Give the replaced session's task time to run its teardown path.
    sleep(Duration::from_millis(100)).await;

    assert_eq!(h.registry.account_ids(), ids(&["a@example.com"]));
    assert!(h.indicator.is_visible());
    assert!(!replacement.was_disconnected());

    h.supervisor.shutdown().await;
    assert!(replacement.was_disconnected());
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn account_change_during_inflight_restart_is_applied() {
    let h = harness(vec![account("a@example.com", CredentialKind::OAuth, true)]);
    h.provider.set_delay(Duration::from_millis(50));

    let coalesced = async {
        // Let the first restart read its account list, then change it.
        sleep(Duration::from_millis(10)).await;
        h.provider.set_accounts(vec![
            account("a@example.com", CredentialKind::OAuth, true),
            account("b@example.com", CredentialKind::OAuth, true),
        ]);
        h.supervisor.restart().await
    };
    let (first, second) = tokio::join!(h.supervisor.restart(), coalesced);
    first.unwrap();
    second.unwrap();

    assert_eq!(
        h.registry.account_ids(),
        ids(&["a@example.com", "b@example.com"])
    );
    assert_eq!(h.factory.created_count(&AccountId::from("b@example.com")), 1);

    h.supervisor.shutdown().await;
}

#[tokio::test]
async fn naturally_closing_session_deregisters_cleanly_during_stop_all() {
    let h = harness(vec![account("a@example.com", CredentialKind::OAuth, true)]);
    h.factory.script(
        &AccountId::from("a@example.com"),
        FakeTransport::scripted(vec![StreamEvent::Connected], FakeOutcome::CloseStream),
    );

    h.supervisor.restart().await.unwrap();
    h.supervisor.stop_all();

    wait_until("registry to settle empty", || h.registry.is_empty()).await;
    assert!(!h.indicator.is_visible());

    h.supervisor.shutdown().await;
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn stopped_session_is_not_retried_until_next_restart() {
    let h = harness(vec![account("a@example.com", CredentialKind::OAuth, true)]);
    h.factory.script(
        &AccountId::from("a@example.com"),
        FakeTransport::scripted(vec![StreamEvent::Connected], FakeOutcome::CloseStream),
    );

    h.supervisor.restart().await.unwrap();
    wait_until("session to end", || h.registry.is_empty()).await;

    sleep(Duration::from_millis(50)).await;
    assert!(h.registry.is_empty());
    assert_eq!(h.factory.created_count(&AccountId::from("a@example.com")), 1);
    assert!(!h.indicator.is_visible());

    h.supervisor.restart().await.unwrap();
    assert_eq!(h.factory.created_count(&AccountId::from("a@example.com")), 2);

    h.supervisor.shutdown().await;
}

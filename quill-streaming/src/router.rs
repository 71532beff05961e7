// File: quill-streaming/src/router.rs

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use quill_common::error::{Error, MAX_ERROR_BODY_BYTES};
use quill_common::models::{AccountId, SessionState, StreamEvent};
use quill_common::traits::{StatusStore, StreamHandler};

use crate::registry::SessionStateHandle;

/// Per-session translation of inbound stream events into store
/// mutations or log lines. No state is shared across sessions except
/// the store itself, which must be safe for concurrent writers.
pub struct EventRouter {
    account_id: AccountId,
    store: Arc<dyn StatusStore>,
    state: SessionStateHandle,
}

impl EventRouter {
    pub fn new(
        account_id: AccountId,
        store: Arc<dyn StatusStore>,
        state: SessionStateHandle,
    ) -> Self {
        Self {
            account_id,
            store,
            state,
        }
    }

    async fn delete_status(&self, status_id: &str) {
        match self.store.delete_status(status_id).await {
            Ok(n) => {
                debug!(account = %self.account_id, status_id, deleted = n, "status deletion applied")
            }
            Err(e) => {
                warn!(account = %self.account_id, status_id, error = %e, "status deletion failed")
            }
        }
        if let Err(e) = self.store.delete_mentions_of(status_id).await {
            warn!(account = %self.account_id, status_id, error = %e, "mention cleanup failed");
        }
    }

    async fn delete_message(&self, message_id: &str) {
        if let Err(e) = self.store.delete_message(message_id).await {
            warn!(account = %self.account_id, message_id, error = %e, "message deletion failed");
        }
    }

    async fn scrub_geo(&self, user_id: &str, up_to_sort_id: i64) {
        match self.store.scrub_geo(user_id, up_to_sort_id).await {
            Ok(n) => {
                debug!(account = %self.account_id, user_id, up_to_sort_id, scrubbed = n, "geo scrub applied")
            }
            Err(e) => warn!(account = %self.account_id, user_id, error = %e, "geo scrub failed"),
        }
    }

    /// Logs a session's terminal failure. Protocol errors get their
    /// status code and, when a response is attached, a bounded read of
    /// the body; a failed body read is itself logged and swallowed.
    pub fn log_failure(&self, err: &Error) {
        match err {
            Error::Protocol(p) => {
                warn!(account = %self.account_id, status_code = ?p.status_code, "stream ended with protocol error");
                if let Some(response) = &p.response {
                    match response.read_body(MAX_ERROR_BODY_BYTES) {
                        Ok(body) => warn!(account = %self.account_id, %body, "error response body"),
                        Err(e) => {
                            warn!(account = %self.account_id, error = %e, "could not read error response body")
                        }
                    }
                }
            }
            other => warn!(account = %self.account_id, error = %other, "stream ended with error"),
        }
    }
}

#[async_trait]
impl StreamHandler for EventRouter {
    async fn on_event(&self, event: StreamEvent) {
        match event {
            StreamEvent::Connected => {
                self.state.set(SessionState::Connected);
                debug!(account = %self.account_id, "stream connected");
            }
            StreamEvent::Status(status) => {
                // Full ingestion belongs to the refresh pipeline.
                trace!(account = %self.account_id, status_id = %status.id, "status received");
            }
            StreamEvent::StatusDeleted(deletion) => self.delete_status(&deletion.id).await,
            StreamEvent::DirectMessageDeleted(deletion) => self.delete_message(&deletion.id).await,
            StreamEvent::ScrubGeo {
                user_id,
                up_to_sort_id,
            } => self.scrub_geo(&user_id, up_to_sort_id).await,
            StreamEvent::Blocked { source, target } => {
                debug!(account = %self.account_id, "{} blocked {}", source.screen_name, target.screen_name);
            }
            StreamEvent::Unblocked { source, target } => {
                debug!(account = %self.account_id, "{} unblocked {}", source.screen_name, target.screen_name);
            }
            StreamEvent::Followed { source, target } => {
                debug!(account = %self.account_id, "{} followed {}", source.screen_name, target.screen_name);
            }
            StreamEvent::Favorited {
                source,
                target,
                status,
            } => {
                debug!(
                    account = %self.account_id,
                    "{} favorited {}'s status: {}",
                    source.screen_name, target.screen_name, status.text
                );
            }
            StreamEvent::Unfavorited {
                source,
                target,
                status,
            } => {
                debug!(
                    account = %self.account_id,
                    "{} unfavorited {}'s status: {}",
                    source.screen_name, target.screen_name, status.text
                );
            }
            StreamEvent::ListChanged {
                owner,
                list_name,
                change,
            } => {
                debug!(account = %self.account_id, owner = %owner.screen_name, list = %list_name, ?change, "list changed");
            }
            StreamEvent::ProfileUpdated { user } => {
                debug!(account = %self.account_id, user = %user.screen_name, "profile updated");
            }
            StreamEvent::StallWarning { message } => {
                warn!(account = %self.account_id, %message, "stall warning");
            }
            other => trace!(account = %self.account_id, ?other, "ignoring stream event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeErrorResponse, RecordingStore};
    use quill_common::error::ProtocolError;
    use quill_common::models::DeletionEvent;

    fn router(store: Arc<RecordingStore>) -> EventRouter {
        EventRouter::new(
            AccountId::from("a@example.com"),
            store,
            SessionStateHandle::new(SessionState::Connecting),
        )
    }

    fn deletion(id: &str) -> DeletionEvent {
        DeletionEvent {
            id: id.to_string(),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn status_deletion_hits_statuses_and_mentions() {
        let store = RecordingStore::new();
        let router = router(Arc::clone(&store));

        router
            .on_event(StreamEvent::StatusDeleted(deletion("123")))
            .await;

        assert_eq!(
            store.calls(),
            vec!["delete_status:123", "delete_mentions_of:123"]
        );
    }

    #[tokio::test]
    async fn store_failure_does_not_abort_later_events() {
        let store = RecordingStore::new();
        store.fail_deletes();
        let router = router(Arc::clone(&store));

        router
            .on_event(StreamEvent::StatusDeleted(deletion("1")))
            .await;
        router
            .on_event(StreamEvent::DirectMessageDeleted(deletion("2")))
            .await;
        router
            .on_event(StreamEvent::ScrubGeo {
                user_id: "u1".into(),
                up_to_sort_id: 10,
            })
            .await;

        assert_eq!(
            store.calls(),
            vec![
                "delete_status:1",
                "delete_mentions_of:1",
                "delete_message:2",
                "scrub_geo:u1:10"
            ]
        );
    }

    #[tokio::test]
    async fn connected_event_marks_session_connected() {
        let store = RecordingStore::new();
        let state = SessionStateHandle::new(SessionState::Connecting);
        let router = EventRouter::new(AccountId::from("a@example.com"), store, state.clone());

        router.on_event(StreamEvent::Connected).await;

        assert_eq!(state.get(), SessionState::Connected);
    }

    #[tokio::test]
    async fn status_ingestion_is_consumed_without_store_calls() {
        let store = RecordingStore::new();
        let router = router(Arc::clone(&store));

        router
            .on_event(StreamEvent::Status(Box::new(crate::test_utils::status(
                "s1", "u1", 1, None,
            ))))
            .await;
        router.on_event(StreamEvent::FriendList(vec![])).await;
        router
            .on_event(StreamEvent::TrackLimitation {
                limited_statuses: 3,
            })
            .await;

        assert!(store.calls().is_empty());
    }

    #[test]
    fn failure_logging_swallows_body_read_errors() {
        let store = RecordingStore::new();
        let router = router(store);

        router.log_failure(&Error::Protocol(ProtocolError::with_response(
            Some(420),
            Box::new(FakeErrorResponse {
                body: Err("connection reset".into()),
            }),
        )));
        router.log_failure(&Error::Protocol(ProtocolError::with_response(
            Some(503),
            Box::new(FakeErrorResponse {
                body: Ok("over capacity".into()),
            }),
        )));
        router.log_failure(&Error::Platform("socket closed".into()));
    }
}

// File: quill-common/src/traits/collaborators.rs

use async_trait::async_trait;

use crate::error::Error;
use crate::models::StreamAccount;

/// Yields the accounts currently eligible for streaming (token-based
/// credentials) together with each account's streaming preference.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    async fn list_eligible_accounts(&self) -> Result<Vec<StreamAccount>, Error>;
}

/// Local record store the event router mutates. Every operation returns
/// the affected-row count; matching zero rows is not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Removes a status from the statuses partition.
    async fn delete_status(&self, status_id: &str) -> Result<u64, Error>;

    /// Removes mirrored mention records referencing a status.
    async fn delete_mentions_of(&self, status_id: &str) -> Result<u64, Error>;

    /// Removes a direct message from the messages partition.
    async fn delete_message(&self, message_id: &str) -> Result<u64, Error>;

    /// Clears the stored location on `user_id`'s statuses whose sort id
    /// is at or above `up_to_sort_id`.
    async fn scrub_geo(&self, user_id: &str, up_to_sort_id: i64) -> Result<u64, Error>;
}

/// Persistent "streaming is running" indicator. Both calls are
/// idempotent; re-showing updates content without duplicating.
#[cfg_attr(test, mockall::automock)]
pub trait StreamIndicator: Send + Sync {
    fn show(&self, title: &str, body: &str);

    fn hide(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_contract_tolerates_zero_row_matches() {
        let mut store = MockStatusStore::new();
        store.expect_delete_status().returning(|_| Ok(0));
        store.expect_delete_mentions_of().returning(|_| Ok(0));

        assert_eq!(store.delete_status("123").await.unwrap(), 0);
        assert_eq!(store.delete_mentions_of("123").await.unwrap(), 0);
    }
}

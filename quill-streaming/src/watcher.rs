// File: quill-streaming/src/watcher.rs

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use quill_common::models::AccountId;
use quill_common::traits::AccountProvider;

use crate::supervisor::StreamingSupervisor;

/// Notification that the system's account set may have changed. The
/// signal carries no payload, mirroring what account managers deliver.
#[derive(Debug, Clone, Copy)]
pub struct AccountsChanged;

/// Listens for account-change notifications and restarts the supervisor
/// whenever the eligible-account id set actually differs from the one
/// the current sessions were started from.
pub struct AccountWatcher;

impl AccountWatcher {
    pub fn spawn(
        supervisor: Arc<StreamingSupervisor>,
        accounts: Arc<dyn AccountProvider>,
        mut notifications: mpsc::Receiver<AccountsChanged>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("account watcher shutting down");
                        break;
                    }
                    notification = notifications.recv() => {
                        match notification {
                            Some(AccountsChanged) => {
                                Self::check(&supervisor, accounts.as_ref()).await;
                            }
                            None => {
                                debug!("account notification channel closed");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }

    async fn check(supervisor: &StreamingSupervisor, accounts: &dyn AccountProvider) {
        let current: HashSet<AccountId> = match accounts.list_eligible_accounts().await {
            Ok(list) => list.into_iter().map(|a| a.id).collect(),
            Err(e) => {
                warn!(error = %e, "could not list accounts after change notification");
                return;
            }
        };
        if supervisor.last_account_ids().as_ref() == Some(&current) {
            debug!("account set unchanged; not restarting");
            return;
        }
        info!(accounts = current.len(), "account set changed; restarting streams");
        if let Err(e) = supervisor.restart().await {
            warn!(error = %e, "restart after account change failed");
        }
    }
}

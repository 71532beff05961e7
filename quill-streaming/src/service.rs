// File: quill-streaming/src/service.rs

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use quill_common::error::Error;
use quill_common::traits::{AccountProvider, StatusStore, StreamIndicator, TransportFactory};

use crate::presenter::StatePresenter;
use crate::registry::SessionRegistry;
use crate::supervisor::StreamingSupervisor;
use crate::watcher::{AccountWatcher, AccountsChanged};

/// Ties the supervisor and the account watcher to the lifetime of the
/// host component. `start`/`stop` are the create/destroy boundary.
pub struct StreamingService {
    supervisor: Arc<StreamingSupervisor>,
    accounts: Arc<dyn AccountProvider>,
    watcher: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl StreamingService {
    pub fn new(
        accounts: Arc<dyn AccountProvider>,
        transports: Arc<dyn TransportFactory>,
        store: Arc<dyn StatusStore>,
        indicator: Arc<dyn StreamIndicator>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new(StatePresenter::new(indicator)));
        let supervisor = Arc::new(StreamingSupervisor::new(
            Arc::clone(&accounts),
            transports,
            store,
            registry,
        ));
        Self {
            supervisor,
            accounts,
            watcher: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn supervisor(&self) -> &Arc<StreamingSupervisor> {
        &self.supervisor
    }

    /// Brings up all sessions and starts watching for account changes.
    pub async fn start(
        &mut self,
        notifications: mpsc::Receiver<AccountsChanged>,
    ) -> Result<(), Error> {
        info!("stream service started");
        self.supervisor.restart().await?;
        self.watcher = Some(AccountWatcher::spawn(
            Arc::clone(&self.supervisor),
            Arc::clone(&self.accounts),
            notifications,
            self.shutdown.clone(),
        ));
        Ok(())
    }

    /// Stops the watcher, then tears down every session and waits for
    /// the session tasks to exit.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(watcher) = self.watcher.take() {
            if let Err(e) = watcher.await {
                warn!(error = %e, "account watcher ended abnormally");
            }
        }
        self.supervisor.shutdown().await;
        info!("stream service stopped");
    }
}

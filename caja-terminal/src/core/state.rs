//! Shared terminal state: the explicitly constructed handles every
//! subsystem works against. Built once at startup and injected — there is
//! no ambient global store.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::cloud::{CloudError, CloudStore, HttpCloudStore};
use crate::core::Config;
use crate::store::{LocalStore, StoreError};

#[derive(Debug, Error)]
pub enum InitError {
    /// The local store could not be opened or migrated. Fatal: running on
    /// a partial schema would corrupt financial state.
    #[error("Local store unusable: {0}")]
    Store(#[from] StoreError),

    #[error("Cloud client setup failed: {0}")]
    Cloud(#[from] CloudError),

    #[error("Work directory unusable: {0}")]
    WorkDir(#[from] std::io::Error),
}

struct StateInner {
    config: Config,
    store: LocalStore,
    cloud: Arc<dyn CloudStore>,
    /// Connectivity flag. Sync treats offline as a silent no-op; flipping
    /// back online is itself a sync trigger.
    online: watch::Sender<bool>,
}

/// Cheap-to-clone handle shared by repositories and workers.
#[derive(Clone)]
pub struct TerminalState {
    inner: Arc<StateInner>,
}

impl TerminalState {
    /// Open the store (running migrations), build the cloud client, and
    /// assemble the state. Errors here abort startup.
    pub fn initialize(config: &Config) -> Result<Self, InitError> {
        std::fs::create_dir_all(&config.work_dir)?;
        let store = LocalStore::open(config.db_path())?;
        tracing::info!(path = %config.db_path().display(), "local store ready");

        let cloud: Arc<dyn CloudStore> = Arc::new(HttpCloudStore::new(
            &config.cloud_url,
            &config.company_id,
            &config.api_token,
        )?);

        Ok(Self::with_parts(config.clone(), store, cloud))
    }

    /// Assemble from pre-built parts. Tests inject an in-memory store and
    /// cloud through here.
    pub fn with_parts(config: Config, store: LocalStore, cloud: Arc<dyn CloudStore>) -> Self {
        let (online, _) = watch::channel(false);
        Self {
            inner: Arc::new(StateInner {
                config,
                store,
                cloud,
                online,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    pub fn cloud(&self) -> Arc<dyn CloudStore> {
        self.inner.cloud.clone()
    }

    pub fn is_online(&self) -> bool {
        *self.inner.online.borrow()
    }

    /// Flip the connectivity flag; watchers are only woken on changes.
    pub fn set_online(&self, online: bool) {
        self.inner.online.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
    }

    pub fn online_watch(&self) -> watch::Receiver<bool> {
        self.inner.online.subscribe()
    }
}

// ── Runtime ──
//
// The single owner of every cache and service in a process. Built once
// at startup and passed by reference wherever entities are needed.

use std::sync::Arc;

use tracing::info;

use crate::account::{
    AccountBackend, AccountContext, AccountManager, AccountManagerBackend,
};
use crate::backend::DefaultBackend;
use crate::config::RuntimeConfig;
use crate::error::DomainError;
use crate::join::JoinGroup;
use crate::patient::{
    DeviceCache, Patient, PatientBackend, PatientContext, PatientDirectory,
    PatientDirectoryBackend,
};

/// Backend delegates for every service and entity kind.
#[derive(Clone)]
pub struct Backends {
    pub patient: Arc<dyn PatientBackend>,
    pub directory: Arc<dyn PatientDirectoryBackend>,
    pub account: Arc<dyn AccountBackend>,
    pub account_manager: Arc<dyn AccountManagerBackend>,
}

impl Backends {
    /// One object serving every role.
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: PatientBackend
            + PatientDirectoryBackend
            + AccountBackend
            + AccountManagerBackend
            + 'static,
    {
        Self {
            patient: backend.clone(),
            directory: backend.clone(),
            account: backend.clone(),
            account_manager: backend,
        }
    }

    /// Every role served by [`DefaultBackend`].
    pub fn unsupported() -> Self {
        Self::shared(Arc::new(DefaultBackend))
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::unsupported()
    }
}

pub struct Runtime {
    config: RuntimeConfig,
    devices: DeviceCache,
    directory: PatientDirectory,
    accounts: AccountManager,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, backends: Backends) -> Self {
        let devices = DeviceCache::new(());
        let directory = PatientDirectory::new(
            backends.directory,
            PatientContext::new(backends.patient, devices.clone()),
        );
        let accounts = AccountManager::new(
            backends.account_manager,
            AccountContext::new(backends.account),
        );

        Self {
            config,
            devices,
            directory,
            accounts,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn directory(&self) -> &PatientDirectory {
        &self.directory
    }

    pub fn accounts(&self) -> &AccountManager {
        &self.accounts
    }

    pub fn devices(&self) -> &DeviceCache {
        &self.devices
    }

    /// Bootstrap the directory and the account manager concurrently.
    pub async fn initialize(&self) -> Result<(), DomainError> {
        let group = JoinGroup::new();
        let directory = group.incr();
        let accounts = group.incr();

        tokio::join!(
            async { directory.decr(self.directory.initialize().await) },
            async { accounts.decr(self.accounts.initialize().await) },
        );
        group.close().await?;

        info!(
            reachable = self.directory.is_reachable(),
            accounts = self.accounts.len(),
            "runtime initialized"
        );
        Ok(())
    }

    /// Patient name in the configured display order.
    pub fn display_name(&self, patient: &Patient) -> String {
        patient.formatted_name(self.config.name_format)
    }
}

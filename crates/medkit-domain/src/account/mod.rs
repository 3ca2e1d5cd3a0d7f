// ── Account entity ──

pub mod manager;

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::{CacheLease, Cacheable, EntityCache};
use crate::error::DomainError;
use crate::model::{AccountProfile, Identity};
use crate::observer::ObserverRegistry;

pub use manager::{AccountManager, AccountManagerBackend, AccountManagerObserver, AccountSnapshot};

#[async_trait]
pub trait AccountBackend: Send + Sync {
    async fn update_description(
        &self,
        account: &Account,
        description: Option<&str>,
    ) -> Result<(), DomainError>;
}

pub trait AccountObserver: Send + Sync {
    fn did_update_description(&self, _account: &Account) {}
}

pub struct AccountContext {
    pub backend: Arc<dyn AccountBackend>,
}

impl AccountContext {
    pub fn new(backend: Arc<dyn AccountBackend>) -> Self {
        Self { backend }
    }
}

pub type AccountCache = EntityCache<Account>;

/// A user, device, organization or service account.
pub struct Account {
    identity: Identity,
    description: ArcSwap<Option<String>>,
    backend: Arc<dyn AccountBackend>,
    observers: ObserverRegistry<dyn AccountObserver>,
    update_lock: tokio::sync::Mutex<()>,
    _lease: CacheLease<Account>,
}

impl Account {
    pub fn detached(profile: AccountProfile, context: &AccountContext) -> Arc<Self> {
        let lease = CacheLease::detached(profile.identity.clone());
        Arc::new(Self::hydrate(profile, context, lease))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn description(&self) -> Option<String> {
        Option::clone(&self.description.load())
    }

    pub fn profile(&self) -> AccountProfile {
        AccountProfile::new(self.identity.clone(), self.description())
    }

    pub fn add_observer<O: AccountObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn AccountObserver> = observer.clone();
        self.observers.add(&observer);
    }

    pub fn remove_observer<O: AccountObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn AccountObserver> = observer.clone();
        self.observers.remove(&observer);
    }

    pub async fn update_description(&self, description: Option<String>) -> Result<(), DomainError> {
        if let Err(e) = self
            .backend
            .update_description(self, description.as_deref())
            .await
        {
            warn!(account = %self.identity, error = %e, "backend rejected description update");
            return Err(e);
        }

        let _guard = self.update_lock.lock().await;
        self.description.store(Arc::new(description));
        self.observers.for_each(|o| o.did_update_description(self));
        debug!(account = %self.identity, "description updated");
        Ok(())
    }
}

impl Cacheable for Account {
    type Key = Identity;
    type Representation = AccountProfile;
    type Context = AccountContext;

    const KIND: &'static str = "account";

    fn key_of(profile: &AccountProfile) -> Identity {
        profile.identity.clone()
    }

    fn hydrate(profile: AccountProfile, context: &AccountContext, lease: CacheLease<Self>) -> Self {
        Self {
            identity: profile.identity,
            description: ArcSwap::from_pointee(profile.description),
            backend: Arc::clone(&context.backend),
            observers: ObserverRegistry::new(),
            update_lock: tokio::sync::Mutex::new(()),
            _lease: lease,
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("identity", &self.identity)
            .field("description", &self.description())
            .finish_non_exhaustive()
    }
}

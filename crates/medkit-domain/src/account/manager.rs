// ── Account manager ──
//
// Owns account membership and the primary account. Membership is a
// reactive collection of canonical instances from the account cache.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Account, AccountCache, AccountContext};
use crate::error::DomainError;
use crate::model::{AccountProfile, Identity};
use crate::observer::ObserverRegistry;
use crate::store::EntityCollection;
use crate::stream::MembershipStream;

/// What the backend reports at bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub accounts: Vec<AccountProfile>,
    #[serde(default)]
    pub primary: Option<Identity>,
}

#[async_trait]
pub trait AccountManagerBackend: Send + Sync {
    async fn initialize(&self) -> Result<AccountSnapshot, DomainError>;

    /// Create an account. The returned profile is authoritative.
    async fn add_account(
        &self,
        identity: &Identity,
        description: Option<&str>,
        secret: &SecretString,
    ) -> Result<AccountProfile, DomainError>;

    async fn remove_account(&self, account: &Account) -> Result<(), DomainError>;

    async fn update_primary(&self, account: Option<&Account>) -> Result<(), DomainError>;
}

pub trait AccountManagerObserver: Send + Sync {
    fn did_update(&self, _manager: &AccountManager) {}
    fn did_add(&self, _manager: &AccountManager, _account: &Arc<Account>) {}
    fn did_remove(&self, _manager: &AccountManager, _account: &Arc<Account>) {}
    fn did_update_primary(&self, _manager: &AccountManager, _primary: Option<&Arc<Account>>) {}
}

pub struct AccountManager {
    backend: Arc<dyn AccountManagerBackend>,
    cache: AccountCache,
    accounts: EntityCollection<Identity, Account>,
    primary: watch::Sender<Option<Arc<Account>>>,
    observers: ObserverRegistry<dyn AccountManagerObserver>,
    /// Serializes membership/primary update + broadcast pairs.
    update_lock: tokio::sync::Mutex<()>,
}

impl AccountManager {
    pub fn new(backend: Arc<dyn AccountManagerBackend>, context: AccountContext) -> Self {
        let (primary, _) = watch::channel(None);
        Self {
            backend,
            cache: AccountCache::new(context),
            accounts: EntityCollection::new(),
            primary,
            observers: ObserverRegistry::new(),
            update_lock: tokio::sync::Mutex::new(()),
        }
    }

    // ── Read side ──

    /// Members ordered by identity.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        Vec::clone(&self.accounts.snapshot())
    }

    pub fn subscribe(&self) -> MembershipStream<Account> {
        MembershipStream::new(self.accounts.subscribe())
    }

    pub fn account(&self, identity: &Identity) -> Option<Arc<Account>> {
        self.accounts.get(identity)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn primary(&self) -> Option<Arc<Account>> {
        self.primary.borrow().clone()
    }

    pub fn watch_primary(&self) -> watch::Receiver<Option<Arc<Account>>> {
        self.primary.subscribe()
    }

    pub fn cache(&self) -> &AccountCache {
        &self.cache
    }

    pub fn add_observer<O: AccountManagerObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn AccountManagerObserver> = observer.clone();
        self.observers.add(&observer);
    }

    pub fn remove_observer<O: AccountManagerObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn AccountManagerObserver> = observer.clone();
        self.observers.remove(&observer);
    }

    // ── Operations ──

    /// Load stored accounts and the primary selection from the backend.
    pub async fn initialize(&self) -> Result<(), DomainError> {
        let snapshot = self.backend.initialize().await?;
        let members: Vec<(Identity, Arc<Account>)> = snapshot
            .accounts
            .into_iter()
            .map(|profile| {
                let account = self.cache.resolve(profile);
                (account.identity().clone(), account)
            })
            .collect();

        let _guard = self.update_lock.lock().await;
        self.accounts.upsert_and_prune(members);
        let primary = snapshot
            .primary
            .as_ref()
            .and_then(|identity| self.accounts.get(identity));
        self.primary.send_replace(primary);
        info!(
            accounts = self.accounts.len(),
            primary = ?self.primary().map(|a| a.identity().to_string()),
            "account manager initialized"
        );
        self.observers.for_each(|o| o.did_update(self));
        Ok(())
    }

    /// Create an account, then make it primary.
    ///
    /// A failure to update the primary is logged and does not fail the
    /// add: the account exists either way.
    pub async fn add_account(
        &self,
        identity: &Identity,
        description: Option<&str>,
        secret: &SecretString,
    ) -> Result<Arc<Account>, DomainError> {
        if self.accounts.contains(identity) {
            return Err(DomainError::duplicate("account", identity));
        }

        let profile = self
            .backend
            .add_account(identity, description, secret)
            .await?;
        let account = self.cache.resolve(profile);

        {
            let _guard = self.update_lock.lock().await;
            self.accounts
                .upsert(account.identity().clone(), Arc::clone(&account));
            self.observers.for_each(|o| o.did_add(self, &account));
        }
        debug!(account = %account.identity(), "account added");

        if let Err(e) = self.update_primary(Some(&account)).await {
            warn!(account = %account.identity(), error = %e, "could not make new account primary");
        }
        Ok(account)
    }

    pub async fn remove_account(&self, identity: &Identity) -> Result<(), DomainError> {
        let account = self
            .accounts
            .get(identity)
            .ok_or_else(|| DomainError::not_found("account", identity))?;

        self.backend.remove_account(&account).await?;

        let _guard = self.update_lock.lock().await;
        self.accounts.remove(identity);
        self.observers.for_each(|o| o.did_remove(self, &account));
        debug!(account = %identity, "account removed");

        let was_primary = self
            .primary
            .borrow()
            .as_ref()
            .is_some_and(|p| Arc::ptr_eq(p, &account));
        if was_primary {
            self.primary.send_replace(None);
            self.observers.for_each(|o| o.did_update_primary(self, None));
            debug!("primary account cleared");
        }
        Ok(())
    }

    /// Select the primary account, or clear it with `None`.
    ///
    /// Membership is checked before the backend call and again at commit,
    /// so an account removed meanwhile never becomes primary.
    pub async fn update_primary(&self, account: Option<&Arc<Account>>) -> Result<(), DomainError> {
        if let Some(account) = account {
            self.ensure_member(account)?;
        }

        self.backend
            .update_primary(account.map(Arc::as_ref))
            .await?;

        let _guard = self.update_lock.lock().await;
        if let Some(account) = account {
            self.ensure_member(account)?;
        }
        self.primary.send_replace(account.cloned());
        self.observers
            .for_each(|o| o.did_update_primary(self, account));
        debug!(
            primary = ?account.map(|a| a.identity().to_string()),
            "primary account updated"
        );
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn ensure_member(&self, account: &Arc<Account>) -> Result<(), DomainError> {
        let is_member = self
            .accounts
            .get(account.identity())
            .is_some_and(|member| Arc::ptr_eq(&member, account));
        if is_member {
            Ok(())
        } else {
            Err(DomainError::not_found("account", account.identity()))
        }
    }
}

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use secrecy::SecretString;

use medkit_domain::{
    Account, AccountBackend, AccountContext, AccountManager, AccountManagerBackend,
    AccountManagerObserver, AccountObserver, AccountProfile, AccountSnapshot, Backends,
    DomainError, Identity, IdentityKind, MemoryBackend, Runtime, RuntimeConfig, StoreSnapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl AccountManagerObserver for Recorder {
    fn did_update(&self, manager: &AccountManager) {
        self.push(format!("update:{}", manager.len()));
    }

    fn did_add(&self, _manager: &AccountManager, account: &Arc<Account>) {
        self.push(format!("add:{}", account.identity()));
    }

    fn did_remove(&self, _manager: &AccountManager, account: &Arc<Account>) {
        self.push(format!("remove:{}", account.identity()));
    }

    fn did_update_primary(&self, _manager: &AccountManager, primary: Option<&Arc<Account>>) {
        let name = primary.map_or_else(|| "-".to_owned(), |a| a.identity().to_string());
        self.push(format!("primary:{name}"));
    }
}

impl AccountObserver for Recorder {
    fn did_update_description(&self, account: &Account) {
        let description = account.description().unwrap_or_default();
        self.push(format!("description:{description}"));
    }
}

fn memory_runtime(snapshot: StoreSnapshot) -> (Arc<MemoryBackend>, Runtime) {
    let backend = Arc::new(MemoryBackend::from_snapshot(snapshot));
    let runtime = Runtime::new(RuntimeConfig::default(), Backends::shared(backend.clone()));
    (backend, runtime)
}

/// Account backend seeded with `alice` (primary) and `bob`. Counts
/// calls and fails every mutation on demand.
#[derive(Default)]
struct ScriptedAccounts {
    calls: AtomicUsize,
    reject: Mutex<Option<String>>,
}

impl ScriptedAccounts {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reject_all(&self, message: &str) {
        *self.reject.lock() = Some(message.to_owned());
    }

    fn outcome(&self) -> Result<(), DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reject.lock().clone() {
            Some(message) => Err(DomainError::backend(std::io::Error::other(message))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AccountManagerBackend for ScriptedAccounts {
    async fn initialize(&self) -> Result<AccountSnapshot, DomainError> {
        Ok(AccountSnapshot {
            accounts: vec![
                AccountProfile::new(Identity::user("alice"), Some("Clinician".into())),
                AccountProfile::new(Identity::user("bob"), None),
            ],
            primary: Some(Identity::user("alice")),
        })
    }

    async fn add_account(
        &self,
        identity: &Identity,
        description: Option<&str>,
        _secret: &SecretString,
    ) -> Result<AccountProfile, DomainError> {
        self.outcome()?;
        Ok(AccountProfile::new(identity.clone(), description.map(str::to_owned)))
    }

    async fn remove_account(&self, _account: &Account) -> Result<(), DomainError> {
        self.outcome()
    }

    async fn update_primary(&self, _account: Option<&Account>) -> Result<(), DomainError> {
        // Stay in flight for one poll so membership can change meanwhile.
        tokio::task::yield_now().await;
        self.outcome()
    }
}

#[async_trait]
impl AccountBackend for ScriptedAccounts {
    async fn update_description(
        &self,
        _account: &Account,
        _description: Option<&str>,
    ) -> Result<(), DomainError> {
        self.outcome()
    }
}

async fn scripted_manager() -> (Arc<ScriptedAccounts>, AccountManager) {
    let backend = Arc::new(ScriptedAccounts::default());
    let manager = AccountManager::new(backend.clone(), AccountContext::new(backend.clone()));
    manager.initialize().await.unwrap();
    (backend, manager)
}

fn primary_name(manager: &AccountManager) -> Option<String> {
    manager.primary().map(|a| a.identity().to_string())
}

fn secret() -> SecretString {
    SecretString::from("hunter2".to_owned())
}

// ── Membership ──────────────────────────────────────────────────────

#[tokio::test]
async fn added_account_becomes_primary() {
    let (backend, runtime) = memory_runtime(StoreSnapshot::default());
    let manager = runtime.accounts();
    let recorder = Arc::new(Recorder::default());
    manager.add_observer(&recorder);

    let alice = manager
        .add_account(&Identity::user("alice"), Some("Clinician"), &secret())
        .await
        .unwrap();

    assert_eq!(recorder.events(), ["add:alice", "primary:alice"]);
    assert!(Arc::ptr_eq(&manager.primary().unwrap(), &alice));
    assert_eq!(alice.description().as_deref(), Some("Clinician"));
    assert_eq!(backend.snapshot().primary, Some(Identity::user("alice")));
}

#[tokio::test]
async fn duplicate_identity_is_rejected_locally() {
    let (_backend, runtime) = memory_runtime(StoreSnapshot::default());
    let manager = runtime.accounts();
    manager
        .add_account(&Identity::user("alice"), None, &secret())
        .await
        .unwrap();

    let err = manager
        .add_account(&Identity::user("alice"), None, &secret())
        .await
        .unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn removing_primary_clears_it_with_separate_event() {
    let (backend, runtime) = memory_runtime(StoreSnapshot::default());
    let manager = runtime.accounts();
    manager
        .add_account(&Identity::user("alice"), None, &secret())
        .await
        .unwrap();
    let recorder = Arc::new(Recorder::default());
    manager.add_observer(&recorder);

    manager.remove_account(&Identity::user("alice")).await.unwrap();

    assert_eq!(recorder.events(), ["remove:alice", "primary:-"]);
    assert!(manager.primary().is_none());
    assert!(manager.is_empty());
    assert_eq!(backend.snapshot(), StoreSnapshot::default());
}

#[tokio::test]
async fn removing_unknown_account_is_not_found() {
    let (_backend, runtime) = memory_runtime(StoreSnapshot::default());
    let err = runtime
        .accounts()
        .remove_account(&Identity::user("ghost"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn primary_must_be_a_member() {
    let (_backend, runtime) = memory_runtime(StoreSnapshot::default());
    let manager = runtime.accounts();
    let outsider = manager
        .cache()
        .resolve(AccountProfile::new(Identity::user("mallory"), None));

    let err = manager.update_primary(Some(&outsider)).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(manager.primary().is_none());
}

#[tokio::test]
async fn account_removed_while_primary_update_in_flight_is_not_made_primary() {
    let (backend, manager) = scripted_manager().await;
    let recorder = Arc::new(Recorder::default());
    manager.add_observer(&recorder);
    let bob = manager.account(&Identity::user("bob")).unwrap();

    let bob_id = Identity::user("bob");
    let (promoted, removed) = tokio::join!(
        manager.update_primary(Some(&bob)),
        manager.remove_account(&bob_id),
    );

    removed.unwrap();
    assert!(promoted.unwrap_err().is_not_found());
    assert_eq!(primary_name(&manager).as_deref(), Some("alice"));
    assert_eq!(recorder.events(), ["remove:bob"]);
    assert_eq!(backend.calls(), 2);
}

// ── Backend failures ────────────────────────────────────────────────

#[tokio::test]
async fn failed_removal_keeps_membership_and_stays_silent() {
    let (backend, manager) = scripted_manager().await;
    let recorder = Arc::new(Recorder::default());
    manager.add_observer(&recorder);
    backend.reject_all("directory offline");

    let err = manager
        .remove_account(&Identity::user("alice"))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Backend(_)));
    assert_eq!(manager.len(), 2);
    assert_eq!(primary_name(&manager).as_deref(), Some("alice"));
    assert!(recorder.events().is_empty());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn failed_primary_update_keeps_primary_and_stays_silent() {
    let (backend, manager) = scripted_manager().await;
    let recorder = Arc::new(Recorder::default());
    manager.add_observer(&recorder);
    backend.reject_all("directory offline");
    let bob = manager.account(&Identity::user("bob")).unwrap();

    let err = manager.update_primary(Some(&bob)).await.unwrap_err();

    assert!(matches!(err, DomainError::Backend(_)));
    assert_eq!(primary_name(&manager).as_deref(), Some("alice"));
    assert!(recorder.events().is_empty());

    manager.update_primary(None).await.unwrap_err();
    assert_eq!(primary_name(&manager).as_deref(), Some("alice"));
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn failed_description_update_keeps_description_and_stays_silent() {
    let (backend, manager) = scripted_manager().await;
    let alice = manager.account(&Identity::user("alice")).unwrap();
    let recorder = Arc::new(Recorder::default());
    alice.add_observer(&recorder);
    backend.reject_all("directory offline");

    let err = alice
        .update_description(Some("Night shift".into()))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Backend(_)));
    assert_eq!(alice.description().as_deref(), Some("Clinician"));
    assert!(recorder.events().is_empty());
    assert_eq!(backend.calls(), 1);
}

// ── Bootstrap ───────────────────────────────────────────────────────

#[tokio::test]
async fn initialize_loads_accounts_and_primary() {
    let ward = Identity::new("ward-7", IdentityKind::Organization);
    let (_backend, runtime) = memory_runtime(StoreSnapshot {
        accounts: vec![
            AccountProfile::new(Identity::user("bob"), None),
            AccountProfile::new(ward.clone(), Some("Ward 7".into())),
        ],
        primary: Some(ward.clone()),
        patients: Vec::new(),
    });
    let recorder = Arc::new(Recorder::default());
    runtime.accounts().add_observer(&recorder);

    runtime.initialize().await.unwrap();

    let manager = runtime.accounts();
    let identities: Vec<Identity> = manager
        .accounts()
        .iter()
        .map(|a| a.identity().clone())
        .collect();
    assert_eq!(identities, [Identity::user("bob"), ward.clone()]);
    assert_eq!(manager.primary().unwrap().identity(), &ward);
    assert_eq!(recorder.events(), ["update:2"]);
}

#[tokio::test]
async fn subscribers_observe_membership_changes() {
    let (_backend, runtime) = memory_runtime(StoreSnapshot::default());
    let manager = runtime.accounts();
    let mut stream = manager.subscribe();
    assert!(stream.members().is_empty());

    manager
        .add_account(&Identity::user("alice"), None, &secret())
        .await
        .unwrap();

    assert!(stream.is_stale());
    let members = stream.next_change().await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].identity(), &Identity::user("alice"));
}

// ── Account entity ──────────────────────────────────────────────────

#[tokio::test]
async fn description_update_persists_and_notifies() {
    let (backend, runtime) = memory_runtime(StoreSnapshot::default());
    let account = runtime
        .accounts()
        .add_account(&Identity::user("alice"), None, &secret())
        .await
        .unwrap();
    let recorder = Arc::new(Recorder::default());
    account.add_observer(&recorder);

    account
        .update_description(Some("Night shift".into()))
        .await
        .unwrap();

    assert_eq!(recorder.events(), ["description:Night shift"]);
    assert_eq!(
        backend.snapshot().accounts[0].description.as_deref(),
        Some("Night shift")
    );
}

#[tokio::test]
async fn default_backend_rejects_account_creation() {
    let runtime = Runtime::new(RuntimeConfig::default(), Backends::unsupported());
    runtime.initialize().await.unwrap();

    let err = runtime
        .accounts()
        .add_account(&Identity::user("alice"), None, &secret())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotSupported { .. }));
    assert!(runtime.accounts().is_empty());
}

// ── In-memory backend ──
//
// Applies every call to a process-local store of profiles. The whole
// store can be exported to, and rebuilt from, a `StoreSnapshot`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::account::{Account, AccountBackend, AccountManagerBackend, AccountSnapshot};
use crate::error::DomainError;
use crate::model::{AccountProfile, Identifier, Identity, Image, Name, PatientProfile};
use crate::patient::{Device, Patient, PatientBackend, PatientDirectoryBackend};

/// Serializable contents of a [`MemoryBackend`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub accounts: Vec<AccountProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<Identity>,
    #[serde(default)]
    pub patients: Vec<PatientProfile>,
}

pub struct MemoryBackend {
    patients: DashMap<Identifier, PatientProfile>,
    accounts: DashMap<Identity, AccountProfile>,
    primary: Mutex<Option<Identity>>,
    reachable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::from_snapshot(StoreSnapshot::default())
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            patients: snapshot
                .patients
                .into_iter()
                .map(|p| (p.identifier.clone(), p))
                .collect(),
            accounts: snapshot
                .accounts
                .into_iter()
                .map(|a| (a.identity.clone(), a))
                .collect(),
            primary: Mutex::new(snapshot.primary),
            reachable: AtomicBool::new(true),
        }
    }

    /// Export the current contents, sorted by key.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut accounts: Vec<AccountProfile> =
            self.accounts.iter().map(|r| r.value().clone()).collect();
        accounts.sort_by(|a, b| a.identity.cmp(&b.identity));
        let mut patients: Vec<PatientProfile> =
            self.patients.iter().map(|r| r.value().clone()).collect();
        patients.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        StoreSnapshot {
            accounts,
            primary: self.primary.lock().clone(),
            patients,
        }
    }

    /// Toggle what the directory reports from `is_reachable`.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }

    pub fn patient(&self, identifier: &Identifier) -> Option<PatientProfile> {
        self.patients.get(identifier).map(|r| r.value().clone())
    }

    fn with_patient(
        &self,
        identifier: &Identifier,
        apply: impl FnOnce(&mut PatientProfile),
    ) -> Result<(), DomainError> {
        let mut entry = self
            .patients
            .get_mut(identifier)
            .ok_or_else(|| DomainError::not_found("patient", identifier))?;
        apply(entry.value_mut());
        trace!(patient = %identifier, "stored patient updated");
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ── Patients ────────────────────────────────────────────────────────

#[async_trait]
impl PatientBackend for MemoryBackend {
    async fn assign_device(&self, patient: &Patient, device: &Device) -> Result<(), DomainError> {
        self.with_patient(patient.identifier(), |stored| {
            if !stored
                .devices
                .iter()
                .any(|d| &d.identifier == device.identifier())
            {
                stored.devices.push(device.profile());
            }
        })
    }

    async fn enable_notification(
        &self,
        patient: &Patient,
        enabled: bool,
    ) -> Result<(), DomainError> {
        self.with_patient(patient.identifier(), |stored| {
            stored.notification_enabled = enabled;
        })
    }

    async fn update_name(&self, patient: &Patient, name: &Name) -> Result<(), DomainError> {
        self.with_patient(patient.identifier(), |stored| stored.name = name.clone())
    }

    async fn update_photo(
        &self,
        patient: &Patient,
        photo: Option<&Image>,
    ) -> Result<(), DomainError> {
        self.with_patient(patient.identifier(), |stored| stored.photo = photo.cloned())
    }
}

#[async_trait]
impl PatientDirectoryBackend for MemoryBackend {
    async fn initialize(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }

    async fn add_patient(&self, patient: &Patient) -> Result<(), DomainError> {
        match self.patients.entry(patient.identifier().clone()) {
            Entry::Occupied(_) => Err(DomainError::duplicate("patient", patient.identifier())),
            Entry::Vacant(vacant) => {
                vacant.insert(patient.profile());
                Ok(())
            }
        }
    }

    async fn remove_patient(&self, patient: &Patient) -> Result<(), DomainError> {
        self.patients
            .remove(patient.identifier())
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("patient", patient.identifier()))
    }

    async fn find_patient(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<PatientProfile>, DomainError> {
        Ok(self.patient(identifier))
    }

    async fn search(&self, text: Option<&str>) -> Result<Vec<PatientProfile>, DomainError> {
        let needle = text.map(str::trim).filter(|t| !t.is_empty());
        let mut hits: Vec<PatientProfile> = self
            .patients
            .iter()
            .filter(|r| {
                needle.is_none_or(|needle| {
                    r.value().name.matches(needle)
                        || r.key()
                            .as_str()
                            .to_lowercase()
                            .contains(&needle.to_lowercase())
                })
            })
            .map(|r| r.value().clone())
            .collect();
        hits.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(hits)
    }
}

// ── Accounts ────────────────────────────────────────────────────────

#[async_trait]
impl AccountBackend for MemoryBackend {
    async fn update_description(
        &self,
        account: &Account,
        description: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut stored = self
            .accounts
            .get_mut(account.identity())
            .ok_or_else(|| DomainError::not_found("account", account.identity()))?;
        stored.description = description.map(str::to_owned);
        Ok(())
    }
}

#[async_trait]
impl AccountManagerBackend for MemoryBackend {
    async fn initialize(&self) -> Result<AccountSnapshot, DomainError> {
        let snapshot = self.snapshot();
        Ok(AccountSnapshot {
            accounts: snapshot.accounts,
            primary: snapshot.primary,
        })
    }

    async fn add_account(
        &self,
        identity: &Identity,
        description: Option<&str>,
        secret: &SecretString,
    ) -> Result<AccountProfile, DomainError> {
        // Credentials are accepted but never stored here.
        trace!(account = %identity, secret_len = secret.expose_secret().len(), "adding account");
        match self.accounts.entry(identity.clone()) {
            Entry::Occupied(_) => Err(DomainError::duplicate("account", identity)),
            Entry::Vacant(vacant) => {
                let profile = AccountProfile::new(identity.clone(), description.map(str::to_owned));
                vacant.insert(profile.clone());
                Ok(profile)
            }
        }
    }

    async fn remove_account(&self, account: &Account) -> Result<(), DomainError> {
        self.accounts
            .remove(account.identity())
            .ok_or_else(|| DomainError::not_found("account", account.identity()))?;
        let mut primary = self.primary.lock();
        if primary.as_ref() == Some(account.identity()) {
            *primary = None;
        }
        Ok(())
    }

    async fn update_primary(&self, account: Option<&Account>) -> Result<(), DomainError> {
        if let Some(account) = account {
            if !self.accounts.contains_key(account.identity()) {
                return Err(DomainError::not_found("account", account.identity()));
            }
        }
        *self.primary.lock() = account.map(|a| a.identity().clone());
        Ok(())
    }
}

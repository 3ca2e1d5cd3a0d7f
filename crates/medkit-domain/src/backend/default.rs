// ── Unsupported backend ──
//
// Stand-in used until a real backend is configured. Every mutation
// reports `NotSupported`; bootstrap succeeds with nothing in it.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::account::{Account, AccountBackend, AccountManagerBackend, AccountSnapshot};
use crate::error::DomainError;
use crate::model::{AccountProfile, Identifier, Identity, Image, Name, PatientProfile};
use crate::patient::{Device, Patient, PatientBackend, PatientDirectoryBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackend;

#[async_trait]
impl PatientBackend for DefaultBackend {
    async fn assign_device(&self, _patient: &Patient, _device: &Device) -> Result<(), DomainError> {
        Err(DomainError::not_supported("assign_device"))
    }

    async fn enable_notification(
        &self,
        _patient: &Patient,
        _enabled: bool,
    ) -> Result<(), DomainError> {
        Err(DomainError::not_supported("enable_notification"))
    }

    async fn update_name(&self, _patient: &Patient, _name: &Name) -> Result<(), DomainError> {
        Err(DomainError::not_supported("update_name"))
    }

    async fn update_photo(
        &self,
        _patient: &Patient,
        _photo: Option<&Image>,
    ) -> Result<(), DomainError> {
        Err(DomainError::not_supported("update_photo"))
    }
}

#[async_trait]
impl PatientDirectoryBackend for DefaultBackend {
    async fn initialize(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn is_reachable(&self) -> bool {
        false
    }

    async fn add_patient(&self, _patient: &Patient) -> Result<(), DomainError> {
        Err(DomainError::not_supported("add_patient"))
    }

    async fn remove_patient(&self, _patient: &Patient) -> Result<(), DomainError> {
        Err(DomainError::not_supported("remove_patient"))
    }

    async fn find_patient(
        &self,
        _identifier: &Identifier,
    ) -> Result<Option<PatientProfile>, DomainError> {
        Err(DomainError::not_supported("find_patient"))
    }

    async fn search(&self, _text: Option<&str>) -> Result<Vec<PatientProfile>, DomainError> {
        Err(DomainError::not_supported("search"))
    }
}

#[async_trait]
impl AccountBackend for DefaultBackend {
    async fn update_description(
        &self,
        _account: &Account,
        _description: Option<&str>,
    ) -> Result<(), DomainError> {
        Err(DomainError::not_supported("update_description"))
    }
}

#[async_trait]
impl AccountManagerBackend for DefaultBackend {
    async fn initialize(&self) -> Result<AccountSnapshot, DomainError> {
        Ok(AccountSnapshot::default())
    }

    async fn add_account(
        &self,
        _identity: &Identity,
        _description: Option<&str>,
        _secret: &SecretString,
    ) -> Result<AccountProfile, DomainError> {
        Err(DomainError::not_supported("add_account"))
    }

    async fn remove_account(&self, _account: &Account) -> Result<(), DomainError> {
        Err(DomainError::not_supported("remove_account"))
    }

    async fn update_primary(&self, _account: Option<&Account>) -> Result<(), DomainError> {
        Err(DomainError::not_supported("update_primary"))
    }
}

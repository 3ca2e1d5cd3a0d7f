// ── Patient directory ──
//
// The service through which callers discover patients. Lookups go to
// the directory backend; every profile that comes back is routed through
// the patient cache so callers always receive the canonical instance.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Patient, PatientCache, PatientContext};
use crate::error::DomainError;
use crate::model::{Identifier, PatientProfile};
use crate::observer::ObserverRegistry;

/// Storage-side operations behind a [`PatientDirectory`].
#[async_trait]
pub trait PatientDirectoryBackend: Send + Sync {
    async fn initialize(&self) -> Result<(), DomainError>;

    /// Synchronous check; must not block.
    fn is_reachable(&self) -> bool;

    async fn add_patient(&self, patient: &Patient) -> Result<(), DomainError>;

    async fn remove_patient(&self, patient: &Patient) -> Result<(), DomainError>;

    async fn find_patient(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<PatientProfile>, DomainError>;

    /// Profiles matching `text`, or every profile when `text` is `None`.
    async fn search(&self, text: Option<&str>) -> Result<Vec<PatientProfile>, DomainError>;
}

pub trait PatientDirectoryObserver: Send + Sync {
    fn did_update(&self, _directory: &PatientDirectory) {}
    fn did_add(&self, _directory: &PatientDirectory, _patient: &Arc<Patient>) {}
    fn did_remove(&self, _directory: &PatientDirectory, _patient: &Arc<Patient>) {}
}

pub struct PatientDirectory {
    backend: Arc<dyn PatientDirectoryBackend>,
    patients: PatientCache,
    observers: ObserverRegistry<dyn PatientDirectoryObserver>,
}

impl PatientDirectory {
    pub fn new(backend: Arc<dyn PatientDirectoryBackend>, context: PatientContext) -> Self {
        Self {
            backend,
            patients: PatientCache::new(context),
            observers: ObserverRegistry::new(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.backend.is_reachable()
    }

    pub fn cache(&self) -> &PatientCache {
        &self.patients
    }

    pub fn add_observer<O: PatientDirectoryObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn PatientDirectoryObserver> = observer.clone();
        self.observers.add(&observer);
    }

    pub fn remove_observer<O: PatientDirectoryObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn PatientDirectoryObserver> = observer.clone();
        self.observers.remove(&observer);
    }

    pub async fn initialize(&self) -> Result<(), DomainError> {
        self.backend.initialize().await?;
        info!(reachable = self.is_reachable(), "patient directory initialized");
        self.observers.for_each(|o| o.did_update(self));
        Ok(())
    }

    pub async fn add_patient(&self, patient: &Arc<Patient>) -> Result<(), DomainError> {
        self.backend.add_patient(patient).await?;
        debug!(patient = %patient.identifier(), "patient added");
        self.observers.for_each(|o| o.did_add(self, patient));
        Ok(())
    }

    pub async fn remove_patient(&self, patient: &Arc<Patient>) -> Result<(), DomainError> {
        self.backend.remove_patient(patient).await?;
        debug!(patient = %patient.identifier(), "patient removed");
        self.observers.for_each(|o| o.did_remove(self, patient));
        Ok(())
    }

    /// Canonical instance for `profile`, hydrating it if none is live.
    pub fn find_patient(&self, profile: PatientProfile) -> Arc<Patient> {
        self.patients.resolve(profile)
    }

    /// Live instance for `identifier`, if any. Never reaches the backend.
    pub fn cached_patient(&self, identifier: &Identifier) -> Option<Arc<Patient>> {
        self.patients.find(identifier)
    }

    pub async fn find_patient_with_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Arc<Patient>, DomainError> {
        let profile = self
            .backend
            .find_patient(identifier)
            .await?
            .ok_or_else(|| DomainError::not_found("patient", identifier))?;
        Ok(self.patients.resolve(profile))
    }

    pub async fn search(&self, text: Option<&str>) -> Result<Vec<Arc<Patient>>, DomainError> {
        let profiles = self.backend.search(text).await?;
        debug!(query = text.unwrap_or("*"), hits = profiles.len(), "patient search");
        Ok(profiles
            .into_iter()
            .map(|profile| self.patients.resolve(profile))
            .collect())
    }
}

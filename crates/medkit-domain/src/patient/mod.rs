// ── Patient entity ──
//
// Read-only accessors over confirmed state plus async mutators that
// delegate to a `PatientBackend`. A field changes, and observers hear
// about it, only after the backend reports success.

pub mod device;
pub mod directory;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{CacheLease, Cacheable, EntityCache};
use crate::error::DomainError;
use crate::join::JoinGroup;
use crate::model::{Identifier, Image, Name, NameFormat, PatientProfile};
use crate::observer::ObserverRegistry;

pub use device::{Device, DeviceCache};
pub use directory::{PatientDirectory, PatientDirectoryBackend, PatientDirectoryObserver};

// ── Delegate and observer contracts ─────────────────────────────────

/// Performs the state-changing work behind a [`Patient`].
///
/// Each call receives the patient in its pre-mutation state and the new
/// value. Returning `Ok` commits the change locally.
#[async_trait]
pub trait PatientBackend: Send + Sync {
    async fn assign_device(&self, patient: &Patient, device: &Device) -> Result<(), DomainError>;

    async fn enable_notification(&self, patient: &Patient, enabled: bool)
    -> Result<(), DomainError>;

    async fn update_name(&self, patient: &Patient, name: &Name) -> Result<(), DomainError>;

    async fn update_photo(
        &self,
        patient: &Patient,
        photo: Option<&Image>,
    ) -> Result<(), DomainError>;
}

/// Receives confirmed patient changes. Every method defaults to a no-op.
pub trait PatientObserver: Send + Sync {
    fn did_update_name(&self, _patient: &Patient) {}
    fn did_update_photo(&self, _patient: &Patient) {}
    fn did_update_notification(&self, _patient: &Patient) {}
    fn did_add_device(&self, _patient: &Patient, _device: &Arc<Device>) {}
}

// ── State ───────────────────────────────────────────────────────────

#[derive(Clone)]
struct PatientState {
    name: Name,
    birthdate: Option<NaiveDate>,
    photo: Option<Image>,
    notification_enabled: bool,
    devices: Vec<Arc<Device>>,
}

impl PatientState {
    fn has_device(&self, identifier: &Identifier) -> bool {
        self.devices.iter().any(|d| d.identifier() == identifier)
    }
}

/// Collaborators shared by every patient a cache hydrates.
pub struct PatientContext {
    pub backend: Arc<dyn PatientBackend>,
    pub devices: DeviceCache,
}

impl PatientContext {
    pub fn new(backend: Arc<dyn PatientBackend>, devices: DeviceCache) -> Self {
        Self { backend, devices }
    }
}

pub type PatientCache = EntityCache<Patient>;

// ── Patient ─────────────────────────────────────────────────────────

pub struct Patient {
    identifier: Identifier,
    state: ArcSwap<PatientState>,
    backend: Arc<dyn PatientBackend>,
    observers: ObserverRegistry<dyn PatientObserver>,
    /// Serializes field update + broadcast pairs.
    update_lock: tokio::sync::Mutex<()>,
    /// Devices whose assignment is waiting on the backend.
    assigning: Mutex<HashSet<Identifier>>,
    _lease: CacheLease<Patient>,
}

impl Patient {
    /// Build an uncached patient straight from caller values.
    pub fn detached(profile: PatientProfile, context: &PatientContext) -> Arc<Self> {
        let lease = CacheLease::detached(profile.identifier.clone());
        Arc::new(Self::hydrate(profile, context, lease))
    }

    // ── Accessors ──

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn name(&self) -> Name {
        self.state.load().name.clone()
    }

    pub fn formatted_name(&self, format: NameFormat) -> String {
        self.state.load().name.formatted(format)
    }

    pub fn birthdate(&self) -> Option<NaiveDate> {
        self.state.load().birthdate
    }

    pub fn photo(&self) -> Option<Image> {
        self.state.load().photo.clone()
    }

    pub fn notification_enabled(&self) -> bool {
        self.state.load().notification_enabled
    }

    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.state.load().devices.clone()
    }

    pub fn has_device(&self, identifier: &Identifier) -> bool {
        self.state.load().has_device(identifier)
    }

    /// Encode the confirmed state as an external representation.
    pub fn profile(&self) -> PatientProfile {
        let state = self.state.load();
        PatientProfile {
            identifier: self.identifier.clone(),
            name: state.name.clone(),
            birthdate: state.birthdate,
            photo: state.photo.clone(),
            devices: state.devices.iter().map(|d| d.profile()).collect(),
            notification_enabled: state.notification_enabled,
        }
    }

    // ── Observers ──

    pub fn add_observer<O: PatientObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn PatientObserver> = observer.clone();
        self.observers.add(&observer);
    }

    pub fn remove_observer<O: PatientObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn PatientObserver> = observer.clone();
        self.observers.remove(&observer);
    }

    // ── Mutators ──

    /// Assign a device. Assigning one already present, or one whose
    /// assignment is still in flight, fails with `Duplicate` without
    /// reaching the backend.
    pub async fn assign_device(&self, device: Arc<Device>) -> Result<(), DomainError> {
        let _claim = self.claim_device(device.identifier())?;

        self.backend
            .assign_device(self, &device)
            .await
            .inspect_err(|e| self.log_rejected("assign_device", e))?;

        self.commit(
            |state| {
                state.devices.push(Arc::clone(&device));
                Ok(())
            },
            |observer| observer.did_add_device(self, &device),
        )
        .await?;
        debug!(patient = %self.identifier, device = %device.identifier(), "device assigned");
        Ok(())
    }

    /// Assign several devices concurrently.
    ///
    /// Resolves after every assignment has settled, with the first
    /// failure if any. Assignments that succeed stay committed. A device
    /// listed more than once is assigned once; its repeats settle as
    /// `Duplicate` before any backend call starts.
    pub async fn assign_devices(&self, devices: Vec<Arc<Device>>) -> Result<(), DomainError> {
        let group = JoinGroup::new();
        let mut seen = HashSet::with_capacity(devices.len());
        let mut assignments = Vec::with_capacity(devices.len());
        for device in devices {
            let ticket = group.incr();
            if seen.insert(device.identifier().clone()) {
                assignments.push(async move { ticket.decr(self.assign_device(device).await) });
            } else {
                ticket.decr(Err(DomainError::duplicate("device", device.identifier())));
            }
        }
        join_all(assignments).await;
        group.close().await
    }

    pub async fn enable_notification(&self, enabled: bool) -> Result<(), DomainError> {
        self.backend
            .enable_notification(self, enabled)
            .await
            .inspect_err(|e| self.log_rejected("enable_notification", e))?;

        self.commit(
            |state| {
                state.notification_enabled = enabled;
                Ok(())
            },
            |observer| observer.did_update_notification(self),
        )
        .await?;
        debug!(patient = %self.identifier, enabled, "notification updated");
        Ok(())
    }

    pub async fn update_name(&self, name: Name) -> Result<(), DomainError> {
        self.backend
            .update_name(self, &name)
            .await
            .inspect_err(|e| self.log_rejected("update_name", e))?;

        self.commit(
            |state| {
                state.name = name;
                Ok(())
            },
            |observer| observer.did_update_name(self),
        )
        .await?;
        debug!(patient = %self.identifier, "name updated");
        Ok(())
    }

    pub async fn update_photo(&self, photo: Option<Image>) -> Result<(), DomainError> {
        self.backend
            .update_photo(self, photo.as_ref())
            .await
            .inspect_err(|e| self.log_rejected("update_photo", e))?;

        self.commit(
            |state| {
                state.photo = photo;
                Ok(())
            },
            |observer| observer.did_update_photo(self),
        )
        .await?;
        debug!(patient = %self.identifier, "photo updated");
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Apply a confirmed change and broadcast it under the update lock.
    async fn commit(
        &self,
        apply: impl FnOnce(&mut PatientState) -> Result<(), DomainError>,
        notify: impl FnMut(&(dyn PatientObserver + 'static)),
    ) -> Result<(), DomainError> {
        let _guard = self.update_lock.lock().await;
        let mut next = PatientState::clone(&self.state.load());
        apply(&mut next)?;
        self.state.store(Arc::new(next));
        self.observers.for_each(notify);
        Ok(())
    }

    /// Reserve `identifier` for one in-flight assignment. The claim is
    /// released on drop, after the commit when the backend succeeded.
    fn claim_device(&self, identifier: &Identifier) -> Result<DeviceClaim<'_>, DomainError> {
        let mut assigning = self.assigning.lock();
        if self.has_device(identifier) || !assigning.insert(identifier.clone()) {
            return Err(DomainError::duplicate("device", identifier));
        }
        Ok(DeviceClaim {
            assigning: &self.assigning,
            identifier: identifier.clone(),
        })
    }

    fn log_rejected(&self, operation: &str, error: &DomainError) {
        warn!(patient = %self.identifier, operation, error = %error, "backend rejected mutation");
    }
}

struct DeviceClaim<'a> {
    assigning: &'a Mutex<HashSet<Identifier>>,
    identifier: Identifier,
}

impl Drop for DeviceClaim<'_> {
    fn drop(&mut self) {
        self.assigning.lock().remove(&self.identifier);
    }
}

impl Cacheable for Patient {
    type Key = Identifier;
    type Representation = PatientProfile;
    type Context = PatientContext;

    const KIND: &'static str = "patient";

    fn key_of(profile: &PatientProfile) -> Identifier {
        profile.identifier.clone()
    }

    fn hydrate(profile: PatientProfile, context: &PatientContext, lease: CacheLease<Self>) -> Self {
        let devices = profile
            .devices
            .into_iter()
            .map(|device| context.devices.resolve(device))
            .collect();

        Self {
            identifier: profile.identifier,
            state: ArcSwap::from_pointee(PatientState {
                name: profile.name,
                birthdate: profile.birthdate,
                photo: profile.photo,
                notification_enabled: profile.notification_enabled,
                devices,
            }),
            backend: Arc::clone(&context.backend),
            observers: ObserverRegistry::new(),
            update_lock: tokio::sync::Mutex::new(()),
            assigning: Mutex::new(HashSet::new()),
            _lease: lease,
        }
    }
}

impl fmt::Debug for Patient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load();
        f.debug_struct("Patient")
            .field("identifier", &self.identifier)
            .field("name", &state.name)
            .field("devices", &state.devices.len())
            .finish_non_exhaustive()
    }
}

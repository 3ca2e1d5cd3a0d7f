#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use medkit_domain::{
    Device, DeviceCache, DeviceProfile, DomainError, Image, Name, NameFormat, Patient,
    PatientBackend, PatientCache, PatientContext, PatientObserver, PatientProfile,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Backend that counts calls and fails on demand.
#[derive(Default)]
struct ScriptedBackend {
    calls: AtomicUsize,
    /// When set, every call fails with this message.
    reject: Mutex<Option<String>>,
    /// Per-device failures for `assign_device`.
    reject_devices: Mutex<HashMap<String, String>>,
}

impl ScriptedBackend {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reject_all(&self, message: &str) {
        *self.reject.lock() = Some(message.to_owned());
    }

    fn accept_all(&self) {
        *self.reject.lock() = None;
    }

    fn reject_device(&self, device: &str, message: &str) {
        self.reject_devices
            .lock()
            .insert(device.to_owned(), message.to_owned());
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
impl PatientBackend for ScriptedBackend {
    async fn assign_device(&self, _patient: &Patient, device: &Device) -> Result<(), DomainError> {
        // Let other assignments start while this one is in flight.
        tokio::task::yield_now().await;
        self.outcome()?;
        match self.reject_devices.lock().get(device.identifier().as_str()) {
            Some(message) => Err(DomainError::backend(std::io::Error::other(message.clone()))),
            None => Ok(()),
        }
    }

    async fn enable_notification(&self, _patient: &Patient, _enabled: bool) -> Result<(), DomainError> {
        self.outcome()
    }

    async fn update_name(&self, _patient: &Patient, _name: &Name) -> Result<(), DomainError> {
        self.outcome()
    }

    async fn update_photo(&self, _patient: &Patient, _photo: Option<&Image>) -> Result<(), DomainError> {
        self.outcome()
    }
}

/// Records each event together with the state visible at delivery time.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl PatientObserver for Recorder {
    fn did_update_name(&self, patient: &Patient) {
        let name = patient.formatted_name(NameFormat::FirstLast);
        self.events.lock().push(format!("name:{name}"));
    }

    fn did_update_photo(&self, patient: &Patient) {
        let kind = patient.photo().map_or("none", |p| p.kind());
        self.events.lock().push(format!("photo:{kind}"));
    }

    fn did_update_notification(&self, patient: &Patient) {
        let enabled = patient.notification_enabled();
        self.events.lock().push(format!("notify:{enabled}"));
    }

    fn did_add_device(&self, _patient: &Patient, device: &Arc<Device>) {
        self.events.lock().push(format!("device:{}", device.identifier()));
    }
}

struct Fixture {
    backend: Arc<ScriptedBackend>,
    devices: DeviceCache,
    patient: Arc<Patient>,
    // Keeps the cache (and its context) alive for the patient's lease.
    _patients: PatientCache,
}

fn fixture() -> Fixture {
    let backend = Arc::new(ScriptedBackend::default());
    let devices = DeviceCache::new(());
    let patients = PatientCache::new(PatientContext::new(backend.clone(), devices.clone()));
    let patient = patients.resolve(PatientProfile::new("p-1", Name::new("Jane", "Doe")));
    Fixture {
        backend,
        devices,
        patient,
        _patients: patients,
    }
}

fn device(fx: &Fixture, id: &str) -> Arc<Device> {
    fx.devices.resolve(DeviceProfile::new(id))
}

fn backend_message(err: &DomainError) -> String {
    match err {
        DomainError::Backend(source) => source.to_string(),
        other => panic!("expected backend error, got {other:?}"),
    }
}

// ── Mutation outcomes ───────────────────────────────────────────────

#[tokio::test]
async fn successful_update_commits_before_broadcast() {
    let fx = fixture();
    let recorder = Arc::new(Recorder::default());
    fx.patient.add_observer(&recorder);

    fx.patient.update_name(Name::new("Janet", "Doe")).await.unwrap();

    assert_eq!(fx.patient.name(), Name::new("Janet", "Doe"));
    assert_eq!(recorder.events(), ["name:Janet Doe"]);
    assert_eq!(fx.backend.calls(), 1);
}

#[tokio::test]
async fn failed_update_leaves_state_and_stays_silent() {
    let fx = fixture();
    let recorder = Arc::new(Recorder::default());
    fx.patient.add_observer(&recorder);
    fx.backend.reject_all("storage offline");

    let err = fx.patient.update_name(Name::new("X", "Y")).await.unwrap_err();

    assert_eq!(backend_message(&err), "storage offline");
    assert_eq!(fx.patient.name(), Name::new("Jane", "Doe"));
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn each_mutator_fires_its_own_event() {
    let fx = fixture();
    let recorder = Arc::new(Recorder::default());
    fx.patient.add_observer(&recorder);

    fx.patient.enable_notification(true).await.unwrap();
    fx.patient
        .update_photo(Some(Image::named("person.circle")))
        .await
        .unwrap();
    fx.patient.assign_device(device(&fx, "d-1")).await.unwrap();
    fx.patient.update_photo(None).await.unwrap();

    assert_eq!(
        recorder.events(),
        ["notify:true", "photo:symbolic", "device:d-1", "photo:none"]
    );
    assert!(fx.patient.notification_enabled());
    assert_eq!(fx.patient.devices().len(), 1);
}

// ── Device assignment ───────────────────────────────────────────────

#[tokio::test]
async fn duplicate_assignment_never_reaches_backend() {
    let fx = fixture();
    let pump = device(&fx, "d-1");
    fx.patient.assign_device(Arc::clone(&pump)).await.unwrap();
    assert_eq!(fx.backend.calls(), 1);

    let err = fx.patient.assign_device(pump).await.unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(fx.backend.calls(), 1);
    assert_eq!(fx.patient.devices().len(), 1);
}

#[tokio::test]
async fn assign_devices_reports_first_error_in_settlement_order() {
    let fx = fixture();
    fx.backend.reject_device("d-2", "A");
    fx.backend.reject_device("d-3", "B");

    let err = fx
        .patient
        .assign_devices(vec![device(&fx, "d-1"), device(&fx, "d-2"), device(&fx, "d-3")])
        .await
        .unwrap_err();

    assert_eq!(backend_message(&err), "A");
    // Successful sub-operations stay committed.
    let assigned: Vec<String> = fx
        .patient
        .devices()
        .iter()
        .map(|d| d.identifier().to_string())
        .collect();
    assert_eq!(assigned, ["d-1"]);
    assert_eq!(fx.backend.calls(), 3);
}

#[tokio::test]
async fn repeated_device_in_batch_is_assigned_once() {
    let fx = fixture();
    let recorder = Arc::new(Recorder::default());
    fx.patient.add_observer(&recorder);
    let pump = device(&fx, "d-1");

    let err = fx
        .patient
        .assign_devices(vec![Arc::clone(&pump), pump])
        .await
        .unwrap_err();

    assert!(err.is_duplicate());
    assert_eq!(fx.backend.calls(), 1);
    assert_eq!(fx.patient.devices().len(), 1);
    assert_eq!(recorder.events(), ["device:d-1"]);
}

#[tokio::test]
async fn in_flight_assignment_blocks_concurrent_duplicate() {
    let fx = fixture();
    let pump = device(&fx, "d-1");

    let (first, second) = tokio::join!(
        fx.patient.assign_device(Arc::clone(&pump)),
        fx.patient.assign_device(Arc::clone(&pump)),
    );

    first.unwrap();
    assert!(second.unwrap_err().is_duplicate());
    assert_eq!(fx.backend.calls(), 1);
    assert_eq!(fx.patient.devices().len(), 1);
}

#[tokio::test]
async fn rejected_assignment_can_be_retried() {
    let fx = fixture();
    let pump = device(&fx, "d-1");
    fx.backend.reject_all("pairing failed");

    let err = fx.patient.assign_device(Arc::clone(&pump)).await.unwrap_err();
    assert_eq!(backend_message(&err), "pairing failed");
    assert!(fx.patient.devices().is_empty());

    fx.backend.accept_all();
    fx.patient.assign_device(pump).await.unwrap();
    assert_eq!(fx.backend.calls(), 2);
    assert_eq!(fx.patient.devices().len(), 1);
}

#[tokio::test]
async fn assign_devices_with_nothing_to_do_succeeds() {
    let fx = fixture();
    fx.patient.assign_devices(Vec::new()).await.unwrap();
    assert_eq!(fx.backend.calls(), 0);
}

// ── Observers ───────────────────────────────────────────────────────

#[tokio::test]
async fn dropped_observer_is_not_notified() {
    let fx = fixture();
    let kept = Arc::new(Recorder::default());
    let dropped = Arc::new(Recorder::default());
    fx.patient.add_observer(&kept);
    fx.patient.add_observer(&dropped);
    drop(dropped);

    fx.patient.enable_notification(true).await.unwrap();
    assert_eq!(kept.events(), ["notify:true"]);
}

#[tokio::test]
async fn removed_observer_is_not_notified() {
    let fx = fixture();
    let recorder = Arc::new(Recorder::default());
    fx.patient.add_observer(&recorder);
    fx.patient.add_observer(&recorder);
    fx.patient.remove_observer(&recorder);

    fx.patient.enable_notification(false).await.unwrap();
    assert!(recorder.events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutations_never_interleave_broadcasts() {
    let fx = fixture();
    let recorder = Arc::new(Recorder::default());
    fx.patient.add_observer(&recorder);

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let patient = Arc::clone(&fx.patient);
            tokio::spawn(async move { patient.update_name(Name::new(format!("N{i}"), "Doe")).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let events = recorder.events();
    assert_eq!(events.len(), 16);
    // The state each observer saw is the state committed by that mutation,
    // so the last broadcast matches the final state.
    let last = events.last().unwrap();
    assert_eq!(
        *last,
        format!("name:{}", fx.patient.formatted_name(NameFormat::FirstLast))
    );
}

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use medkit_domain::{
    AccountProfile, Backends, DeviceProfile, Identity, IdentityKind, Image, MemoryBackend, Name,
    PatientProfile, Runtime, RuntimeConfig, StoreSnapshot,
};

fn full_patient() -> PatientProfile {
    PatientProfile {
        identifier: "p-1".into(),
        name: Name::new("Jane", "Doe"),
        birthdate: NaiveDate::from_ymd_opt(1990, 12, 31),
        photo: Some(Image::from_bytes(vec![0, 159, 146, 150])),
        devices: vec![DeviceProfile {
            identifier: "d-1".into(),
            name: Some("Glucose monitor".into()),
            model: Some("G7".into()),
            manufacturer: Some("Dexcom".into()),
        }],
        notification_enabled: true,
    }
}

#[test]
fn hydrated_patient_encodes_to_its_source_profile() {
    let runtime = Runtime::new(RuntimeConfig::default(), Backends::unsupported());
    let patient = runtime.directory().find_patient(full_patient());

    let encoded = serde_json::to_string(&patient.profile()).unwrap();
    let decoded = PatientProfile::from_json(&encoded).unwrap();
    assert_eq!(decoded, full_patient());
}

#[tokio::test]
async fn mutated_state_survives_store_round_trip() {
    let backend = Arc::new(MemoryBackend::from_snapshot(StoreSnapshot {
        patients: vec![full_patient()],
        ..StoreSnapshot::default()
    }));
    let runtime = Runtime::new(RuntimeConfig::default(), Backends::shared(backend.clone()));
    let patient = runtime.directory().search(None).await.unwrap().remove(0);

    patient.update_name(Name::new("Janet", "Doe")).await.unwrap();
    patient.enable_notification(false).await.unwrap();

    let json = serde_json::to_string_pretty(&backend.snapshot()).unwrap();
    let restored: StoreSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.patients, vec![patient.profile()]);
}

#[test]
fn store_snapshot_wire_shape() {
    let snapshot = StoreSnapshot {
        accounts: vec![AccountProfile::new(
            Identity::new("pump-1", IdentityKind::Device),
            None,
        )],
        primary: Some(Identity::new("pump-1", IdentityKind::Device)),
        patients: vec![PatientProfile::new("p-9", Name::default())],
    };

    assert_eq!(
        serde_json::to_value(&snapshot).unwrap(),
        serde_json::json!({
            "accounts": [ { "identity": { "name": "pump-1", "type": "device" } } ],
            "primary": { "name": "pump-1", "type": "device" },
            "patients": [ { "identifier": "p-9", "name": {} } ]
        })
    );
}

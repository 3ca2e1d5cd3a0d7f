// ── External representations ──
//
// Immutable profile documents exchanged with backends and storage.
// Decoding is strict about identity (a missing or non-string identifier
// is rejected) and lenient about everything else: an optional field with
// the wrong shape decodes as absent.

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::identity::{Identifier, Identity};
use super::image::Image;
use super::name::Name;
use crate::error::DomainError;

// ── Lenient field decoders ──────────────────────────────────────────

/// Decode an optional field, treating a mistyped value as absent.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`], falling back to `T::default()`.
pub(crate) fn lenient_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Decode a list, dropping elements that fail to decode.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Decode a calendar date written either as `YYYY-MM-DD` or as an
/// RFC 3339 timestamp, keeping the timestamp's date in its own offset.
pub(crate) fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::String(raw) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(raw
        .parse::<NaiveDate>()
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(&raw).ok().map(|ts| ts.date_naive())))
}

fn decode<T: DeserializeOwned>(entity_type: &str, json: &str) -> Result<T, DomainError> {
    serde_json::from_str(json).map_err(|e| DomainError::malformed(entity_type, e))
}

fn decode_value<T: DeserializeOwned>(entity_type: &str, value: Value) -> Result<T, DomainError> {
    serde_json::from_value(value).map_err(|e| DomainError::malformed(entity_type, e))
}

// ── Device ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub identifier: Identifier,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
}

impl DeviceProfile {
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
            model: None,
            manufacturer: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        decode("device", json)
    }
}

// ── Patient ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub identifier: Identifier,
    #[serde(default, deserialize_with = "lenient_default")]
    pub name: Name,
    #[serde(default, deserialize_with = "lenient_date", skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub photo: Option<Image>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceProfile>,
    #[serde(default, deserialize_with = "lenient_default", skip_serializing_if = "is_false")]
    pub notification_enabled: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(flag: &bool) -> bool {
    !*flag
}

impl PatientProfile {
    pub fn new(identifier: impl Into<Identifier>, name: Name) -> Self {
        Self {
            identifier: identifier.into(),
            name,
            birthdate: None,
            photo: None,
            devices: Vec::new(),
            notification_enabled: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        decode("patient", json)
    }

    pub fn from_value(value: Value) -> Result<Self, DomainError> {
        decode_value("patient", value)
    }

    pub fn to_value(&self) -> Value {
        // Every field serializes infallibly into a JSON value.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ── Account ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub identity: Identity,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AccountProfile {
    pub fn new(identity: Identity, description: Option<String>) -> Self {
        Self {
            identity,
            description,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        decode("account", json)
    }
}

// ── Image reference ──
//
// Either a symbolic name resolved elsewhere (an asset catalog) or the
// image bytes themselves. On the wire:
//
//   { "type": "symbolic", "value": "<name>" }
//   { "type": "data",     "value": "<base64>" }

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Image {
    Symbolic(String),
    Data(Bytes),
}

impl Image {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Symbolic(name.into())
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Data(data.into())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, DomainError> {
        BASE64
            .decode(encoded)
            .map(|raw| Self::Data(Bytes::from(raw)))
            .map_err(|e| DomainError::malformed("image", e))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Symbolic(name) => Some(name),
            Self::Data(_) => None,
        }
    }

    pub fn data(&self) -> Option<&Bytes> {
        match self {
            Self::Data(data) => Some(data),
            Self::Symbolic(_) => None,
        }
    }

    pub fn base64(&self) -> Option<String> {
        self.data().map(|data| BASE64.encode(data))
    }

    /// Wire discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Symbolic(_) => "symbolic",
            Self::Data(_) => "data",
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ImageRecord {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

impl Serialize for Image {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = match self {
            Self::Symbolic(name) => name.clone(),
            Self::Data(data) => BASE64.encode(data),
        };
        ImageRecord {
            kind: self.kind().to_owned(),
            value,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Image {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = ImageRecord::deserialize(deserializer)?;
        match record.kind.as_str() {
            "symbolic" => Ok(Self::Symbolic(record.value)),
            "data" => BASE64
                .decode(record.value.as_bytes())
                .map(|raw| Self::Data(Bytes::from(raw)))
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "unrecognized image type '{other}'"
            ))),
        }
    }
}

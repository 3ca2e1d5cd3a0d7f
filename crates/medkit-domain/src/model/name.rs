// ── Patient name ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::profile::lenient;

/// Display order for a [`Name`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum NameFormat {
    /// "First Last"
    #[default]
    FirstLast,
    /// "Last, First"
    LastFirst,
}

/// A person's name. Either part may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

impl Name {
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: Some(first.into()),
            last: Some(last.into()),
        }
    }

    /// Render in the given order; missing parts show as `-`.
    pub fn formatted(&self, format: NameFormat) -> String {
        let first = self.first.as_deref().unwrap_or("-");
        let last = self.last.as_deref().unwrap_or("-");
        match format {
            NameFormat::FirstLast => format!("{first} {last}"),
            NameFormat::LastFirst => format!("{last}, {first}"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.last.is_none()
    }

    /// Case-insensitive match against either part.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.first, &self.last]
            .into_iter()
            .flatten()
            .any(|part| part.to_lowercase().contains(&needle))
    }
}

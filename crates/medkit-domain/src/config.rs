// ── Runtime configuration ──
//
// Describes how a `Runtime` presents its entities. Never touches disk:
// `medkit-config` (or any embedding application) builds a `RuntimeConfig`
// and hands it in.

use crate::model::NameFormat;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Order used when rendering patient names.
    pub name_format: NameFormat,
}

impl RuntimeConfig {
    pub fn with_name_format(mut self, name_format: NameFormat) -> Self {
        self.name_format = name_format;
        self
    }
}

//! Configuration records and the user input they are built from.

use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::fmt;

pub const DEFAULT_NAME: &str = "Eufy S1 Pro";

/// Schema version written into every new record
pub const ENTRY_VERSION: u32 = 1;

pub const REDACTED: &str = "**redacted**";

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

/// Values submitted on the `user` setup form.
///
/// `local_key` is persisted as is but never shows up in `Debug` output and
/// therefore never in a log line.
#[derive(Clone, Deserialize, PartialEq, Serialize, Validate)]
pub struct ConfigInput {
    #[serde(default = "default_name")]
    pub name: String,
    #[validate(min_length = 1)]
    pub device_id: String,
    #[validate(min_length = 1)]
    pub local_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl fmt::Debug for ConfigInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigInput")
            .field("name", &self.name)
            .field("device_id", &self.device_id)
            .field("local_key", &REDACTED)
            .field("ip_address", &self.ip_address)
            .finish()
    }
}

impl ConfigInput {
    /// Network address with empty strings treated as absent
    pub fn address(&self) -> Option<&str> {
        self.ip_address.as_deref().filter(|ip| !ip.trim().is_empty())
    }
}

/// Mutable settings attached to a record, replaced as a whole on every edit
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
pub struct EntryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(max_length = 253)]
    pub ip_address: Option<String>,
}

/// Persisted configuration record for one vacuum
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub unique_id: String,
    pub title: String,
    pub version: u32,
    pub data: ConfigInput,
    #[serde(default)]
    pub options: EntryOptions,
}

impl ConfigEntry {
    /// Current network address: the options overlay wins over creation data
    pub fn address(&self) -> Option<&str> {
        self.options
            .ip_address
            .as_deref()
            .or(self.data.ip_address.as_deref())
    }

    /// Copy of the record safe to hand out over the API
    pub fn redacted(&self) -> Self {
        let mut entry = self.clone();
        entry.data.local_key = REDACTED.to_string();
        entry
    }
}

use crate::entry::{ConfigEntry, ConfigInput, ENTRY_VERSION, EntryOptions};
use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::{fs::Permissions, io::ErrorKind, os::unix::fs::PermissionsExt, path::PathBuf};
use tokio::{fs, sync::Mutex};
use trait_variant::make;
use uuid::Uuid;

#[make(Send)]
pub trait RecordStore {
    /// Create a record unless one with `unique_id` exists, as one atomic step.
    /// Returns `None` if the device is already configured.
    async fn create_if_absent(
        &self,
        unique_id: &str,
        title: &str,
        data: &ConfigInput,
    ) -> Result<Option<ConfigEntry>>;
    async fn entry(&self, entry_id: &str) -> Result<Option<ConfigEntry>>;
    async fn entries(&self) -> Result<Vec<ConfigEntry>>;
    /// Replace the whole options sub-record of an entry
    async fn replace_options(&self, entry_id: &str, options: EntryOptions)
    -> Result<ConfigEntry>;
}

/// Record store persisted as one JSON document
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<Vec<ConfigEntry>>,
}

impl JsonFileStore {
    /// Open the store, starting empty if the file does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries: Vec<ConfigEntry> = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .context(format!("failed to parse config entries: {path:?}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e).context(format!("failed to read config entries: {path:?}")),
        };

        info!("loaded {} config entries from {path:?}", entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Write all entries to a sibling file, then rename it into place
    async fn persist(&self, entries: &[ConfigEntry]) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");

        let json =
            serde_json::to_vec_pretty(entries).context("failed to serialize config entries")?;

        fs::write(&tmp_path, json)
            .await
            .context(format!("failed to write config entries: {tmp_path:?}"))?;

        // records hold local keys
        fs::set_permissions(&tmp_path, Permissions::from_mode(0o600))
            .await
            .context(format!("failed to set permissions: {tmp_path:?}"))?;

        fs::rename(&tmp_path, &self.path)
            .await
            .context(format!("failed to rename {tmp_path:?} to {:?}", self.path))?;

        debug!("persisted {} config entries", entries.len());

        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    async fn create_if_absent(
        &self,
        unique_id: &str,
        title: &str,
        data: &ConfigInput,
    ) -> Result<Option<ConfigEntry>> {
        let mut entries = self.entries.lock().await;

        if entries.iter().any(|entry| entry.unique_id == unique_id) {
            info!("device {unique_id} already configured");
            return Ok(None);
        }

        let entry = ConfigEntry {
            entry_id: Uuid::new_v4().to_string(),
            unique_id: unique_id.to_string(),
            title: title.to_string(),
            version: ENTRY_VERSION,
            data: data.clone(),
            options: EntryOptions::default(),
        };

        entries.push(entry.clone());

        if let Err(e) = self.persist(&entries).await {
            entries.pop();
            return Err(e);
        }

        info!("created config entry {} for device {unique_id}", entry.entry_id);

        Ok(Some(entry))
    }

    async fn entry(&self, entry_id: &str) -> Result<Option<ConfigEntry>> {
        let entries = self.entries.lock().await;
        Ok(entries
            .iter()
            .find(|entry| entry.entry_id == entry_id)
            .cloned())
    }

    async fn entries(&self) -> Result<Vec<ConfigEntry>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn replace_options(
        &self,
        entry_id: &str,
        options: EntryOptions,
    ) -> Result<ConfigEntry> {
        let mut entries = self.entries.lock().await;

        let Some(index) = entries.iter().position(|entry| entry.entry_id == entry_id) else {
            bail!("failed to find config entry: {entry_id}");
        };

        let previous = std::mem::replace(&mut entries[index].options, options);

        if let Err(e) = self.persist(&entries).await {
            entries[index].options = previous;
            return Err(e);
        }

        info!("replaced options of config entry {entry_id}");

        Ok(entries[index].clone())
    }
}

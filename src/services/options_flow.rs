//! Options flow service
//!
//! Edits the network address of an existing record. No connectivity check is
//! done here, the submitted options simply replace the stored ones.

use crate::{
    entry::{ConfigEntry, EntryOptions},
    flow::{FlowResult, FormField, FormView, StepId},
    record_store::RecordStore,
};
use anyhow::Result;
use log::info;

/// Options editor bound to one record
pub struct OptionsFlow {
    entry: ConfigEntry,
}

impl OptionsFlow {
    pub fn new(entry: ConfigEntry) -> Self {
        Self { entry }
    }

    pub fn entry_id(&self) -> &str {
        &self.entry.entry_id
    }

    /// The `init` form, pre-filled with the record's current address
    pub fn init_form(&self) -> FormView {
        FormView::new(
            StepId::Init,
            vec![FormField::optional("ip_address").with_default(self.entry.address().unwrap_or(""))],
        )
    }

    /// Handle the `init` step
    ///
    /// # Arguments
    /// * `store` - Record store holding the bound entry
    /// * `user_input` - Submitted options, `None` to show the form
    ///
    /// # Returns
    /// The form, or the options now stored for the entry
    pub async fn step_init<S>(
        &self,
        store: &S,
        user_input: Option<EntryOptions>,
    ) -> Result<FlowResult<EntryOptions>>
    where
        S: RecordStore,
    {
        let Some(options) = user_input else {
            return Ok(FlowResult::Form(self.init_form()));
        };

        info!("replace options of {}: {options:?}", self.entry.entry_id);

        let updated = store.replace_options(self.entry_id(), options).await?;

        Ok(FlowResult::CreateEntry {
            title: String::new(),
            result: updated.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entry::ConfigInput,
        record_store::JsonFileStore,
    };
    use tempfile::TempDir;

    async fn store_with_entry(
        dir: &TempDir,
        ip_address: Option<&str>,
    ) -> (JsonFileStore, ConfigEntry) {
        let store = JsonFileStore::open(dir.path().join("config_entries.json"))
            .await
            .unwrap();
        let input = ConfigInput {
            name: "Vacuum".to_string(),
            device_id: "ABC123".to_string(),
            local_key: "secret".to_string(),
            ip_address: ip_address.map(String::from),
        };
        let entry = store
            .create_if_absent("ABC123", "Vacuum", &input)
            .await
            .unwrap()
            .unwrap();
        (store, entry)
    }

    fn address_default(form: &FormView) -> Option<&str> {
        form.field("ip_address")
            .and_then(|field| field.default.as_deref())
    }

    mod init_form {
        use super::*;

        #[tokio::test]
        async fn prefills_address_from_entry() {
            let dir = TempDir::new().unwrap();
            let (store, entry) = store_with_entry(&dir, Some("10.0.0.2")).await;

            let result = OptionsFlow::new(entry).step_init(&store, None).await.unwrap();

            let FlowResult::Form(form) = result else {
                panic!("expected form");
            };
            assert_eq!(form.step_id, StepId::Init);
            assert_eq!(form.data_schema.len(), 1);
            assert_eq!(address_default(&form), Some("10.0.0.2"));
            assert!(form.errors.is_empty());
        }

        #[tokio::test]
        async fn defaults_to_empty_address() {
            let dir = TempDir::new().unwrap();
            let (_store, entry) = store_with_entry(&dir, None).await;

            let form = OptionsFlow::new(entry).init_form();

            assert_eq!(address_default(&form), Some(""));
        }
    }

    mod submission {
        use super::*;

        #[tokio::test]
        async fn replaces_options_with_submitted_map() {
            let dir = TempDir::new().unwrap();
            let (store, entry) = store_with_entry(&dir, Some("10.0.0.2")).await;
            let submitted = EntryOptions {
                ip_address: Some("192.168.1.50".to_string()),
            };

            let result = OptionsFlow::new(entry.clone())
                .step_init(&store, Some(submitted.clone()))
                .await
                .unwrap();

            assert_eq!(
                result,
                FlowResult::CreateEntry {
                    title: String::new(),
                    result: submitted.clone(),
                }
            );
            let stored = store.entry(&entry.entry_id).await.unwrap().unwrap();
            assert_eq!(stored.options, submitted);
            assert_eq!(stored.address(), Some("192.168.1.50"));
        }

        #[tokio::test]
        async fn empty_submission_clears_previous_options() {
            let dir = TempDir::new().unwrap();
            let (store, entry) = store_with_entry(&dir, None).await;
            let flow = OptionsFlow::new(entry.clone());

            flow.step_init(
                &store,
                Some(EntryOptions {
                    ip_address: Some("192.168.1.50".to_string()),
                }),
            )
            .await
            .unwrap();
            flow.step_init(&store, Some(EntryOptions::default()))
                .await
                .unwrap();

            let stored = store.entry(&entry.entry_id).await.unwrap().unwrap();
            assert_eq!(stored.options, EntryOptions::default());
        }
    }
}

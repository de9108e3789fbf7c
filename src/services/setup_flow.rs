//! Setup flow service
//!
//! Drives the `user` step: show the form, validate a submission against the
//! device and create the record, or show the form again with an error tag.

use crate::{
    device_coordinator::{CoordinatorFactory, RuntimeContext},
    entry::{ConfigEntry, ConfigInput, DEFAULT_NAME},
    flow::{AbortReason, FlowError, FlowResult, FormField, FormView, StepId},
    record_store::RecordStore,
    services::{
        options_flow::OptionsFlow,
        validation::{ValidationError, validate_input},
    },
};
use anyhow::Result;
use log::{error, info};

/// Service for the initial setup of a vacuum
pub struct SetupFlowService;

impl SetupFlowService {
    /// Build the `user` form
    ///
    /// # Arguments
    /// * `setup_url` - Documentation link shown with the form
    /// * `previous` - Values of a failed submission to pre-fill, if any
    pub fn user_form(setup_url: &str, previous: Option<&ConfigInput>) -> FormView {
        let name = previous.map(|input| input.name.as_str());
        let device_id = previous.map(|input| input.device_id.as_str());
        let ip_address = previous.and_then(|input| input.ip_address.as_deref());

        FormView::new(
            StepId::User,
            vec![
                FormField::required("name")
                    .with_default(DEFAULT_NAME)
                    .with_suggested(name),
                FormField::required("device_id").with_suggested(device_id),
                FormField::required("local_key").secret(),
                FormField::optional("ip_address").with_suggested(ip_address),
            ],
        )
        .with_placeholder("setup_url", setup_url)
    }

    /// Handle the `user` step
    ///
    /// # Arguments
    /// * `store` - Record store the new entry is created in
    /// * `factory` - Builds the coordinator used to validate the input
    /// * `runtime` - Runtime handle passed to the coordinator
    /// * `setup_url` - Documentation link shown with the form
    /// * `user_input` - Submitted values, `None` to show the empty form
    ///
    /// # Returns
    /// The form (possibly with an error tag), the created entry, or an abort
    /// if the device is already configured. Only record store failures are
    /// returned as errors.
    pub async fn step_user<S, F>(
        store: &S,
        factory: &F,
        runtime: &RuntimeContext,
        setup_url: &str,
        user_input: Option<ConfigInput>,
    ) -> Result<FlowResult<ConfigEntry>>
    where
        S: RecordStore,
        F: CoordinatorFactory,
    {
        let Some(input) = user_input else {
            return Ok(FlowResult::Form(Self::user_form(setup_url, None)));
        };

        let error = match validate_input(runtime, factory, &input).await {
            Ok(info) => {
                return match store
                    .create_if_absent(&info.device_id, &info.title, &input)
                    .await?
                {
                    Some(entry) => Ok(FlowResult::CreateEntry {
                        title: entry.title.clone(),
                        result: entry,
                    }),
                    None => Ok(FlowResult::Abort {
                        reason: AbortReason::AlreadyConfigured,
                    }),
                };
            }
            Err(ValidationError::CannotConnect(_)) => FlowError::CannotConnect,
            Err(ValidationError::InvalidAuth(_)) => FlowError::InvalidAuth,
            Err(e @ ValidationError::Unknown(_)) => {
                error!("unexpected exception while validating {}: {e}", input.device_id);
                FlowError::Unknown
            }
        };

        info!("setup of {} failed: {error:?}", input.device_id);

        Ok(FlowResult::Form(
            Self::user_form(setup_url, Some(&input)).with_base_error(error),
        ))
    }

    /// Create the options flow bound to `entry`
    pub fn options_flow(entry: ConfigEntry) -> OptionsFlow {
        OptionsFlow::new(entry)
    }
}

//! Input validation service
//!
//! Proves submitted credentials work by running one refresh through a
//! throwaway device coordinator.

use crate::{
    device_coordinator::{
        CoordinatorFactory, DeviceCoordinator, DeviceCredentials, DeviceError, RuntimeContext,
    },
    entry::ConfigInput,
};
use futures_util::FutureExt;
use log::{error, warn};
use std::{any::Any, panic::AssertUnwindSafe};
use thiserror::Error;

/// What a successful validation hands back to the setup flow
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedDevice {
    pub title: String,
    pub device_id: String,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cannot connect to device")]
    CannotConnect(#[source] DeviceError),
    #[error("invalid authentication")]
    InvalidAuth(#[source] DeviceError),
    #[error("unexpected validation failure: {0}")]
    Unknown(String),
}

/// Validate that the user input allows us to connect
///
/// # Arguments
/// * `runtime` - Runtime handle passed through to the coordinator
/// * `factory` - Builds the temporary coordinator
/// * `input` - Submitted setup values
///
/// # Returns
/// Title and device id for the new record, or the classified failure
pub async fn validate_input<F>(
    runtime: &RuntimeContext,
    factory: &F,
    input: &ConfigInput,
) -> Result<ValidatedDevice, ValidationError>
where
    F: CoordinatorFactory,
{
    AssertUnwindSafe(try_connect(runtime, factory, input))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(ValidationError::Unknown(panic_message(&*panic))))
}

async fn try_connect<F>(
    runtime: &RuntimeContext,
    factory: &F,
    input: &ConfigInput,
) -> Result<ValidatedDevice, ValidationError>
where
    F: CoordinatorFactory,
{
    let credentials = DeviceCredentials {
        device_id: input.device_id.clone(),
        local_key: input.local_key.clone(),
        ip_address: input.address().map(String::from),
    };

    let coordinator = factory.create(runtime, &credentials).map_err(classify)?;

    let refreshed = coordinator.first_refresh().await;

    // released on every path once constructed
    if let Err(e) = coordinator.disconnect().await {
        warn!("failed to disconnect from {}: {e:#}", input.device_id);
    }

    refreshed.map_err(classify)?;

    Ok(ValidatedDevice {
        title: input.name.clone(),
        device_id: input.device_id.clone(),
    })
}

fn classify(err: DeviceError) -> ValidationError {
    error!("failed to connect to vacuum: {err}");

    let invalid_auth = match &err {
        DeviceError::Auth(_) => true,
        DeviceError::Connect(_) => false,
        DeviceError::Other(message) => mentions_credentials(message),
    };

    if invalid_auth {
        ValidationError::InvalidAuth(err)
    } else {
        ValidationError::CannotConnect(err)
    }
}

/// Untyped coordinator errors are sorted by keyword
fn mentions_credentials(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("auth") || message.contains("key")
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "coordinator panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_coordinator::MockDeviceCoordinator;
    use std::time::Duration;

    fn runtime() -> RuntimeContext {
        RuntimeContext {
            device_port: 6668,
            connect_timeout: Duration::from_secs(1),
        }
    }

    fn input() -> ConfigInput {
        ConfigInput {
            name: "Vacuum".to_string(),
            device_id: "ABC123".to_string(),
            local_key: "secret".to_string(),
            ip_address: None,
        }
    }

    fn coordinator(
        refresh: fn() -> Result<(), DeviceError>,
        disconnect_calls: usize,
    ) -> MockDeviceCoordinator {
        let mut mock = MockDeviceCoordinator::new();
        mock.expect_first_refresh()
            .times(1)
            .returning(move || Box::pin(async move { refresh() }));
        mock.expect_disconnect()
            .times(disconnect_calls)
            .returning(|| Box::pin(async { Ok(()) }));
        mock
    }

    mod success {
        use super::*;

        #[tokio::test]
        async fn returns_title_and_device_id() {
            let factory = |_: &RuntimeContext, _: &DeviceCredentials| {
                Ok::<_, DeviceError>(coordinator(|| Ok(()), 1))
            };

            let validated = validate_input(&runtime(), &factory, &input())
                .await
                .unwrap();

            assert_eq!(
                validated,
                ValidatedDevice {
                    title: "Vacuum".to_string(),
                    device_id: "ABC123".to_string(),
                }
            );
        }

        #[tokio::test]
        async fn passes_credentials_to_factory() {
            let factory = |_: &RuntimeContext, credentials: &DeviceCredentials| {
                assert_eq!(credentials.device_id, "ABC123");
                assert_eq!(credentials.local_key, "secret");
                assert_eq!(credentials.ip_address.as_deref(), Some("10.0.0.2"));
                Ok::<_, DeviceError>(coordinator(|| Ok(()), 1))
            };

            let mut input = input();
            input.ip_address = Some("10.0.0.2".to_string());

            assert!(validate_input(&runtime(), &factory, &input).await.is_ok());
        }

        #[tokio::test]
        async fn failed_disconnect_does_not_fail_validation() {
            let factory = |_: &RuntimeContext, _: &DeviceCredentials| {
                let mut mock = MockDeviceCoordinator::new();
                mock.expect_first_refresh()
                    .returning(|| Box::pin(async { Ok(()) }));
                mock.expect_disconnect()
                    .times(1)
                    .returning(|| Box::pin(async { Err(anyhow::anyhow!("socket gone")) }));
                Ok::<_, DeviceError>(mock)
            };

            assert!(validate_input(&runtime(), &factory, &input()).await.is_ok());
        }
    }

    mod classification {
        use super::*;

        fn corrupted_state() -> DeviceError {
            panic!("coordinator state corrupted")
        }

        async fn validate_with(
            refresh: fn() -> Result<(), DeviceError>,
        ) -> Result<ValidatedDevice, ValidationError> {
            let factory = move |_: &RuntimeContext, _: &DeviceCredentials| {
                Ok::<_, DeviceError>(coordinator(refresh, 1))
            };
            validate_input(&runtime(), &factory, &input()).await
        }

        #[tokio::test]
        async fn message_mentioning_key_is_invalid_auth() {
            let result =
                validate_with(|| Err(DeviceError::Other("Invalid key provided".to_string())))
                    .await;
            assert!(matches!(result, Err(ValidationError::InvalidAuth(_))));
        }

        #[tokio::test]
        async fn keyword_match_ignores_case() {
            let result =
                validate_with(|| Err(DeviceError::Other("AUTHORIZATION REJECTED".to_string())))
                    .await;
            assert!(matches!(result, Err(ValidationError::InvalidAuth(_))));
        }

        #[tokio::test]
        async fn other_message_is_cannot_connect() {
            let result =
                validate_with(|| Err(DeviceError::Other("host unreachable".to_string()))).await;
            assert!(matches!(result, Err(ValidationError::CannotConnect(_))));
        }

        #[tokio::test]
        async fn typed_auth_error_is_invalid_auth() {
            let result =
                validate_with(|| Err(DeviceError::Auth("handshake rejected".to_string()))).await;
            assert!(matches!(result, Err(ValidationError::InvalidAuth(_))));
        }

        #[tokio::test]
        async fn typed_connect_error_wins_over_keywords() {
            let result =
                validate_with(|| Err(DeviceError::Connect("keyboard interrupt".to_string())))
                    .await;
            assert!(matches!(result, Err(ValidationError::CannotConnect(_))));
        }

        #[tokio::test]
        async fn original_error_is_kept_as_source() {
            let result =
                validate_with(|| Err(DeviceError::Other("host unreachable".to_string()))).await;

            let err = result.unwrap_err();
            let source = std::error::Error::source(&err).map(|s| s.to_string());
            assert_eq!(source.as_deref(), Some("host unreachable"));
        }

        #[tokio::test]
        async fn failed_construction_never_disconnects() {
            let factory = |_: &RuntimeContext, _: &DeviceCredentials| {
                Err::<MockDeviceCoordinator, _>(DeviceError::Auth("bad key".to_string()))
            };

            let result = validate_input(&runtime(), &factory, &input()).await;
            assert!(matches!(result, Err(ValidationError::InvalidAuth(_))));
        }

        #[tokio::test]
        async fn panicking_coordinator_is_unknown() {
            let factory = |_: &RuntimeContext, _: &DeviceCredentials| {
                let mut mock = MockDeviceCoordinator::new();
                mock.expect_first_refresh()
                    .returning(|| Box::pin(async { Err(corrupted_state()) }));
                Ok::<_, DeviceError>(mock)
            };

            let result = validate_input(&runtime(), &factory, &input()).await;
            assert!(
                matches!(result, Err(ValidationError::Unknown(ref msg)) if msg.contains("corrupted"))
            );
        }
    }

    mod teardown {
        use super::*;

        #[tokio::test]
        async fn disconnects_after_failed_refresh() {
            let factory = |_: &RuntimeContext, _: &DeviceCredentials| {
                Ok::<_, DeviceError>(coordinator(
                    || Err(DeviceError::Connect("timed out".to_string())),
                    1,
                ))
            };

            let result = validate_input(&runtime(), &factory, &input()).await;
            assert!(matches!(result, Err(ValidationError::CannotConnect(_))));
        }
    }
}

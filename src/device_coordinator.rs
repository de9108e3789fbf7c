use crate::config::DeviceConfig;
use anyhow::{Context, Result};
use log::{debug, info};
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use std::{fmt, time::Duration};
use thiserror::Error;
use tokio::{io::AsyncWriteExt, net::TcpStream, sync::Mutex, time::timeout};
use trait_variant::make;

/// Runtime handle every coordinator is built with
#[derive(Clone, Debug)]
pub struct RuntimeContext {
    pub device_port: u16,
    pub connect_timeout: Duration,
}

impl From<&DeviceConfig> for RuntimeContext {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            device_port: config.port,
            connect_timeout: config.connect_timeout,
        }
    }
}

/// What a coordinator needs to reach one vacuum
#[derive(Clone)]
pub struct DeviceCredentials {
    pub device_id: String,
    pub local_key: String,
    pub ip_address: Option<String>,
}

impl fmt::Debug for DeviceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredentials")
            .field("device_id", &self.device_id)
            .field("local_key", &crate::entry::REDACTED)
            .field("ip_address", &self.ip_address)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait DeviceCoordinator {
    /// Establish a session with the device and fetch its first state
    async fn first_refresh(&self) -> Result<(), DeviceError>;
    async fn disconnect(&self) -> Result<()>;
}

/// Builds a fresh coordinator for every validation attempt
pub trait CoordinatorFactory {
    type Coordinator: DeviceCoordinator;

    fn create(
        &self,
        runtime: &RuntimeContext,
        credentials: &DeviceCredentials,
    ) -> Result<Self::Coordinator, DeviceError>;
}

impl<F, C> CoordinatorFactory for F
where
    F: Fn(&RuntimeContext, &DeviceCredentials) -> Result<C, DeviceError>,
    C: DeviceCoordinator,
{
    type Coordinator = C;

    fn create(
        &self,
        runtime: &RuntimeContext,
        credentials: &DeviceCredentials,
    ) -> Result<C, DeviceError> {
        self(runtime, credentials)
    }
}

/// Coordinator talking to the vacuum's local TCP endpoint
pub struct LocalCoordinator {
    device_id: String,
    address: Option<String>,
    port: u16,
    connect_timeout: Duration,
    session: Mutex<Option<TcpStream>>,
}

impl LocalCoordinator {
    const LOCAL_KEY_LEN: usize = 16;

    pub fn new(
        runtime: &RuntimeContext,
        credentials: &DeviceCredentials,
    ) -> Result<Self, DeviceError> {
        if credentials.local_key.len() != Self::LOCAL_KEY_LEN {
            return Err(DeviceError::Auth(format!(
                "local key must be {} bytes long",
                Self::LOCAL_KEY_LEN
            )));
        }

        Ok(Self {
            device_id: credentials.device_id.clone(),
            address: credentials
                .ip_address
                .as_deref()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(String::from),
            port: runtime.device_port,
            connect_timeout: runtime.connect_timeout,
            session: Mutex::new(None),
        })
    }
}

impl DeviceCoordinator for LocalCoordinator {
    async fn first_refresh(&self) -> Result<(), DeviceError> {
        let Some(address) = &self.address else {
            return Err(DeviceError::Connect(format!(
                "no network address configured for device {}",
                self.device_id
            )));
        };

        info!("connecting to device {} at {address}:{}", self.device_id, self.port);

        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((address.as_str(), self.port)),
        )
        .await
        .map_err(|_| {
            DeviceError::Connect(format!(
                "timed out after {}s connecting to {address}:{}",
                self.connect_timeout.as_secs(),
                self.port
            ))
        })?
        .map_err(|e| DeviceError::Connect(format!("{address}:{}: {e}", self.port)))?;

        *self.session.lock().await = Some(stream);

        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(mut stream) = self.session.lock().await.take() {
            debug!("closing session to device {}", self.device_id);
            stream
                .shutdown()
                .await
                .context("failed to close device session")?;
        }
        Ok(())
    }
}

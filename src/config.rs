use anyhow::{Context, Result};
use std::{env, path::PathBuf, time::Duration};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// UI server configuration
    pub ui: UiConfig,

    /// Local device access configuration handed to coordinators
    pub device: DeviceConfig,

    /// Path configuration
    pub paths: PathConfig,

    /// Documentation link shown on the setup form
    pub setup_url: String,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DeviceConfig {
    pub port: u16,
    pub connect_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct PathConfig {
    pub data_dir: PathBuf,
    pub entries_file: PathBuf,
}

impl AppConfig {
    pub const DEFAULT_SETUP_URL: &str =
        "https://github.com/yourrepo/eufy-s1-pro-homeassistant#setup";

    /// Load and validate all configuration from environment variables
    pub fn load() -> Result<Self> {
        let ui = UiConfig::load()?;
        let device = DeviceConfig::load()?;
        let paths = PathConfig::load()?;
        let setup_url =
            env::var("SETUP_URL").unwrap_or_else(|_| Self::DEFAULT_SETUP_URL.to_string());

        Ok(Self {
            ui,
            device,
            paths,
            setup_url,
        })
    }
}

impl UiConfig {
    fn load() -> Result<Self> {
        let port = env::var("UI_PORT")
            .unwrap_or_else(|_| "8099".to_string())
            .parse::<u16>()
            .context("failed to parse UI_PORT: invalid format")?;

        Ok(Self { port })
    }
}

impl DeviceConfig {
    fn load() -> Result<Self> {
        let port = env::var("DEVICE_PORT")
            .unwrap_or_else(|_| "6668".to_string())
            .parse::<u16>()
            .context("failed to parse DEVICE_PORT: invalid format")?;

        let timeout_secs = env::var("DEVICE_CONNECT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .context("failed to parse DEVICE_CONNECT_TIMEOUT_SECS: invalid format")?;

        anyhow::ensure!(
            timeout_secs > 0,
            "failed to parse DEVICE_CONNECT_TIMEOUT_SECS: must be greater than zero"
        );

        Ok(Self {
            port,
            connect_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl PathConfig {
    fn load() -> Result<Self> {
        let data_dir = Self::data_dir();

        std::fs::create_dir_all(&data_dir).context("failed to create data directory")?;

        let entries_file = data_dir.join("config_entries.json");

        Ok(Self {
            data_dir,
            entries_file,
        })
    }

    #[cfg(not(any(test, feature = "mock")))]
    fn data_dir() -> PathBuf {
        env::var("DATA_DIR")
            .unwrap_or_else(|_| "/data".to_string())
            .into()
    }

    // In test mode, use temp directory as default to avoid /data requirement
    #[cfg(any(test, feature = "mock"))]
    fn data_dir() -> PathBuf {
        env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("eufy-setup-test"))
    }
}

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::stt::ConnectionTimeouts;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stt: SttConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub host: String,
    pub port: u16,
    pub language: String,
    pub denoise: bool,
    pub connect_timeout_secs: u64,
    pub io_timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7269,
            language: "en".to_string(),
            denoise: true,
            connect_timeout_secs: 10,
            io_timeout_secs: 30,
        }
    }
}

impl SttConfig {
    pub fn timeouts(&self) -> ConnectionTimeouts {
        ConnectionTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            io: Duration::from_secs(self.io_timeout_secs),
        }
    }
}

impl Config {
    /// Load configuration from `<path>.toml` (or any format the config
    /// crate recognizes). A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stt: SttConfig::default(),
        }
    }
}

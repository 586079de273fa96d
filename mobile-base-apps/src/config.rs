use std::{path::Path, time::Duration};

use mobile_base::MobileBaseConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;

/// Settings of the command line tools.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MobileBaseAppConfig {
    /// gRPC endpoint serving the `Utility`, `Mobility` and `Lidar` services.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_connect_timeout_sec")]
    pub connect_timeout_sec: f64,
    #[serde(default)]
    pub mobile_base: MobileBaseConfig,
}

impl Default for MobileBaseAppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connect_timeout_sec: default_connect_timeout_sec(),
            mobile_base: MobileBaseConfig::default(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:50061".to_owned()
}

fn default_connect_timeout_sec() -> f64 {
    5.0
}

impl MobileBaseAppConfig {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_str(
            &std::fs::read_to_string(&path)
                .map_err(|e| Error::NoFile(path.as_ref().to_owned(), e))?,
            &path,
        )
    }

    pub fn from_str<P: AsRef<Path>>(s: &str, path: P) -> Result<Self, Error> {
        let config: MobileBaseAppConfig =
            toml::from_str(s).map_err(|e| Error::TomlParseFailure(path.as_ref().to_owned(), e))?;
        config.mobile_base.validate()?;
        debug!(?config, "loaded config");
        Ok(config)
    }

    pub fn connect_timeout(&self) -> Result<Duration, Error> {
        Duration::try_from_secs_f64(self.connect_timeout_sec).map_err(|e| {
            Error::InvalidArgument(format!(
                "connect_timeout_sec={} ({e})",
                self.connect_timeout_sec
            ))
        })
    }
}

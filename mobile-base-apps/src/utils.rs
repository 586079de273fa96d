use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::{Error, MobileBaseAppConfig};

const MOBILE_BASE_CONFIG_ENV_NAME: &str = "MOBILE_BASE_CONFIG_PATH";

/// Get config path from input or env MOBILE_BASE_CONFIG_PATH
pub fn get_config_path(config: Option<PathBuf>) -> Option<PathBuf> {
    if config.is_some() {
        config
    } else {
        std::env::var(MOBILE_BASE_CONFIG_ENV_NAME)
            .map(|s| {
                warn!("### ENV VAR {} is used ###", s);
                PathBuf::from(s)
            })
            .ok()
    }
}

/// Loads the config at `path`, or the default config if `path` is `None`.
pub fn resolve_config(path: Option<&Path>) -> Result<MobileBaseAppConfig, Error> {
    match path {
        Some(path) => MobileBaseAppConfig::new(path),
        None => Ok(MobileBaseAppConfig::default()),
    }
}

/// Installs a stderr subscriber filtered by `RUST_LOG`, `info` if unset.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_config_path() {
        let path = get_config_path(Some(PathBuf::from("a.toml")));
        assert!(path.is_some());
        assert_eq!(path.unwrap(), PathBuf::from("a.toml"));
        //
        std::env::set_var(MOBILE_BASE_CONFIG_ENV_NAME, "b.toml");
        let path = get_config_path(Some(PathBuf::from("a.toml")));
        assert!(path.is_some());
        assert_eq!(path.unwrap(), PathBuf::from("a.toml"));
        std::env::remove_var(MOBILE_BASE_CONFIG_ENV_NAME);

        let path = get_config_path(None);
        assert!(path.is_none());

        std::env::set_var(MOBILE_BASE_CONFIG_ENV_NAME, "b.toml");
        let path = get_config_path(None);
        assert!(path.is_some());
        assert_eq!(path.unwrap(), PathBuf::from("b.toml"));
        std::env::remove_var(MOBILE_BASE_CONFIG_ENV_NAME);
    }

    #[test]
    fn test_resolve_default() {
        assert_eq!(resolve_config(None).unwrap(), MobileBaseAppConfig::default());
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("mobile-base-apps: No command is specified.")]
    NoCommand,
    #[error("mobile-base-apps: Failed to parse {:?} as toml ({}).", .0, .1)]
    TomlParseFailure(PathBuf, #[source] toml::de::Error),
    #[error("mobile-base-apps: No File {:?} is found ({}).", .0, .1)]
    NoFile(PathBuf, #[source] std::io::Error),
    #[error("mobile-base-apps: Failed to write {:?} ({}).", .0, .1)]
    WriteFailure(PathBuf, #[source] std::io::Error),
    #[error("mobile-base-apps: Invalid argument : {}", .0)]
    InvalidArgument(String),
    #[error("mobile-base-apps: Could not connect to {} within {:?}.", .0, .1)]
    ConnectTimeout(String, std::time::Duration),
    #[error("mobile-base-apps: {}", .0)]
    MobileBase(#[from] mobile_base::Error),
}

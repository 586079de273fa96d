use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("mobile-base: Out of range: {}={} exceeds the limit of ±{}", name, value, limit)]
    OutOfRange {
        name: String,
        value: f64,
        limit: f64,
    },
    #[error("mobile-base: Not finite: {}={}", name, value)]
    NotFinite { name: String, value: f64 },
    #[error("mobile-base: Invalid mode : {}", message)]
    InvalidMode { message: String },
    #[error("mobile-base: The base is off (free wheel), turn it on before sending a goal")]
    BaseOff,
    #[error("mobile-base: A goal session is already in progress")]
    SessionInProgress,
    #[error("mobile-base: Invalid tolerance: {}={} must be non-negative", name, value)]
    InvalidTolerance { name: String, value: f64 },
    #[error("mobile-base: Invalid config : {}", .0)]
    InvalidConfig(String),
    #[error("mobile-base: Remote call {} failed : {}", method, message)]
    RemoteCall {
        method: &'static str,
        message: String,
    },
    #[error("mobile-base: Connection error : {}", message)]
    Connection { message: String },
    #[error("mobile-base: Other: {:?}", .0)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn undecodable(method: &'static str, what: &str, index: i32) -> Self {
        Self::RemoteCall {
            method,
            message: format!("unknown {what} index {index}"),
        }
    }
}

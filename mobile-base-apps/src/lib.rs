mod command;
mod config;
mod error;
pub mod utils;

pub use command::*;
pub use config::*;
pub use error::*;

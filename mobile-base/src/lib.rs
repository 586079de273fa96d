//! Control client for a remote wheeled mobile base.
//!
//! [`MobileBase`] validates and dispatches velocity and goal commands, keeps a
//! local mirror of the base's drive and control modes and of its lidar safety
//! settings, and supervises goals until arrival, timeout, an obstacle stop or
//! cancellation. The remote services are abstracted by the [`Utility`],
//! [`Mobility`] and [`Lidar`] traits.

mod base;
mod cache;
mod clients;
mod config;
mod error;
mod goal;
mod modes;
mod pursuit;
mod safety;
mod session;
mod traits;
mod units;

pub use base::*;
pub use cache::*;
pub use clients::*;
pub use config::*;
pub use error::*;
pub use goal::*;
pub use modes::*;
pub use safety::*;
pub use session::CancelToken;
pub use traits::*;
pub use units::{deg_to_rad, rad_to_deg, round_to, validate_magnitude, LENGTH_DECIMALS, VOLTAGE_DECIMALS};

// re-export
pub use nalgebra::{self, Isometry2};

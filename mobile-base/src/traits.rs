mod lidar;
mod mobility;
mod utility;

pub use lidar::*;
pub use mobility::*;
pub use utility::*;

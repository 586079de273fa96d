mod dummy_lidar;
mod dummy_mobility;
mod dummy_utility;

pub use dummy_lidar::*;
pub use dummy_mobility::*;
pub use dummy_utility::*;

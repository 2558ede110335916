//! Data models for locations and devices

mod device;
mod location;

pub use device::*;
pub use location::*;

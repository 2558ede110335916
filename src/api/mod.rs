//! API client module for the Resideo device API

pub mod client;
mod locations;
pub mod thermostat;

pub use client::ResideoClient;
pub use thermostat::FanMode;

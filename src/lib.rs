//! Resideo CLI - client for Resideo / Honeywell Home thermostats
//!
//! OAuth2 authorization-code login, proactive token refresh and the
//! thermostat subset of the device API.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;

pub use api::{FanMode, ResideoClient};
pub use auth::{Credentials, Endpoints, FileTokenStore, TokenRecord, TokenStore};
pub use error::{Error, Result};

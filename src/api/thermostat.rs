//! Thermostat status and control

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde_json::{json, Map, Value};

use super::client::ResideoClient;
use crate::error::{Error, Result};
use crate::models::find_device;

/// Keeps new setpoints until changed, instead of the next schedule period.
pub const PERMANENT_HOLD: &str = "PermanentHold";

/// Fan behavior accepted by the fan endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    Auto,
    On,
    Circulate,
}

impl FanMode {
    pub const ALL: [FanMode; 3] = [FanMode::Auto, FanMode::On, FanMode::Circulate];

    /// Wire name, title-cased.
    pub fn as_str(&self) -> &'static str {
        match self {
            FanMode::Auto => "Auto",
            FanMode::On => "On",
            FanMode::Circulate => "Circulate",
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(FanMode::Auto),
            "on" => Ok(FanMode::On),
            "circulate" => Ok(FanMode::Circulate),
            _ => Err(Error::Validation(format!(
                "Invalid fan mode '{}'. Valid modes: auto, on, circulate",
                s
            ))),
        }
    }
}

fn thermostat_path(device_id: &str, location_id: i64) -> String {
    format!("/devices/thermostats/{}?locationId={}", device_id, location_id)
}

/// Whole degrees go out as integers, matching what the API reports.
fn setpoint_value(degrees: f64) -> Value {
    if degrees.fract() == 0.0 && degrees.abs() < 1e15 {
        json!(degrees as i64)
    } else {
        json!(degrees)
    }
}

/// Copy of `current` with the mode set, the supplied setpoints
/// overwritten and the hold made permanent. Omitted setpoints keep their
/// existing values.
pub fn setpoint_change(
    current: &Map<String, Value>,
    mode: &str,
    heat_setpoint: Option<f64>,
    cool_setpoint: Option<f64>,
) -> Map<String, Value> {
    let mut values = current.clone();
    values.insert("mode".into(), json!(mode));
    if let Some(heat) = heat_setpoint {
        values.insert("heatSetpoint".into(), setpoint_value(heat));
    }
    if let Some(cool) = cool_setpoint {
        values.insert("coolSetpoint".into(), setpoint_value(cool));
    }
    values.insert("thermostatSetpointStatus".into(), json!(PERMANENT_HOLD));
    values
}

impl ResideoClient {
    /// Current state of one thermostat.
    pub async fn get_thermostat_status(&self, device_id: &str, location_id: i64) -> Result<Value> {
        self.call(Method::GET, &thermostat_path(device_id, location_id), None)
            .await
    }

    /// Post a settings body as-is. Callers are responsible for its shape.
    pub async fn set_thermostat_settings(
        &self,
        device_id: &str,
        location_id: i64,
        settings: &Value,
    ) -> Result<Value> {
        let path = thermostat_path(device_id, location_id);
        tracing::debug!("Thermostat settings for {}: {}", device_id, settings);
        self.call(Method::POST, &path, Some(settings)).await
    }

    /// Change mode and, optionally, setpoints, as a permanent hold.
    ///
    /// The device's current `changeableValues` are read and sent back
    /// with only the requested fields changed; the API rejects partial
    /// bodies.
    pub async fn set_temperature(
        &self,
        device_id: &str,
        mode: &str,
        heat_setpoint: Option<f64>,
        cool_setpoint: Option<f64>,
        location_id: Option<i64>,
    ) -> Result<Value> {
        let location_id = self.resolve_location(location_id).await?;

        let locations = self.get_locations().await?;
        let device = find_device(&locations, device_id)
            .ok_or_else(|| Error::Validation(format!("Thermostat {} not found", device_id)))?;

        let values = setpoint_change(
            &device.changeable_values,
            mode,
            heat_setpoint,
            cool_setpoint,
        );
        self.set_thermostat_settings(device_id, location_id, &Value::Object(values))
            .await
    }

    /// Set the fan mode (`auto`, `on` or `circulate`, any case).
    pub async fn set_fan_mode(
        &self,
        device_id: &str,
        fan_mode: &str,
        location_id: Option<i64>,
    ) -> Result<Value> {
        let fan_mode: FanMode = fan_mode.parse()?;
        let location_id = self.resolve_location(location_id).await?;

        let path = format!(
            "/devices/thermostats/{}/fan?locationId={}",
            device_id, location_id
        );
        self.call(Method::POST, &path, Some(&json!({ "mode": fan_mode.as_str() })))
            .await
    }
}

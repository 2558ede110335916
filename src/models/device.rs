//! Device model

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Value of `deviceType` / `deviceClass` that marks a thermostat
pub const THERMOSTAT_MARKER: &str = "Thermostat";

/// A device as embedded in a location listing.
///
/// Only the fields the client reads are typed; everything else the
/// vendor sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(rename = "deviceID", default)]
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_defined_device_name: Option<String>,
    /// Settings bag the API expects back verbatim on update. Sensors
    /// report `null` here.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub changeable_values: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Device {
    pub fn is_thermostat(&self) -> bool {
        self.device_type.as_deref() == Some(THERMOSTAT_MARKER)
            || self.device_class.as_deref() == Some(THERMOSTAT_MARKER)
    }

    /// User-assigned name, falling back to the device ID.
    pub fn display_name(&self) -> &str {
        self.user_defined_device_name
            .as_deref()
            .unwrap_or(&self.device_id)
    }
}

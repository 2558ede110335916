//! Location and device discovery

use reqwest::Method;

use super::client::ResideoClient;
use crate::error::{Error, Result};
use crate::models::{Device, Location};

impl ResideoClient {
    /// All locations on the account, devices embedded.
    pub async fn get_locations(&self) -> Result<Vec<Location>> {
        let value = self.call(Method::GET, "/locations", None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Every device across all locations, in location order.
    pub async fn get_all_devices(&self) -> Result<Vec<Device>> {
        let locations = self.get_locations().await?;
        Ok(locations.into_iter().flat_map(|loc| loc.devices).collect())
    }

    /// Thermostats only. A failed lookup yields an empty list rather
    /// than an error.
    pub async fn get_thermostats(&self) -> Vec<Device> {
        match self.get_all_devices().await {
            Ok(devices) => devices.into_iter().filter(Device::is_thermostat).collect(),
            Err(e) => {
                tracing::warn!("Thermostat discovery failed: {}", e);
                Vec::new()
            }
        }
    }

    /// The given location, or the account's first one.
    pub(crate) async fn resolve_location(&self, location_id: Option<i64>) -> Result<i64> {
        if let Some(id) = location_id {
            return Ok(id);
        }
        let locations = self.get_locations().await?;
        locations
            .first()
            .map(|loc| loc.location_id)
            .ok_or_else(|| Error::Validation("No locations found on this account".into()))
    }
}

#[cfg(test)]
mod tests {
    use crate::api::client::tests::setup;
    use crate::error::Error;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_locations(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v2/locations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn two_locations() -> serde_json::Value {
        json!([
            {
                "locationID": 1,
                "name": "Home",
                "devices": [
                    { "deviceID": "T1", "deviceClass": "Thermostat" },
                    { "deviceID": "W1", "deviceClass": "LeakDetector" }
                ]
            },
            {
                "locationID": 2,
                "name": "Cabin",
                "devices": [
                    { "deviceID": "T2", "deviceType": "Thermostat" }
                ]
            }
        ])
    }

    #[tokio::test]
    async fn test_get_locations() {
        let (server, client) = setup().await;
        mount_locations(&server, two_locations()).await;

        let locations = client.get_locations().await.unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[1].name.as_deref(), Some("Cabin"));
    }

    #[tokio::test]
    async fn test_all_devices_preserve_order() {
        let (server, client) = setup().await;
        mount_locations(&server, two_locations()).await;

        let ids: Vec<String> = client
            .get_all_devices()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.device_id)
            .collect();
        assert_eq!(ids, ["T1", "W1", "T2"]);
    }

    #[tokio::test]
    async fn test_all_devices_propagates_error() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/v2/locations"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client.get_all_devices().await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503: down");
    }

    #[tokio::test]
    async fn test_thermostats_filtered() {
        let (server, client) = setup().await;
        mount_locations(&server, two_locations()).await;

        let ids: Vec<String> = client
            .get_thermostats()
            .await
            .into_iter()
            .map(|d| d.device_id)
            .collect();
        assert_eq!(ids, ["T1", "T2"]);
    }

    #[tokio::test]
    async fn test_thermostats_despite_sensor_without_settings() {
        let (server, client) = setup().await;
        mount_locations(
            &server,
            json!([{
                "locationID": "1",
                "streetAddress": "1 Main",
                "devices": [
                    { "deviceID": "W1", "deviceClass": "LeakDetector", "changeableValues": null },
                    { "deviceID": "T1", "deviceClass": "Thermostat",
                      "changeableValues": { "mode": "Off" } }
                ]
            }]),
        )
        .await;

        let locations = client.get_locations().await.unwrap();
        assert_eq!(locations[0].location_id, 1);
        assert_eq!(locations[0].extra["streetAddress"], "1 Main");

        let thermostats = client.get_thermostats().await;
        assert_eq!(thermostats.len(), 1);
        assert_eq!(thermostats[0].device_id, "T1");
    }

    #[tokio::test]
    async fn test_thermostats_empty_on_failure() {
        let (server, client) = setup().await;
        Mock::given(method("GET"))
            .and(path("/v2/locations"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(client.get_thermostats().await.is_empty());
    }

    #[tokio::test]
    async fn test_thermostats_empty_without_token() {
        let server = MockServer::start().await;
        let client = crate::api::client::tests::client_for(&server);
        assert!(client.get_thermostats().await.is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_locations_shape() {
        let (server, client) = setup().await;
        mount_locations(&server, json!({ "not": "a list" })).await;

        assert!(matches!(
            client.get_locations().await,
            Err(Error::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_location() {
        let (server, client) = setup().await;
        assert_eq!(client.resolve_location(Some(7)).await.unwrap(), 7);
        // Explicit id means no lookup
        assert!(server.received_requests().await.unwrap().is_empty());

        mount_locations(&server, two_locations()).await;
        assert_eq!(client.resolve_location(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolve_location_none_exist() {
        let (server, client) = setup().await;
        mount_locations(&server, json!([])).await;

        let err = client.resolve_location(None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

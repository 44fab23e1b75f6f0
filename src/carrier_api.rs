//! HTTP client for the carrier's public ticketing API.
//!
//! Three endpoints are consumed: station search, connection search, and the
//! train delay lookup the delay monitor polls. The carrier signals its own
//! failures with a non-zero `result` code; that and every transport-level
//! failure degrade to an empty/zero answer here, logged at warn. Callers
//! cannot distinguish "on time" from "unreachable" and are not meant to.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Station/location as returned by the carrier
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CarrierLocation {
    pub id: String,
    pub name: String,
    pub fullname: Option<String>,
    #[serde(rename = "type")]
    pub location_type: i32,
}

/// One leg of a found connection
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrainStop {
    pub name: String,
    pub time: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrainData {
    pub number: i64,
    #[serde(rename = "type")]
    pub train_type: String,
    pub name: Option<String>,
    pub from: TrainStop,
    pub to: TrainStop,
    pub delay: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTrain {
    pub train_data: TrainData,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PriceOffer {
    pub price: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PriceOffers {
    #[serde(default)]
    pub offers: Vec<PriceOffer>,
}

/// Connection between two locations on a date
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CarrierConnection {
    pub id: i64,
    pub trains: Vec<ConnectionTrain>,
    #[serde(default)]
    pub price_offers: PriceOffers,
}

#[derive(Debug, Deserialize, Default)]
struct LocationsResponse {
    #[serde(default)]
    locations: Vec<CarrierLocation>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConnInfo {
    #[serde(default)]
    connections: Vec<CarrierConnection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConnectionsResponse {
    #[serde(default)]
    result: i32,
    conn_info: Option<ConnInfo>,
}

#[derive(Debug, Deserialize, Default)]
struct TrainDelayResponse {
    #[serde(default)]
    delay: i32,
}

/// Delay source the monitor polls. Split out so the monitor is not tied to
/// the live HTTP client.
#[async_trait]
pub trait DelayProvider: Send + Sync {
    /// Carrier-reported delay in minutes, 0 when unavailable.
    async fn train_delay(&self, train_number: u32, date: NaiveDate) -> i32;
}

/// Client for the carrier ticketing API
#[derive(Clone)]
pub struct CarrierApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl CarrierApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Search stations by a free-text query; failures yield an empty list.
    pub async fn search_locations(&self, query: &str) -> Vec<CarrierLocation> {
        match self.fetch_locations(query).await {
            Ok(locations) => locations,
            Err(e) => {
                tracing::warn!("location search failed: {e:#}");
                Vec::new()
            }
        }
    }

    /// Search connections between two locations on a date; failures and
    /// carrier-side error codes yield an empty list.
    pub async fn search_connections(
        &self,
        from: &str,
        to: &str,
        departure_date: NaiveDate,
    ) -> Vec<CarrierConnection> {
        match self.fetch_connections(from, to, departure_date).await {
            Ok(connections) => connections,
            Err(e) => {
                tracing::warn!("connection search failed: {e:#}");
                Vec::new()
            }
        }
    }

    async fn fetch_locations(&self, query: &str) -> Result<Vec<CarrierLocation>> {
        let response = self
            .http
            .get(format!("{}/v1/locations", self.base_url))
            .query(&[("query", query)])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("locations request failed")?
            .error_for_status()
            .context("locations request rejected")?
            .json::<LocationsResponse>()
            .await
            .context("locations response malformed")?;

        Ok(response.locations)
    }

    async fn fetch_connections(
        &self,
        from: &str,
        to: &str,
        departure_date: NaiveDate,
    ) -> Result<Vec<CarrierConnection>> {
        let mut params: Vec<(&str, String)> = Vec::with_capacity(3);

        // short all-digit inputs are station ids, anything else a name
        if is_location_id(from) {
            params.push(("fromLocationId", from.to_string()));
        } else {
            params.push(("fromLocationName", from.to_string()));
        }
        if is_location_id(to) {
            params.push(("toLocationId", to.to_string()));
        } else {
            params.push(("toLocationName", to.to_string()));
        }
        params.push(("departureDate", departure_date.to_string()));

        let response = self
            .http
            .get(format!("{}/v1/connections", self.base_url))
            .query(&params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("connections request failed")?
            .error_for_status()
            .context("connections request rejected")?
            .json::<ConnectionsResponse>()
            .await
            .context("connections response malformed")?;

        Ok(connections_from_response(response))
    }

    async fn fetch_train_delay(&self, train_number: u32, date: NaiveDate) -> Result<i32> {
        let response = self
            .http
            .get(format!("{}/v1/trains", self.base_url))
            .query(&[
                ("trainNumber", train_number.to_string()),
                ("date", date.to_string()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("train delay request failed")?
            .error_for_status()
            .context("train delay request rejected")?
            .json::<TrainDelayResponse>()
            .await
            .context("train delay response malformed")?;

        Ok(response.delay)
    }
}

#[async_trait]
impl DelayProvider for CarrierApiClient {
    async fn train_delay(&self, train_number: u32, date: NaiveDate) -> i32 {
        match self.fetch_train_delay(train_number, date).await {
            Ok(delay) => delay,
            Err(e) => {
                tracing::warn!(train_number, "train delay lookup failed: {e:#}");
                0
            }
        }
    }
}

fn is_location_id(value: &str) -> bool {
    value.len() < 10 && !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn connections_from_response(response: ConnectionsResponse) -> Vec<CarrierConnection> {
    if response.result != 0 {
        tracing::warn!(result = response.result, "carrier reported an error code");
        return Vec::new();
    }

    response
        .conn_info
        .map(|info| info.connections)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_ids_are_short_digit_strings() {
        assert!(is_location_id("5457076"));
        assert!(!is_location_id("Praha hl.n."));
        assert!(!is_location_id("12345678901"));
        assert!(!is_location_id(""));
    }

    #[test]
    fn delay_defaults_to_zero_when_missing() {
        let parsed: TrainDelayResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.delay, 0);

        let parsed: TrainDelayResponse = serde_json::from_str(r#"{"delay": 65}"#).unwrap();
        assert_eq!(parsed.delay, 65);
    }

    #[test]
    fn nonzero_result_code_means_no_connections() {
        let body = r#"{
            "result": 4,
            "connInfo": {
                "connections": [{
                    "id": 1,
                    "trains": [{"trainData": {
                        "number": 176, "type": "EC",
                        "from": {"name": "Praha hl.n.", "time": "09:00"},
                        "to": {"name": "Ostrava hl.n.", "time": "11:30"},
                        "delay": 10
                    }}],
                    "priceOffers": {"offers": [{"price": 249}]}
                }]
            }
        }"#;
        let parsed: ConnectionsResponse = serde_json::from_str(body).unwrap();
        assert!(connections_from_response(parsed).is_empty());
    }

    #[test]
    fn connections_parse_with_optional_fields_absent() {
        let body = r#"{
            "result": 0,
            "connInfo": {
                "connections": [{
                    "id": 7,
                    "trains": [{"trainData": {
                        "number": 123, "type": "R",
                        "from": {"name": "Praha hl.n.", "time": "14:30"},
                        "to": {"name": "Brno hl.n.", "time": "16:45"}
                    }}],
                    "priceOffers": {}
                }]
            }
        }"#;
        let parsed: ConnectionsResponse = serde_json::from_str(body).unwrap();
        let connections = connections_from_response(parsed);
        assert_eq!(connections.len(), 1);
        let train = &connections[0].trains[0].train_data;
        assert_eq!(train.number, 123);
        assert_eq!(train.delay, None);
        assert!(connections[0].price_offers.offers.is_empty());
    }

    #[test]
    fn missing_conn_info_means_no_connections() {
        let parsed: ConnectionsResponse = serde_json::from_str(r#"{"result": 0}"#).unwrap();
        assert!(connections_from_response(parsed).is_empty());
    }
}

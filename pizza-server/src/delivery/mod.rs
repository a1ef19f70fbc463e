//! Delivery time estimates via the Google Distance Matrix API

use serde::{Deserialize, Serialize};

use crate::error::BoxError;

const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Kitchen time added to every travel estimate, in minutes
pub const BASE_PREPARATION_MIN: i64 = 15;

/// Distance band shown on the storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryRange {
    pub min_km: u32,
    pub max_km: u32,
    pub minutes: u32,
}

pub const DELIVERY_RANGES: [DeliveryRange; 4] = [
    DeliveryRange { min_km: 0, max_km: 3, minutes: 15 },
    DeliveryRange { min_km: 4, max_km: 6, minutes: 25 },
    DeliveryRange { min_km: 7, max_km: 8, minutes: 30 },
    DeliveryRange { min_km: 9, max_km: 10, minutes: 40 },
];

/// POST /api/delivery/estimate
#[derive(Debug, Clone, Deserialize)]
pub struct EstimateRequest {
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryEstimate {
    /// Travel time, rounded up to whole minutes
    pub travel_minutes: i64,
    pub preparation_minutes: i64,
    pub total_minutes: i64,
    /// Human-readable distance reported by the provider
    pub distance: Option<String>,
    /// `true` when the provider could not be asked or gave no route
    pub fallback: bool,
}

impl DeliveryEstimate {
    fn from_travel(travel_secs: i64, distance: Option<String>) -> Self {
        let travel_minutes = (travel_secs.max(0) + 59) / 60;
        Self {
            travel_minutes,
            preparation_minutes: BASE_PREPARATION_MIN,
            total_minutes: travel_minutes + BASE_PREPARATION_MIN,
            distance,
            fallback: false,
        }
    }

    pub fn fallback() -> Self {
        Self {
            travel_minutes: 0,
            preparation_minutes: BASE_PREPARATION_MIN,
            total_minutes: BASE_PREPARATION_MIN,
            distance: None,
            fallback: true,
        }
    }
}

/// Travel seconds and distance text of the first matrix element
fn parse_matrix(resp: &serde_json::Value) -> Option<(i64, Option<String>)> {
    let element = &resp["rows"][0]["elements"][0];
    if element["status"].as_str().is_some_and(|s| s != "OK") {
        return None;
    }
    let secs = element["duration"]["value"].as_i64()?;
    let distance = element["distance"]["text"].as_str().map(String::from);
    Some((secs, distance))
}

#[derive(Clone)]
pub struct DistanceClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl DistanceClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    async fn query(&self, api_key: &str, origin: &str, destination: &str) -> Result<serde_json::Value, BoxError> {
        let resp = self
            .http
            .get(DISTANCE_MATRIX_URL)
            .query(&[
                ("origins", origin),
                ("destinations", destination),
                ("key", api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp)
    }

    /// Never fails: upstream problems degrade to [`DeliveryEstimate::fallback`]
    pub async fn estimate(&self, origin: &str, destination: &str) -> DeliveryEstimate {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!("No maps API key configured, using base delivery estimate");
            return DeliveryEstimate::fallback();
        };

        match self.query(api_key, origin, destination).await {
            Ok(resp) => match parse_matrix(&resp) {
                Some((secs, distance)) => DeliveryEstimate::from_travel(secs, distance),
                None => {
                    tracing::warn!(status = %resp["status"], "Distance matrix returned no route");
                    DeliveryEstimate::fallback()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Distance matrix request failed");
                DeliveryEstimate::fallback()
            }
        }
    }
}

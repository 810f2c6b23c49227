//! Current temperature from the Open-Meteo forecast API.

use crate::error::HandlerError;
use crate::handler::ToolHandler;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use std::time::Duration;
use tracing::{debug, instrument};

/// Tool name served by [`OpenMeteoTemperature`].
pub const TEMPERATURE_TOOL: &str = "get_current_temperature";

/// Configuration for the Open-Meteo client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Transport-level timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    10
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

/// Handler for `get_current_temperature`.
#[derive(Debug, Clone)]
pub struct OpenMeteoTemperature {
    http: Client,
    config: OpenMeteoConfig,
}

#[derive(Deserialize)]
struct ForecastReply {
    hourly: HourlySeries,
}

#[derive(Deserialize)]
struct HourlySeries {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
}

impl OpenMeteoTemperature {
    /// Creates the handler.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::RequestFailed`] if the HTTP client cannot be built.
    pub fn new(config: OpenMeteoConfig) -> Result<Self, HandlerError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| HandlerError::RequestFailed {
                status: None,
                reason: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastReply, HandlerError> {
        let url = format!("{}/v1/forecast", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", "temperature_2m".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| HandlerError::RequestFailed {
                status: None,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HandlerError::RequestFailed {
                status: Some(status.as_u16()),
                reason: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| HandlerError::ResponseParseFailed {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ToolHandler for OpenMeteoTemperature {
    fn name(&self) -> &str {
        TEMPERATURE_TOOL
    }

    #[instrument(skip(self, arguments))]
    async fn execute(&self, arguments: &Map<String, JsonValue>) -> Result<JsonValue, HandlerError> {
        let latitude = coordinate(arguments, "latitude", 90.0)?;
        let longitude = coordinate(arguments, "longitude", 180.0)?;

        let forecast = self.forecast(latitude, longitude).await?;
        let temperature = nearest_reading(
            &forecast.hourly.time,
            &forecast.hourly.temperature_2m,
            Utc::now(),
        )?;
        debug!(latitude, longitude, temperature, "fetched temperature");

        Ok(json!(format!("The current temperature is {temperature:.1}°C")))
    }
}

fn coordinate(arguments: &Map<String, JsonValue>, name: &str, bound: f64) -> Result<f64, HandlerError> {
    let value = match arguments.get(name) {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| HandlerError::invalid_arguments(TEMPERATURE_TOOL, format!("{name} must be a number")))?;

    if !value.is_finite() || value.abs() > bound {
        return Err(HandlerError::invalid_arguments(
            TEMPERATURE_TOOL,
            format!("{name} must be between -{bound} and {bound}"),
        ));
    }
    Ok(value)
}

/// Picks the reading whose timestamp is closest to `now`.
///
/// Timestamps are Open-Meteo's `YYYY-MM-DDTHH:MM` in UTC. Entries with an
/// unparseable timestamp or a missing reading are skipped.
///
/// # Errors
///
/// Returns [`HandlerError::ResponseParseFailed`] if no usable reading exists.
pub fn nearest_reading(
    times: &[String],
    temperatures: &[Option<f64>],
    now: DateTime<Utc>,
) -> Result<f64, HandlerError> {
    times
        .iter()
        .zip(temperatures)
        .filter_map(|(time, temperature)| {
            let at = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M")
                .ok()?
                .and_utc();
            Some(((at - now).num_seconds().unsigned_abs(), (*temperature)?))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, temperature)| temperature)
        .ok_or_else(|| HandlerError::ResponseParseFailed {
            reason: "forecast has no hourly temperatures".to_string(),
        })
}

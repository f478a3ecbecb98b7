//! Weather lookup via OpenWeatherMap

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

/// Request timeout for weather lookups
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);

/// Looks up current weather for a city
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Return a formatted one-line report for the city
    ///
    /// # Errors
    ///
    /// Returns `Error::Weather` with a human-readable reason on any
    /// failure, including a missing API key
    async fn lookup(&self, city: &str) -> Result<String>;
}

/// OpenWeatherMap client
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    /// Create a client; the key may be absent, failing lookups politely
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, api_key }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn lookup(&self, city: &str) -> Result<String> {
        let Some(ref key) = self.api_key else {
            return Err(Error::Weather(
                "OpenWeatherMap API key not set. Set OPENWEATHER_API_KEY or pass --openweather-key."
                    .to_string(),
            ));
        };

        let response = self
            .client
            .get("https://api.openweathermap.org/data/2.5/weather")
            .query(&[("q", city), ("appid", key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| Error::Weather(format!("weather lookup failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Weather(format!(
                "weather API error: {status} {}",
                crate::journal::truncate(&body, 200)
            )));
        }

        let report: WeatherResponse = response
            .json()
            .await
            .map_err(|e| Error::Weather(format!("unexpected weather response: {e}")))?;

        let condition = report.weather.first().cloned().unwrap_or_default();
        Ok(format!(
            "{}: {} ({}). Temperature {:.1}°C, feels like {:.1}°C. Humidity {}%.",
            report.name,
            condition.main,
            condition.description,
            report.main.temp,
            report.main.feels_like,
            report.main.humidity,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    weather: Vec<WeatherCondition>,
    main: WeatherMain,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WeatherCondition {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

//! Weather lookup used to decide whether an outdoor task makes sense right now.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::config::WeatherConfig;

/// Error type for weather lookups. Any of these means suitability could not be confirmed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeatherError {
    #[error("weather service unreachable: {0}")]
    Network(String),
    #[error("location not found: {0}")]
    LocationNotFound(String),
    #[error("no weather API key configured (set weather.api_key or DOIT_WEATHER_API_KEY)")]
    MissingApiKey,
    #[error("unexpected weather response: {0}")]
    Decode(String),
}

/// Current conditions and the verdict for outdoor work
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// Celsius
    pub temperature: f64,
    pub condition: String,
    pub is_good_time: bool,
}

/// Thresholds for outdoor suitability
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRules {
    pub min_temp: f64,
    pub max_temp: f64,
    pub bad_conditions: Vec<String>,
}

impl Default for WeatherRules {
    fn default() -> Self {
        WeatherRules::from_config(&WeatherConfig::default())
    }
}

impl WeatherRules {
    pub fn from_config(config: &WeatherConfig) -> Self {
        WeatherRules {
            min_temp: config.min_temp,
            max_temp: config.max_temp,
            bad_conditions: config.bad_conditions.clone(),
        }
    }

    /// Inclusive temperature range and no ruled-out condition
    pub fn is_good_time(&self, temperature: f64, condition: &str) -> bool {
        (self.min_temp..=self.max_temp).contains(&temperature)
            && !self.bad_conditions.iter().any(|c| c == condition)
    }
}

pub fn assess(temperature: f64, condition: &str, rules: &WeatherRules) -> WeatherReport {
    WeatherReport {
        temperature,
        condition: condition.to_string(),
        is_good_time: rules.is_good_time(temperature, condition),
    }
}

/// Looks up current weather for a named location
pub trait WeatherGate {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<WeatherReport, WeatherError>> + Send;
}

// ---------------------------------------------------------------------------
// OpenWeatherMap
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeoMatch {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReading,
    #[serde(default)]
    weather: Vec<ConditionReading>,
}

#[derive(Debug, Deserialize)]
struct MainReading {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionReading {
    main: String,
}

fn first_match(matches: Vec<GeoMatch>, location: &str) -> Result<(f64, f64), WeatherError> {
    matches
        .into_iter()
        .next()
        .map(|m| (m.lat, m.lon))
        .ok_or_else(|| WeatherError::LocationNotFound(location.to_string()))
}

fn report_from(current: CurrentWeather, rules: &WeatherRules) -> Result<WeatherReport, WeatherError> {
    let condition = current
        .weather
        .into_iter()
        .next()
        .map(|c| c.main)
        .ok_or_else(|| WeatherError::Decode("no weather condition in response".into()))?;
    Ok(assess(current.main.temp, &condition, rules))
}

/// Two-step client: geocode the location name, then read current weather at
/// the first match's coordinates (metric units).
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    geo_url: String,
    weather_url: String,
    timeout: Duration,
    rules: WeatherRules,
}

impl OpenWeatherClient {
    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(WeatherError::MissingApiKey)?;
        Ok(OpenWeatherClient {
            client: reqwest::Client::new(),
            api_key,
            geo_url: config.geo_url.clone(),
            weather_url: config.weather_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            rules: WeatherRules::from_config(config),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WeatherError::Network(format!("timed out after {}s", self.timeout.as_secs()))
                } else {
                    WeatherError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(WeatherError::Network(format!("HTTP {}", response.status())));
        }
        response
            .json()
            .await
            .map_err(|e| WeatherError::Decode(e.to_string()))
    }

    async fn fetch_report(&self, location: &str) -> Result<WeatherReport, WeatherError> {
        let matches: Vec<GeoMatch> = self
            .get_json(
                &self.geo_url,
                &[
                    ("q", location.to_string()),
                    ("limit", "1".to_string()),
                    ("appid", self.api_key.clone()),
                ],
            )
            .await?;
        let (lat, lon) = first_match(matches, location)?;
        tracing::debug!(location, lat, lon, "geocoded location");

        let current: CurrentWeather = self
            .get_json(
                &self.weather_url,
                &[
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("appid", self.api_key.clone()),
                    ("units", "metric".to_string()),
                ],
            )
            .await?;
        let report = report_from(current, &self.rules)?;
        tracing::info!(
            location,
            temperature = report.temperature,
            condition = %report.condition,
            good = report.is_good_time,
            "weather checked"
        );
        Ok(report)
    }
}

impl WeatherGate for OpenWeatherClient {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<WeatherReport, WeatherError>> + Send {
        self.fetch_report(location)
    }
}

/// A gate that could not be set up; every lookup fails with the setup error
#[derive(Debug, Clone)]
pub struct UnavailableGate(pub WeatherError);

impl WeatherGate for UnavailableGate {
    fn fetch(&self, _location: &str) -> impl Future<Output = Result<WeatherReport, WeatherError>> + Send {
        let err = self.0.clone();
        async move { Err(err) }
    }
}

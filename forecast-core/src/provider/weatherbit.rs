use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::FetchError,
    model::{Coordinates, CurrentConditions, ForecastDay, WeatherReport},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherbit.io/v2.0";

const FORECAST_ENDPOINT: &str = "forecast/daily";
const CURRENT_ENDPOINT: &str = "current";

#[derive(Debug, Clone)]
pub struct WeatherbitProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

struct RawResponse {
    endpoint: &'static str,
    status: StatusCode,
    body: String,
}

impl WeatherbitProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { api_key, base_url, http: Client::new() }
    }

    async fn get(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
    ) -> Result<RawResponse, FetchError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "requesting weather data");

        let res = self.http.get(&url).query(query).send().await.map_err(|e| {
            FetchError::transport(format!("Failed to reach weather provider ({endpoint}): {e}"))
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            FetchError::transport(format!("Failed to read weather response ({endpoint}): {e}"))
        })?;

        Ok(RawResponse { endpoint, status, body })
    }
}

#[derive(Debug, Deserialize)]
struct WbWeather {
    description: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WbForecastEntry {
    valid_date: NaiveDate,
    ts: i64,
    temp: f64,
    rh: f64,
    #[serde(default)]
    precip: Option<f64>,
    weather: WbWeather,
}

#[derive(Debug, Deserialize)]
struct WbForecastResponse {
    data: Vec<WbForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct WbCurrentEntry {
    city_name: String,
    temp: f64,
    rh: f64,
    #[serde(default)]
    precip: Option<f64>,
    weather: WbWeather,
}

#[derive(Debug, Deserialize)]
struct WbCurrentResponse {
    data: Vec<WbCurrentEntry>,
}

impl WbForecastEntry {
    fn into_day(self) -> Result<ForecastDay, FetchError> {
        let timestamp = DateTime::<Utc>::from_timestamp(self.ts, 0).ok_or_else(|| {
            FetchError::transport(format!("Forecast entry has invalid timestamp {}", self.ts))
        })?;

        Ok(ForecastDay {
            valid_date: self.valid_date,
            timestamp,
            temperature_c: self.temp,
            humidity_pct: humidity(self.rh),
            precipitation_pct: self.precip.unwrap_or_default(),
            description: self.weather.description,
            icon_code: self.weather.icon.unwrap_or_default(),
        })
    }
}

impl From<WbCurrentEntry> for CurrentConditions {
    fn from(entry: WbCurrentEntry) -> Self {
        CurrentConditions {
            city_name: entry.city_name,
            temperature_c: entry.temp,
            humidity_pct: humidity(entry.rh),
            precipitation_pct: entry.precip.unwrap_or_default(),
            description: entry.weather.description,
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherbitProvider {
    async fn fetch(&self, at: Coordinates) -> Result<WeatherReport, FetchError> {
        let lat = at.latitude.to_string();
        let lon = at.longitude.to_string();

        let forecast_query = [
            ("lat", lat.clone()),
            ("lon", lon.clone()),
            ("key", self.api_key.clone()),
            ("units", "M".to_string()),
        ];
        let current_query = [("lat", lat), ("lon", lon), ("key", self.api_key.clone())];

        let (forecast, current) = tokio::join!(
            self.get(FORECAST_ENDPOINT, &forecast_query),
            self.get(CURRENT_ENDPOINT, &current_query),
        );
        let (forecast, current) = (forecast?, current?);

        for res in [&forecast, &current] {
            if !res.status.is_success() {
                debug!(
                    endpoint = res.endpoint,
                    status = %res.status,
                    body = %truncate_body(&res.body),
                    "weather provider rejected request"
                );
                return Err(FetchError::Provider);
            }
        }

        let forecast: WbForecastResponse = serde_json::from_str(&forecast.body)?;
        let current: WbCurrentResponse = serde_json::from_str(&current.body)?;

        let current = current
            .data
            .into_iter()
            .next()
            .map(CurrentConditions::from)
            .ok_or_else(|| FetchError::transport("Current conditions response contained no data"))?;

        let forecast = forecast
            .data
            .into_iter()
            .map(WbForecastEntry::into_day)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(city = %current.city_name, days = forecast.len(), "weather data received");

        Ok(WeatherReport { current, forecast })
    }
}

fn humidity(rh: f64) -> u8 {
    rh.round().clamp(0.0, 100.0) as u8
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_entry_maps_all_fields() {
        let entry: WbForecastEntry = serde_json::from_value(serde_json::json!({
            "valid_date": "2024-01-08",
            "ts": 1704672000,
            "temp": 4.5,
            "rh": 81.6,
            "precip": 1.25,
            "weather": { "description": "Light rain", "icon": "r01d", "code": 500 }
        }))
        .unwrap();

        let day = entry.into_day().unwrap();
        assert_eq!(day.valid_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(day.timestamp.timestamp(), 1704672000);
        assert_eq!(day.humidity_pct, 82);
        assert_eq!(day.precipitation_pct, 1.25);
        assert_eq!(day.icon_code, "r01d");
    }

    #[test]
    fn missing_precip_defaults_to_zero() {
        let entry: WbCurrentEntry = serde_json::from_value(serde_json::json!({
            "city_name": "Utrecht",
            "temp": 12.0,
            "rh": 70,
            "weather": { "description": "Overcast clouds" }
        }))
        .unwrap();

        let current = CurrentConditions::from(entry);
        assert_eq!(current.precipitation_pct, 0.0);
        assert_eq!(current.humidity_pct, 70);
    }

    #[test]
    fn humidity_is_clamped() {
        assert_eq!(humidity(-3.0), 0);
        assert_eq!(humidity(140.0), 100);
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = WeatherbitProvider::with_base_url("k".into(), "http://localhost:1/v2.0/");
        assert_eq!(provider.base_url, "http://localhost:1/v2.0");
    }
}

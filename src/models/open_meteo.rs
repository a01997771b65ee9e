//! Response shape of the Open-Meteo `/v1/forecast` endpoint (subset we request).
//!
//! Hourly values arrive as parallel arrays indexed by position in `time`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub current: Option<CurrentBlock>,
    #[serde(default)]
    pub hourly: Option<HourlyBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentBlock {
    pub temperature_2m: f64,
    pub weather_code: u16,
    pub wind_speed_10m: f64,
    pub wind_direction_10m: f64,
    pub precipitation: f64,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
}

/// Open-Meteo writes `null` into these arrays for hours it has no value for.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    pub temperature_2m: Vec<Option<f64>>,
    pub weather_code: Vec<Option<u16>>,
    pub precipitation: Vec<Option<f64>>,
    pub rain: Vec<Option<f64>>,
    pub showers: Vec<Option<f64>>,
    pub snowfall: Vec<Option<f64>>,
}

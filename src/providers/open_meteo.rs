//! Open-Meteo adapter.
//!
//! Open-Meteo reports conditions as WMO weather codes and hourly values as
//! parallel arrays, so everything textual in the document (slug, summary,
//! cardinal direction, precipitation type) is derived here.

use crate::client::WeatherClient;
use crate::config::{LATITUDE, LONGITUDE};
use crate::models::open_meteo::{CurrentBlock, ForecastResponse, HourlyBlock};
use crate::models::weather::{
    CurrentConditions, HourlyEntry, HourlyForecast, MAX_HOURLY_ENTRIES, Precipitation, PrecipitationKind,
    WeatherDocument, Wind,
};
use crate::providers::{NormalizationError, Normalizer, ProviderId, SourceError, WeatherSource};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const CURRENT_FIELDS: &str = "temperature_2m,weather_code,wind_speed_10m,wind_direction_10m,precipitation,cloud_cover";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code,precipitation,rain,showers,snowfall";

const CARDINALS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

/// Condition buckets for WMO codes, named after the slugs Meteosource uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Sunny,
    PartlySunny,
    Overcast,
    Fog,
    Rain,
    Snow,
    RainShower,
    Thunderstorm,
    /// Every code outside the ranges above.
    Cloudy,
}

impl WeatherCondition {
    pub fn from_wmo_code(code: u16) -> Self {
        match code {
            0 => WeatherCondition::Sunny,
            1 | 2 => WeatherCondition::PartlySunny,
            3 => WeatherCondition::Overcast,
            45..=48 => WeatherCondition::Fog,
            51..=67 => WeatherCondition::Rain,
            71..=77 => WeatherCondition::Snow,
            80..=82 => WeatherCondition::RainShower,
            95..=99 => WeatherCondition::Thunderstorm,
            _ => WeatherCondition::Cloudy,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "sunny",
            WeatherCondition::PartlySunny => "partly_sunny",
            WeatherCondition::Overcast => "overcast",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Snow => "snow",
            WeatherCondition::RainShower => "rain_shower",
            WeatherCondition::Thunderstorm => "thunderstorm",
            WeatherCondition::Cloudy => "cloudy",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            WeatherCondition::Sunny => "Sunny",
            WeatherCondition::PartlySunny => "Partly sunny",
            WeatherCondition::Overcast => "Overcast",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::RainShower => "Rain showers",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Cloudy => "Cloudy",
        }
    }
}

/// 16-point compass code for a direction in degrees.
pub fn wind_direction(degrees: f64) -> &'static str {
    let index = ((degrees + 11.25) / 22.5).floor() as i64;
    CARDINALS[index.rem_euclid(16) as usize]
}

/// Current-interval precipitation carries no phase information: any amount is rain.
pub fn current_precipitation_kind(total: f64) -> PrecipitationKind {
    if total > 0.0 {
        PrecipitationKind::Rain
    } else {
        PrecipitationKind::None
    }
}

/// Hourly precipitation type; snow wins over simultaneous rain.
pub fn hourly_precipitation_kind(rain: f64, snowfall: f64, showers: f64) -> PrecipitationKind {
    if rain + snowfall + showers == 0.0 {
        PrecipitationKind::None
    } else if snowfall > 0.0 {
        PrecipitationKind::Snow
    } else {
        PrecipitationKind::Rain
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpenMeteo;

impl OpenMeteo {
    pub fn new() -> Self {
        OpenMeteo
    }

    fn query() -> Vec<(&'static str, String)> {
        vec![
            ("latitude", LATITUDE.to_string()),
            ("longitude", LONGITUDE.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
            ("forecast_days", "1".to_string()),
        ]
    }
}

impl Normalizer for OpenMeteo {
    type Raw = ForecastResponse;

    fn normalize(&self, raw: ForecastResponse, captured_at: &str) -> Result<WeatherDocument, NormalizationError> {
        let current = raw.current.ok_or(NormalizationError::MissingField("current"))?;
        let hourly = raw.hourly.ok_or(NormalizationError::MissingField("hourly"))?;

        Ok(WeatherDocument {
            lat: LATITUDE.to_string(),
            lon: LONGITUDE.to_string(),
            captured_at: captured_at.to_string(),
            current: current_conditions(&current),
            hourly: HourlyForecast {
                data: hourly_entries(&hourly)?,
            },
        })
    }
}

impl WeatherSource for OpenMeteo {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    fn fetch_document(&self, client: &WeatherClient, captured_at: &str) -> Result<WeatherDocument, SourceError> {
        let raw: ForecastResponse = client.get_json(FORECAST_URL, &Self::query())?;
        Ok(self.normalize(raw, captured_at)?)
    }
}

fn current_conditions(current: &CurrentBlock) -> CurrentConditions {
    let condition = WeatherCondition::from_wmo_code(current.weather_code);
    let angle = current.wind_direction_10m.round().rem_euclid(360.0) as u16;
    CurrentConditions {
        temperature: current.temperature_2m,
        summary: condition.summary().to_string(),
        icon: condition.slug().to_string(),
        wind: Wind {
            speed: Some(current.wind_speed_10m),
            angle: Some(angle),
            dir: Some(wind_direction(current.wind_direction_10m).to_string()),
        },
        precipitation: Precipitation {
            total: Some(current.precipitation),
            kind: current_precipitation_kind(current.precipitation),
        },
        cloud_cover: current.cloud_cover.map(|c| c.round().clamp(0.0, 100.0) as u8),
    }
}

fn hourly_entries(hourly: &HourlyBlock) -> Result<Vec<HourlyEntry>, NormalizationError> {
    let count = hourly.time.len().min(MAX_HOURLY_ENTRIES);
    check_len("temperature_2m", hourly.temperature_2m.len(), count)?;
    check_len("weather_code", hourly.weather_code.len(), count)?;
    check_len("precipitation", hourly.precipitation.len(), count)?;
    check_len("rain", hourly.rain.len(), count)?;
    check_len("showers", hourly.showers.len(), count)?;
    check_len("snowfall", hourly.snowfall.len(), count)?;

    let amount = |values: &[Option<f64>], i: usize| values[i].unwrap_or(0.0);
    let entries = (0..count)
        .filter_map(|i| {
            // hours without a temperature reading are dropped
            let temperature = hourly.temperature_2m[i]?;
            let condition = hourly.weather_code[i].map_or(WeatherCondition::Cloudy, WeatherCondition::from_wmo_code);
            Some(HourlyEntry {
                date: hourly.time[i].clone(),
                weather: condition.slug().to_string(),
                temperature,
                summary: condition.summary().to_string(),
                precipitation: Precipitation {
                    total: hourly.precipitation[i],
                    kind: hourly_precipitation_kind(
                        amount(&hourly.rain, i),
                        amount(&hourly.snowfall, i),
                        amount(&hourly.showers, i),
                    ),
                },
            })
        })
        .collect();
    Ok(entries)
}

fn check_len(field: &'static str, actual: usize, expected: usize) -> Result<(), NormalizationError> {
    if actual < expected {
        Err(NormalizationError::LengthMismatch { field, expected, actual })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::decode_json;

    const CAPTURED_AT: &str = "2025-11-25 19:53:55";

    fn load_fixture() -> ForecastResponse {
        let json = std::fs::read_to_string("tests/data/open-meteo-forecast.json").expect("fixture present");
        decode_json(&json).expect("parse open-meteo forecast")
    }

    fn synthetic(hours: usize) -> ForecastResponse {
        ForecastResponse {
            current: Some(CurrentBlock {
                temperature_2m: 12.0,
                weather_code: 0,
                wind_speed_10m: 5.0,
                wind_direction_10m: 90.0,
                precipitation: 0.0,
                cloud_cover: Some(10.0),
            }),
            hourly: Some(HourlyBlock {
                time: (0..hours).map(|i| format!("2025-11-25T{:02}:00", i % 24)).collect(),
                temperature_2m: vec![Some(10.0); hours],
                weather_code: vec![Some(3); hours],
                precipitation: vec![Some(0.0); hours],
                rain: vec![Some(0.0); hours],
                showers: vec![Some(0.0); hours],
                snowfall: vec![Some(0.0); hours],
            }),
        }
    }

    #[test]
    fn every_wmo_code_maps_to_one_bucket() {
        for code in 0..=99u16 {
            let expected = match code {
                0 => "sunny",
                1 | 2 => "partly_sunny",
                3 => "overcast",
                45..=48 => "fog",
                51..=67 => "rain",
                71..=77 => "snow",
                80..=82 => "rain_shower",
                95..=99 => "thunderstorm",
                _ => "cloudy",
            };
            assert_eq!(WeatherCondition::from_wmo_code(code).slug(), expected, "code {code}");
        }
        let c = WeatherCondition::from_wmo_code(10);
        assert_eq!((c.slug(), c.summary()), ("cloudy", "Cloudy"));
        let c = WeatherCondition::from_wmo_code(81);
        assert_eq!((c.slug(), c.summary()), ("rain_shower", "Rain showers"));
    }

    #[test]
    fn wind_direction_wraps_around_north() {
        assert_eq!(wind_direction(0.0), "N");
        assert_eq!(wind_direction(359.0), "N");
        assert_eq!(wind_direction(348.75), "N");
        assert_eq!(wind_direction(348.7), "NNW");
        assert_eq!(wind_direction(90.0), "E");
        assert_eq!(wind_direction(180.0), "S");
        assert_eq!(wind_direction(250.0), "WSW");
    }

    #[test]
    fn hourly_precipitation_decision_table() {
        assert_eq!(hourly_precipitation_kind(0.0, 0.0, 0.0), PrecipitationKind::None);
        assert_eq!(hourly_precipitation_kind(0.0, 1.0, 0.0), PrecipitationKind::Snow);
        assert_eq!(hourly_precipitation_kind(1.0, 0.0, 0.0), PrecipitationKind::Rain);
        assert_eq!(hourly_precipitation_kind(1.0, 1.0, 0.0), PrecipitationKind::Snow);
        assert_eq!(hourly_precipitation_kind(0.0, 0.0, 0.4), PrecipitationKind::Rain);
    }

    #[test]
    fn current_precipitation_is_never_snow() {
        assert_eq!(current_precipitation_kind(0.0), PrecipitationKind::None);
        assert_eq!(current_precipitation_kind(2.5), PrecipitationKind::Rain);
    }

    #[test]
    fn hourly_series_is_capped() {
        for (given, kept) in [(0, 0), (5, 5), (12, 12), (24, 12)] {
            let doc = OpenMeteo::new().normalize(synthetic(given), CAPTURED_AT).expect("normalize");
            assert_eq!(doc.hourly.data.len(), kept, "input of {given} hours");
        }
    }

    #[test]
    fn cap_keeps_provider_order() {
        let doc = OpenMeteo::new().normalize(synthetic(24), CAPTURED_AT).expect("normalize");
        assert_eq!(doc.hourly.data[0].date, "2025-11-25T00:00");
        assert_eq!(doc.hourly.data[11].date, "2025-11-25T11:00");
    }

    #[test]
    fn normalizes_recorded_forecast() {
        let doc = OpenMeteo::new().normalize(load_fixture(), CAPTURED_AT).expect("normalize");

        assert_eq!(doc.lat, "37.3886");
        assert_eq!(doc.lon, "-5.9823");
        assert_eq!(doc.captured_at, CAPTURED_AT);
        assert_eq!(doc.current.icon, "partly_sunny");
        assert_eq!(doc.current.summary, "Partly sunny");
        assert_eq!(doc.current.wind.dir.as_deref(), Some("WSW"));
        assert_eq!(doc.current.wind.angle, Some(250));
        assert_eq!(doc.current.cloud_cover, Some(47));
        assert_eq!(doc.current.precipitation.kind, PrecipitationKind::None);

        assert_eq!(doc.hourly.data.len(), MAX_HOURLY_ENTRIES);
        assert_eq!(doc.hourly.data[0].date, "2025-11-25T00:00");
        let rainy = &doc.hourly.data[3];
        assert_eq!(rainy.weather, "rain");
        assert_eq!(rainy.precipitation.kind, PrecipitationKind::Rain);
        let snowy = &doc.hourly.data[4];
        assert_eq!(snowy.precipitation.kind, PrecipitationKind::Snow);
        assert_eq!(snowy.weather, "rain_shower");
    }

    #[test]
    fn missing_blocks_fail_normalization() {
        let mut raw = synthetic(3);
        raw.current = None;
        assert_eq!(
            OpenMeteo::new().normalize(raw, CAPTURED_AT).unwrap_err(),
            NormalizationError::MissingField("current")
        );

        let mut raw = synthetic(3);
        raw.hourly = None;
        assert_eq!(
            OpenMeteo::new().normalize(raw, CAPTURED_AT).unwrap_err(),
            NormalizationError::MissingField("hourly")
        );
    }

    #[test]
    fn short_parallel_array_fails_normalization() {
        let mut raw = synthetic(6);
        if let Some(hourly) = raw.hourly.as_mut() {
            hourly.snowfall.truncate(4);
        }
        let err = OpenMeteo::new().normalize(raw, CAPTURED_AT).unwrap_err();
        assert_eq!(
            err,
            NormalizationError::LengthMismatch {
                field: "snowfall",
                expected: 6,
                actual: 4
            }
        );
    }

    #[test]
    fn null_hourly_values_do_not_fail_the_run() {
        let body = r#"{
            "current": {"temperature_2m": 14.0, "weather_code": 0, "wind_speed_10m": 2.0,
                        "wind_direction_10m": 180.0, "precipitation": 0.0, "cloud_cover": null},
            "hourly": {
                "time": ["2025-11-25T00:00", "2025-11-25T01:00", "2025-11-25T02:00"],
                "temperature_2m": [11.0, null, 10.5],
                "weather_code": [null, 3, 71],
                "precipitation": [null, 0.0, 0.3],
                "rain": [null, 0.0, 0.0],
                "showers": [0.0, 0.0, null],
                "snowfall": [0.0, 0.0, 0.3]
            }
        }"#;
        let raw: ForecastResponse = decode_json(body).expect("nulls decode");
        let doc = OpenMeteo::new().normalize(raw, CAPTURED_AT).expect("normalize");

        assert_eq!(doc.current.cloud_cover, None);
        assert_eq!(doc.hourly.data.len(), 2);
        let first = &doc.hourly.data[0];
        assert_eq!(first.weather, "cloudy");
        assert_eq!(first.precipitation.total, None);
        assert_eq!(first.precipitation.kind, PrecipitationKind::None);
        let last = &doc.hourly.data[1];
        assert_eq!(last.date, "2025-11-25T02:00");
        assert_eq!(last.weather, "snow");
        assert_eq!(last.precipitation.kind, PrecipitationKind::Snow);
    }

    #[test]
    fn response_without_required_current_field_does_not_decode() {
        let body = r#"{"current":{"temperature_2m":1.0},"hourly":null}"#;
        assert!(decode_json::<ForecastResponse>(body).is_err());
    }
}

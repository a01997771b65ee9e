//! Meteosource adapter.
//!
//! Meteosource already speaks in slugs, cardinal codes and precipitation types,
//! so those are copied into the document as delivered.

use crate::client::WeatherClient;
use crate::config::{LATITUDE, LONGITUDE};
use crate::models::meteosource::{self as raw, PointForecast};
use crate::models::weather::{
    CurrentConditions, HourlyEntry, HourlyForecast, MAX_HOURLY_ENTRIES, Precipitation, PrecipitationKind,
    WeatherDocument, Wind,
};
use crate::providers::{NormalizationError, Normalizer, ProviderId, SourceError, WeatherSource};

const BASE_URL: &str = "https://www.meteosource.com/api/v1";

/// Subscription plan; selects the API path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Free,
    Flexi,
    Startup,
    Standard,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Flexi => "flexi",
            Tier::Startup => "startup",
            Tier::Standard => "standard",
            Tier::Premium => "premium",
        }
    }
}

impl TryFrom<&str> for Tier {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "flexi" => Ok(Tier::Flexi),
            "startup" => Ok(Tier::Startup),
            "standard" => Ok(Tier::Standard),
            "premium" => Ok(Tier::Premium),
            _ => Err(format!(
                "unknown Meteosource tier '{value}' (expected free, flexi, startup, standard or premium)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Meteosource {
    api_key: String,
    tier: Tier,
}

impl Meteosource {
    /// Fails with [`SourceError::Init`] when no usable key or tier is configured.
    pub fn new(api_key: Option<&str>, tier: &str) -> Result<Self, SourceError> {
        let api_key = match api_key.map(str::trim) {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => return Err(SourceError::Init("METEOSOURCE_API_KEY is not set".to_string())),
        };
        let tier = Tier::try_from(tier).map_err(SourceError::Init)?;
        Ok(Meteosource { api_key, tier })
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    fn url(&self) -> String {
        format!("{}/{}/point", BASE_URL, self.tier.as_str())
    }
}

impl Normalizer for Meteosource {
    type Raw = PointForecast;

    fn normalize(&self, raw: PointForecast, captured_at: &str) -> Result<WeatherDocument, NormalizationError> {
        let current = raw.current.ok_or(NormalizationError::MissingField("current"))?;
        let hourly = raw.hourly.ok_or(NormalizationError::MissingField("hourly"))?;

        let data = hourly
            .data
            .into_iter()
            .take(MAX_HOURLY_ENTRIES)
            .map(hourly_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WeatherDocument {
            lat: LATITUDE.to_string(),
            lon: LONGITUDE.to_string(),
            captured_at: captured_at.to_string(),
            current: current_conditions(current)?,
            hourly: HourlyForecast { data },
        })
    }
}

impl WeatherSource for Meteosource {
    fn id(&self) -> ProviderId {
        ProviderId::Meteosource
    }

    fn fetch_document(&self, client: &WeatherClient, captured_at: &str) -> Result<WeatherDocument, SourceError> {
        let query = [
            ("lat", LATITUDE.to_string()),
            ("lon", LONGITUDE.to_string()),
            ("sections", "current,hourly".to_string()),
            ("units", "metric".to_string()),
            ("language", "en".to_string()),
            ("key", self.api_key.clone()),
        ];
        let raw: PointForecast = client.get_json(&self.url(), &query)?;
        Ok(self.normalize(raw, captured_at)?)
    }
}

fn current_conditions(current: raw::Current) -> Result<CurrentConditions, NormalizationError> {
    let wind = current.wind.map_or(
        Wind {
            speed: None,
            angle: None,
            dir: None,
        },
        |w| Wind {
            speed: w.speed,
            angle: w.angle.map(|a| a.round().rem_euclid(360.0) as u16),
            dir: w.dir,
        },
    );

    Ok(CurrentConditions {
        temperature: current
            .temperature
            .ok_or(NormalizationError::MissingField("current.temperature"))?,
        summary: current.summary.ok_or(NormalizationError::MissingField("current.summary"))?,
        icon: current.icon.ok_or(NormalizationError::MissingField("current.icon"))?,
        wind,
        precipitation: precipitation(current.precipitation, "current.precipitation")?,
        cloud_cover: current.cloud_cover.map(|c| c.round().clamp(0.0, 100.0) as u8),
    })
}

fn hourly_entry(hour: raw::Hour) -> Result<HourlyEntry, NormalizationError> {
    Ok(HourlyEntry {
        date: hour.date,
        weather: hour.weather.ok_or(NormalizationError::MissingField("hourly.data.weather"))?,
        temperature: hour
            .temperature
            .ok_or(NormalizationError::MissingField("hourly.data.temperature"))?,
        summary: hour.summary.ok_or(NormalizationError::MissingField("hourly.data.summary"))?,
        precipitation: precipitation(hour.precipitation, "hourly.data.precipitation")?,
    })
}

fn precipitation(
    value: Option<raw::Precipitation>,
    field: &'static str,
) -> Result<Precipitation, NormalizationError> {
    let value = value.ok_or(NormalizationError::MissingField(field))?;
    let kind = value.kind.ok_or(NormalizationError::MissingField(field))?;
    Ok(Precipitation {
        total: value.total,
        kind: PrecipitationKind::from_native(&kind),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::decode_json;

    const CAPTURED_AT: &str = "2025-11-25 19:53:58";

    fn load_fixture() -> PointForecast {
        let json = std::fs::read_to_string("tests/data/meteosource-point.json").expect("fixture present");
        decode_json(&json).expect("parse meteosource point forecast")
    }

    fn provider() -> Meteosource {
        Meteosource::new(Some("KEY"), "free").expect("valid provider")
    }

    #[test]
    fn init_requires_an_api_key() {
        let err = Meteosource::new(None, "free").unwrap_err();
        assert!(matches!(err, SourceError::Init(_)));
        let err = Meteosource::new(Some("   "), "free").unwrap_err();
        assert!(matches!(err, SourceError::Init(_)));
    }

    #[test]
    fn init_rejects_unknown_tier() {
        let err = Meteosource::new(Some("KEY"), "gold").unwrap_err();
        assert!(err.to_string().contains("unknown Meteosource tier"));
        assert_eq!(Meteosource::new(Some("KEY"), " Flexi ").expect("tier").tier(), Tier::Flexi);
    }

    #[test]
    fn url_follows_tier() {
        assert_eq!(provider().url(), "https://www.meteosource.com/api/v1/free/point");
    }

    #[test]
    fn normalizes_recorded_forecast() {
        let doc = provider().normalize(load_fixture(), CAPTURED_AT).expect("normalize");

        assert_eq!(doc.lat, "37.3886");
        assert_eq!(doc.lon, "-5.9823");
        assert_eq!(doc.captured_at, CAPTURED_AT);
        assert_eq!(doc.current.temperature, 15.5);
        assert_eq!(doc.current.icon, "partly_sunny");
        assert_eq!(doc.current.wind.dir.as_deref(), Some("WSW"));
        assert_eq!(doc.current.wind.angle, Some(258));
        assert_eq!(doc.current.cloud_cover, Some(38));

        assert_eq!(doc.hourly.data.len(), MAX_HOURLY_ENTRIES);
        assert_eq!(doc.hourly.data[0].date, "2025-11-25T19:00:00");
        assert_eq!(doc.hourly.data[2].weather, "light_rain");
    }

    #[test]
    fn native_types_are_not_remapped() {
        let doc = provider().normalize(load_fixture(), CAPTURED_AT).expect("normalize");
        assert_eq!(doc.hourly.data[2].precipitation.kind, PrecipitationKind::Rain);
        assert_eq!(
            doc.hourly.data[4].precipitation.kind,
            PrecipitationKind::Other("rain_snow".into())
        );
        assert_eq!(doc.hourly.data[4].weather, "snow_shower");
    }

    #[test]
    fn missing_wind_and_cloud_cover_stay_absent() {
        let mut raw = load_fixture();
        if let Some(current) = raw.current.as_mut() {
            current.wind = None;
            current.cloud_cover = None;
        }
        let doc = provider().normalize(raw, CAPTURED_AT).expect("normalize");
        assert_eq!(doc.current.wind.speed, None);
        assert_eq!(doc.current.wind.angle, None);
        assert_eq!(doc.current.cloud_cover, None);
    }

    #[test]
    fn missing_current_temperature_fails() {
        let mut raw = load_fixture();
        if let Some(current) = raw.current.as_mut() {
            current.temperature = None;
        }
        assert_eq!(
            provider().normalize(raw, CAPTURED_AT).unwrap_err(),
            NormalizationError::MissingField("current.temperature")
        );
    }
}

//! Canonical weather document shared by every provider.
//!
//! The JSON produced by these types is the storage format: field names are kept
//! exactly as stored (`timestamp_captura`, `type`, ...), and optional values are
//! written as `null` rather than omitted so a stored document reads back unchanged.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Upper bound on hourly entries kept per document.
pub const MAX_HOURLY_ENTRIES: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDocument {
    pub lat: String,
    pub lon: String,
    /// Local capture clock, `YYYY-MM-DD HH:MM:SS`.
    #[serde(rename = "timestamp_captura")]
    pub captured_at: String,
    pub current: CurrentConditions,
    pub hourly: HourlyForecast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub summary: String,
    pub icon: String,
    pub wind: Wind,
    pub precipitation: Precipitation,
    /// Percent 0-100. `None` means the provider had no reading.
    pub cloud_cover: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    /// Degrees 0-359.
    pub angle: Option<u16>,
    /// 16-point cardinal code.
    pub dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precipitation {
    pub total: Option<f64>,
    #[serde(rename = "type")]
    pub kind: PrecipitationKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HourlyForecast {
    #[serde(default)]
    pub data: Vec<HourlyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyEntry {
    pub date: String,
    pub weather: String,
    pub temperature: f64,
    pub summary: String,
    pub precipitation: Precipitation,
}

/// Precipitation type as stored.
///
/// Open-Meteo documents only ever hold `none`, `rain` or `snow`. Meteosource
/// values are stored verbatim, so anything else it reports (`rain_snow`,
/// `ice_pellets`, `frz_rain`) lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrecipitationKind {
    None,
    Rain,
    Snow,
    Other(String),
}

impl PrecipitationKind {
    pub fn as_str(&self) -> &str {
        match self {
            PrecipitationKind::None => "none",
            PrecipitationKind::Rain => "rain",
            PrecipitationKind::Snow => "snow",
            PrecipitationKind::Other(s) => s.as_str(),
        }
    }

    pub fn from_native(value: &str) -> Self {
        match value {
            "none" => PrecipitationKind::None,
            "rain" => PrecipitationKind::Rain,
            "snow" => PrecipitationKind::Snow,
            other => PrecipitationKind::Other(other.to_string()),
        }
    }

    /// True for the three values Open-Meteo documents are restricted to.
    pub fn is_canonical(&self) -> bool {
        !matches!(self, PrecipitationKind::Other(_))
    }
}

impl std::fmt::Display for PrecipitationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PrecipitationKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PrecipitationKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(PrecipitationKind::from_native(&raw))
    }
}

//! Response shape of the Meteosource `/point` endpoint (sections `current,hourly`).
//!
//! Only fields that end up in a stored document are modelled; everything else
//! in the payload is ignored.

use crate::models::weather::MAX_HOURLY_ENTRIES;
use serde::de::{IgnoredAny, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, Deserialize)]
pub struct PointForecast {
    #[serde(default)]
    pub current: Option<Current>,
    #[serde(default)]
    pub hourly: Option<Hourly>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Current {
    pub temperature: Option<f64>,
    pub summary: Option<String>,
    pub icon: Option<String>,
    #[serde(default)]
    pub wind: Option<Wind>,
    #[serde(default)]
    pub precipitation: Option<Precipitation>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub angle: Option<f64>,
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Precipitation {
    pub total: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hourly {
    /// At most [`MAX_HOURLY_ENTRIES`] hours; later hours are skipped while parsing.
    #[serde(deserialize_with = "first_hours")]
    pub data: Vec<Hour>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hour {
    pub date: String,
    pub weather: Option<String>,
    pub summary: Option<String>,
    pub temperature: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<Precipitation>,
}

/// Collects the leading hours of the sequence and skips the rest without
/// building them.
fn first_hours<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct Leading<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for Leading<T> {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a sequence of hourly forecast entries")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut out = Vec::with_capacity(MAX_HOURLY_ENTRIES);
            while out.len() < MAX_HOURLY_ENTRIES {
                match seq.next_element()? {
                    Some(item) => out.push(item),
                    None => return Ok(out),
                }
            }
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(out)
        }
    }

    deserializer.deserialize_seq(Leading(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hours(n: usize) -> serde_json::Value {
        let data: Vec<_> = (0..n)
            .map(|i| {
                json!({
                    "date": format!("2025-11-25T{:02}:00:00", i % 24),
                    "weather": "sunny",
                    "summary": "Sunny",
                    "temperature": i as f64,
                    "precipitation": { "total": 0.0, "type": "none" }
                })
            })
            .collect();
        json!({ "data": data })
    }

    #[test]
    fn hourly_parsing_stops_at_cap() {
        for (given, kept) in [(0, 0), (5, 5), (12, 12), (24, 12)] {
            let hourly: Hourly = serde_json::from_value(hours(given)).expect("parse hourly");
            assert_eq!(hourly.data.len(), kept, "input of {given} hours");
        }
    }

    #[test]
    fn skipped_hours_are_not_validated() {
        let mut value = hours(12);
        value["data"]
            .as_array_mut()
            .expect("array")
            .push(json!({ "unexpected": [1, 2, 3] }));
        let hourly: Hourly = serde_json::from_value(value).expect("trailing junk is skipped");
        assert_eq!(hourly.data.len(), 12);
        assert_eq!(hourly.data[11].date, "2025-11-25T11:00:00");
    }
}

//! Picks the most recently captured document of a collection.

use crate::models::weather::WeatherDocument;
use crate::utils::parse_capture_timestamp;
use serde_json::Value;

/// Anything that may carry a `timestamp_captura`.
pub trait CaptureStamped {
    fn capture_timestamp(&self) -> Option<&str>;
}

impl CaptureStamped for Value {
    fn capture_timestamp(&self) -> Option<&str> {
        self.get("timestamp_captura").and_then(Value::as_str)
    }
}

impl CaptureStamped for WeatherDocument {
    fn capture_timestamp(&self) -> Option<&str> {
        Some(self.captured_at.as_str())
    }
}

/// Latest document by parsed capture timestamp.
///
/// Documents whose timestamp is missing or unparseable are ignored; on equal
/// timestamps the later one in `docs` wins. If none parse, the last document is
/// returned. `None` only for an empty slice.
pub fn latest_document<D: CaptureStamped>(docs: &[D]) -> Option<&D> {
    let newest = docs
        .iter()
        .filter_map(|d| d.capture_timestamp().and_then(parse_capture_timestamp).map(|ts| (ts, d)))
        .max_by_key(|(ts, _)| *ts)
        .map(|(_, d)| d);
    newest.or_else(|| docs.last())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(stamps: &[Option<&str>]) -> Vec<Value> {
        stamps
            .iter()
            .enumerate()
            .map(|(i, ts)| match ts {
                Some(ts) => json!({ "_id": i.to_string(), "timestamp_captura": ts }),
                None => json!({ "_id": i.to_string() }),
            })
            .collect()
    }

    fn picked(docs: &[Value]) -> Option<&str> {
        latest_document(docs).and_then(|d| d["_id"].as_str())
    }

    #[test]
    fn picks_greatest_parseable_timestamp() {
        let d = docs(&[Some("2025-01-01 00:00:00"), Some("2025-03-01 00:00:00"), Some("not-a-date")]);
        assert_eq!(picked(&d), Some("1"));
    }

    #[test]
    fn ignores_input_order() {
        let d = docs(&[Some("2025-11-25 19:53:55"), None, Some("2024-12-31 23:59:59")]);
        assert_eq!(picked(&d), Some("0"));
    }

    #[test]
    fn ties_go_to_the_later_document() {
        let d = docs(&[
            Some("2025-03-01 00:00:00"),
            Some("2025-03-01 00:00:00"),
            Some("2025-01-01 00:00:00"),
        ]);
        assert_eq!(picked(&d), Some("1"));
    }

    #[test]
    fn falls_back_to_last_document_when_nothing_parses() {
        let d = docs(&[Some("garbage"), None, Some("2025/01/01")]);
        assert_eq!(picked(&d), Some("2"));
    }

    #[test]
    fn empty_input_has_no_latest() {
        let d: Vec<Value> = Vec::new();
        assert!(latest_document(&d).is_none());
    }

    #[test]
    fn works_on_typed_documents() {
        use crate::models::weather::tests::sample_document;
        let d = vec![sample_document("2025-11-25 20:00:00"), sample_document("2025-11-25 08:00:00")];
        let latest = latest_document(&d).expect("latest");
        assert_eq!(latest.captured_at, "2025-11-25 20:00:00");
    }
}

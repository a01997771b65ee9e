use chrono::{Local, NaiveDateTime};

/// Format of `timestamp_captura`.
pub const CAPTURE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Filename-safe rendering of a capture timestamp.
pub const TOKEN_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Token used when a document's capture timestamp cannot be parsed.
pub const NO_TIMESTAMP_TOKEN: &str = "sin_timestamp";

/// Current local time as a capture timestamp.
pub fn capture_timestamp_now() -> String {
    Local::now().format(CAPTURE_FORMAT).to_string()
}

pub fn parse_capture_timestamp(ts: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(ts, CAPTURE_FORMAT).ok()
}

pub fn timestamp_token(ts: Option<&str>) -> String {
    ts.and_then(parse_capture_timestamp)
        .map(|dt| dt.format(TOKEN_FORMAT).to_string())
        .unwrap_or_else(|| NO_TIMESTAMP_TOKEN.to_string())
}

//! Blocking JSON client shared by the weather providers.
//!
//! - Blocking client using `ureq` (no async).
//! - Non-2xx responses are turned into [`ClientError::Http`] with a truncated body.
//! - Decoding goes through `serde_path_to_error`, so a missing or mistyped field
//!   is reported with its path (e.g. `hourly.rain[3]`).

use log::debug;
use serde::de::DeserializeOwned;
use std::time::Duration;

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug)]
pub enum ClientError {
    Transport(String),
    Http { status: http::StatusCode, message: String },
    Json(serde_path_to_error::Error<serde_json::Error>),
}

impl core::fmt::Display for ClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ClientError::Transport(s) => write!(f, "transport error: {}", s),
            ClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            ClientError::Json(e) => write!(f, "json error at `{}`: {}", e.path(), e.inner()),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Json(e) => Some(e.inner()),
            _ => None,
        }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for ClientError {
    fn from(value: serde_path_to_error::Error<serde_json::Error>) -> Self {
        ClientError::Json(value)
    }
}

pub struct WeatherClient {
    agent: ureq::Agent,
}

impl WeatherClient {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        WeatherClient { agent }
    }

    /// GET `url` with the given query parameters and decode the JSON body.
    ///
    /// Query values are never logged; they may carry API keys.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        let mut req = self.agent.get(url).header("Accept", "application/json");
        for (k, v) in query {
            req = req.query(*k, v);
        }
        debug!("GET {} ({} query parameter(s))", url, query.len());

        let mut res = req.call().map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = res.status();
        let body = res
            .body_mut()
            .read_to_string()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::Http {
                status,
                message: truncate_body(&body),
            });
        }

        decode_json(&body)
    }
}

pub fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    Ok(serde_path_to_error::deserialize(de)?)
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

//! Weather providers and the normalisation seam between them and storage.
//!
//! Each provider turns its own response shape into a [`WeatherDocument`] via
//! [`Normalizer`]; [`WeatherSource`] adds the network fetch in front of that.

pub mod meteosource;
pub mod open_meteo;

use crate::client::{ClientError, WeatherClient};
use crate::models::weather::WeatherDocument;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenMeteo,
    Meteosource,
}

impl ProviderId {
    /// Storage collection the provider's documents are written to.
    pub fn collection(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "openmeteo",
            ProviderId::Meteosource => "meteosource",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenMeteo, ProviderId::Meteosource]
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationError {
    /// A block or value needed for the document was absent.
    MissingField(&'static str),
    /// A parallel hourly array is shorter than the time axis.
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationError::MissingField(name) => write!(f, "missing field `{}`", name),
            NormalizationError::LengthMismatch { field, expected, actual } => {
                write!(f, "hourly `{}` has {} value(s), expected at least {}", field, actual, expected)
            }
        }
    }
}

impl std::error::Error for NormalizationError {}

/// Why a provider produced no document.
#[derive(Debug)]
pub enum SourceError {
    /// The provider could not be set up (missing key, unknown tier).
    Init(String),
    /// The upstream call failed or returned an undecodable body.
    Fetch(ClientError),
    /// The response decoded but lacked what a document needs.
    Normalize(NormalizationError),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Init(s) => write!(f, "initialisation failed: {}", s),
            SourceError::Fetch(e) => write!(f, "fetch failed: {}", e),
            SourceError::Normalize(e) => write!(f, "normalisation failed: {}", e),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Init(_) => None,
            SourceError::Fetch(e) => Some(e),
            SourceError::Normalize(e) => Some(e),
        }
    }
}

impl From<ClientError> for SourceError {
    fn from(value: ClientError) -> Self {
        SourceError::Fetch(value)
    }
}

impl From<NormalizationError> for SourceError {
    fn from(value: NormalizationError) -> Self {
        SourceError::Normalize(value)
    }
}

/// Pure mapping from a provider response to the canonical document.
pub trait Normalizer {
    type Raw;

    fn normalize(&self, raw: Self::Raw, captured_at: &str) -> Result<WeatherDocument, NormalizationError>;
}

/// A provider that can be asked for a fresh document.
pub trait WeatherSource {
    fn id(&self) -> ProviderId;

    fn fetch_document(&self, client: &WeatherClient, captured_at: &str) -> Result<WeatherDocument, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_are_distinct() {
        let names: Vec<_> = ProviderId::all().iter().map(|p| p.collection()).collect();
        assert_eq!(names, vec!["openmeteo", "meteosource"]);
        assert_eq!(ProviderId::Meteosource.to_string(), "meteosource");
    }

    #[test]
    fn init_and_fetch_failures_are_distinguishable() {
        let init = SourceError::Init("no key".into());
        let normalize: SourceError = NormalizationError::MissingField("current").into();
        assert!(matches!(init, SourceError::Init(_)));
        assert!(matches!(normalize, SourceError::Normalize(_)));
        assert_eq!(normalize.to_string(), "normalisation failed: missing field `current`");
    }
}

use crate::client::WeatherClient;
use crate::config::LOCATION_NAME;
use crate::models::weather::WeatherDocument;
use crate::providers::WeatherSource;
use crate::services::storage::DocumentStore;
use crate::utils::capture_timestamp_now;
use log::{error, info, warn};

/// Fetch one document from `source` and store it in the source's collection.
///
/// Returns the stored identifier, or `None` when the fetch, normalisation or
/// write failed; failures are logged and never propagated.
pub fn capture_source(
    store: &mut dyn DocumentStore,
    client: &WeatherClient,
    source: &dyn WeatherSource,
) -> Option<String> {
    let id = source.id();
    let captured_at = capture_timestamp_now();
    info!("Capturing {} at {}", id, captured_at);

    let doc = match source.fetch_document(client, &captured_at) {
        Ok(doc) => doc,
        Err(e) => {
            error!("{}: {}", id, e);
            return None;
        }
    };

    log_summary(&doc);
    flag_native_precipitation(id.collection(), &doc);
    persist(store, id.collection(), &doc)
}

pub fn persist(store: &mut dyn DocumentStore, collection: &str, doc: &WeatherDocument) -> Option<String> {
    match store.insert_data(collection, doc) {
        Ok(id) => {
            info!("Document inserted into '{}' with id {}", collection, id);
            Some(id)
        }
        Err(e) => {
            error!("Inserting document into '{}' failed: {}", collection, e);
            None
        }
    }
}

fn log_summary(doc: &WeatherDocument) {
    info!("Location: {}", LOCATION_NAME);
    info!("Temperature: {}°C", doc.current.temperature);
    info!("Summary: {}", doc.current.summary);
    info!("Forecast: {} hour(s) processed", doc.hourly.data.len());
}

/// Warn about stored precipitation types outside `none`/`rain`/`snow`.
/// They are kept as delivered; this only makes them visible.
fn flag_native_precipitation(collection: &str, doc: &WeatherDocument) -> usize {
    let current = std::iter::once(("current", &doc.current.precipitation.kind));
    let hourly = doc
        .hourly
        .data
        .iter()
        .map(|h| (h.date.as_str(), &h.precipitation.kind));

    let mut flagged = 0;
    for (at, kind) in current.chain(hourly).filter(|(_, k)| !k.is_canonical()) {
        warn!("[{}] precipitation type '{}' at {} is outside none/rain/snow", collection, kind, at);
        flagged += 1;
    }
    flagged
}

//! Human-readable dumps of stored collections.

use crate::services::latest::{CaptureStamped, latest_document};
use crate::services::storage::DocumentStore;
use log::{error, info};
use serde_json::Value;

fn read_or_empty(store: &mut dyn DocumentStore, collection: &str) -> Vec<Value> {
    store.read_data(collection, None).unwrap_or_else(|e| {
        error!("Reading documents from '{}' failed: {}", collection, e);
        Vec::new()
    })
}

fn pretty(doc: &Value) -> String {
    serde_json::to_string_pretty(doc).unwrap_or_else(|_| doc.to_string())
}

/// Log every document of each collection with its position and capture time.
pub fn dump_collections(store: &mut dyn DocumentStore, collections: &[&str]) {
    for collection in collections {
        let docs = read_or_empty(store, collection);
        info!("======== {} document(s) in '{}' ========", docs.len(), collection);
        for (i, doc) in docs.iter().enumerate() {
            info!(
                "==== document {} ({}) ====\n{}",
                i + 1,
                doc.capture_timestamp().unwrap_or("-"),
                pretty(doc)
            );
        }
    }
}

/// Every capture timestamp of `docs`, in stored order; missing ones show as `-`.
pub fn capture_timestamps(docs: &[Value]) -> Vec<&str> {
    docs.iter().map(|d| d.capture_timestamp().unwrap_or("-")).collect()
}

/// Log the latest document of `collection` next to all stored capture times.
pub fn log_latest(store: &mut dyn DocumentStore, collection: &str) {
    let docs = read_or_empty(store, collection);
    let Some(latest) = latest_document(&docs) else {
        info!("{}: no documents stored", collection);
        return;
    };

    info!(
        "{}: latest document captured at {}",
        collection,
        latest.capture_timestamp().unwrap_or("-")
    );
    info!("{}: all capture timestamps: {}", collection, capture_timestamps(&docs).join(", "));
    info!("{}: latest document:\n{}", collection, pretty(latest));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::memory::MemoryStore;
    use serde_json::json;

    #[test]
    fn timestamps_keep_stored_order() {
        let docs = vec![
            json!({ "timestamp_captura": "2025-11-25 19:53:55" }),
            json!({ "other": true }),
            json!({ "timestamp_captura": "2025-11-24 08:00:00" }),
        ];
        assert_eq!(
            capture_timestamps(&docs),
            vec!["2025-11-25 19:53:55", "-", "2025-11-24 08:00:00"]
        );
    }

    #[test]
    fn reports_tolerate_unreadable_store() {
        let mut store = MemoryStore::new();
        store.fail_reads = true;
        dump_collections(&mut store, &["openmeteo", "meteosource"]);
        log_latest(&mut store, "openmeteo");
    }
}

//! Document storage keyed by collection name.
//!
//! Documents are written once and never updated. Reads return plain JSON with
//! the row identifier attached as a string `_id`.

use crate::db::models::{NewDocument, StoredDocument};
use crate::models::weather::WeatherDocument;
use crate::schema;
use diesel::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::info;
use serde_json::Value;
use std::fmt;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug)]
pub enum StorageError {
    Connection(String),
    Migration(String),
    Query(diesel::result::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Connection(s) => write!(f, "database connection failed: {}", s),
            StorageError::Migration(s) => write!(f, "applying database migrations failed: {}", s),
            StorageError::Query(e) => write!(f, "query failed: {}", e),
            StorageError::Encode(e) => write!(f, "document encoding failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Query(e) => Some(e),
            StorageError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<diesel::result::Error> for StorageError {
    fn from(value: diesel::result::Error) -> Self {
        StorageError::Query(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Encode(value)
    }
}

pub trait DocumentStore {
    /// Persist `document` in `collection`, returning its identifier.
    fn insert_data(&mut self, collection: &str, document: &WeatherDocument) -> Result<String, StorageError>;

    /// All documents of `collection` in insertion order. A `filter` object keeps only
    /// documents that contain it; `None` means every document.
    fn read_data(&mut self, collection: &str, filter: Option<&Value>) -> Result<Vec<Value>, StorageError>;
}

/// Postgres-backed store; owns its connection for the lifetime of the run.
pub struct PgDocumentStore {
    conn: PgConnection,
}

impl PgDocumentStore {
    pub fn connect(database_url: &str) -> Result<Self, StorageError> {
        let conn = PgConnection::establish(database_url).map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(PgDocumentStore { conn })
    }

    pub fn apply_migrations(&mut self) -> Result<(), StorageError> {
        let applied = self
            .conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        if applied.is_empty() {
            info!("Database schema is up to date; no migrations were applied");
        } else {
            let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
            info!("Applied {} database migration(s): {}", applied.len(), names);
        }
        Ok(())
    }
}

impl DocumentStore for PgDocumentStore {
    fn insert_data(&mut self, collection: &str, document: &WeatherDocument) -> Result<String, StorageError> {
        use schema::weather_documents::dsl as D;

        let row = NewDocument {
            collection,
            body: serde_json::to_value(document)?,
        };
        let id: i64 = diesel::insert_into(D::weather_documents)
            .values(&row)
            .returning(D::id)
            .get_result(&mut self.conn)?;
        Ok(id.to_string())
    }

    fn read_data(&mut self, collection: &str, filter: Option<&Value>) -> Result<Vec<Value>, StorageError> {
        use schema::weather_documents::dsl as D;

        let mut query = D::weather_documents
            .filter(D::collection.eq(collection))
            .select(StoredDocument::as_select())
            .order(D::id.asc())
            .into_boxed();
        if let Some(f) = filter {
            query = query.filter(D::body.contains(f.clone()));
        }

        let rows: Vec<StoredDocument> = query.load(&mut self.conn)?;
        Ok(rows.into_iter().map(StoredDocument::into_document).collect())
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use crate::db::models::with_id;
    use std::collections::BTreeMap;

    /// True when every key of `filter` appears in `doc` with a containing value,
    /// following JSONB `@>` semantics for objects, arrays and scalars.
    pub fn json_contains(doc: &Value, filter: &Value) -> bool {
        match (doc, filter) {
            (Value::Object(d), Value::Object(f)) => f
                .iter()
                .all(|(k, fv)| d.get(k).is_some_and(|dv| json_contains(dv, fv))),
            (Value::Array(d), Value::Array(f)) => f.iter().all(|fv| d.iter().any(|dv| json_contains(dv, fv))),
            (d, f) => d == f,
        }
    }

    /// In-process store used by service tests.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        collections: BTreeMap<String, Vec<Value>>,
        next_id: u64,
        pub fail_writes: bool,
        pub fail_reads: bool,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Store an arbitrary JSON document, bypassing the canonical type.
        pub fn push_raw(&mut self, collection: &str, body: Value) -> String {
            self.next_id += 1;
            let id = self.next_id.to_string();
            self.collections
                .entry(collection.to_string())
                .or_default()
                .push(with_id(body, &id));
            id
        }

        pub fn len(&self, collection: &str) -> usize {
            self.collections.get(collection).map_or(0, Vec::len)
        }
    }

    impl DocumentStore for MemoryStore {
        fn insert_data(&mut self, collection: &str, document: &WeatherDocument) -> Result<String, StorageError> {
            if self.fail_writes {
                return Err(StorageError::Connection("write rejected".into()));
            }
            let body = serde_json::to_value(document)?;
            Ok(self.push_raw(collection, body))
        }

        fn read_data(&mut self, collection: &str, filter: Option<&Value>) -> Result<Vec<Value>, StorageError> {
            if self.fail_reads {
                return Err(StorageError::Connection("store unreachable".into()));
            }
            let docs = self.collections.get(collection).cloned().unwrap_or_default();
            Ok(match filter {
                Some(f) => docs.into_iter().filter(|d| json_contains(d, f)).collect(),
                None => docs,
            })
        }
    }
}

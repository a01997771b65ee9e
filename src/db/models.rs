use crate::schema;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Name of the identifier field added to documents read back from storage.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = schema::weather_documents)]
pub struct StoredDocument {
    pub id: i64,
    pub collection: String,
    pub body: Value,
    pub inserted_at: DateTime<Utc>,
}

impl StoredDocument {
    /// The stored JSON with its identifier attached as a plain string.
    pub fn into_document(self) -> Value {
        with_id(self.body, &self.id.to_string())
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::weather_documents)]
pub struct NewDocument<'a> {
    pub collection: &'a str,
    pub body: Value,
}

/// Attach `_id` to an object document; non-object values are returned unchanged.
pub fn with_id(mut body: Value, id: &str) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    }
    body
}

/// All entity primary keys are UUIDs.
pub type EntityId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A record as exchanged with the storage port: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

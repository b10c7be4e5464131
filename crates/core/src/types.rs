/// Silo identifiers are facility-assigned integers.
pub type SiloId = i64;

/// Alert identifiers are random UUIDs, generated once at creation.
pub type AlertId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

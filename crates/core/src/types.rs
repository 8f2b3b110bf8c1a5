/// Primary-key type shared by every entity (BIGSERIAL in Postgres).
pub type DbId = i64;

/// Timestamps are always UTC on this side of the wire.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Storage row keys are PostgreSQL BIGSERIAL. They never leave the db crate;
/// items are addressed by their string id everywhere else.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Store-assigned record keys. Lexicographic order follows creation order.
pub type RecordKey = String;

/// Processing jobs are identified by a v7 UUID (time-ordered).
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

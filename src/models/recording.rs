use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Recording {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub filesize: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Metadata for a file that has been written to disk but not yet recorded.
#[derive(Debug, Clone)]
pub struct NewRecording {
    pub filename: String,
    pub filepath: String,
    pub filesize: i64,
}

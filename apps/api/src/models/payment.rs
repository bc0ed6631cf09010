use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable record of one enrollment purchase. Never deduplicated:
/// re-purchasing a course appends another record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub transaction_id: String,
    pub user_id: String,
    pub course_id: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

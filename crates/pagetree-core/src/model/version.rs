use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in a page's version history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub version_number: u32,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub change_summary: Option<String>,
    /// Title at the time the version was recorded; restored by
    /// `restore_version`.
    pub title: String,
}

//! Point-in-time attendance lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered person as the service identifies them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Display name.
    pub name: String,
    #[serde(rename = "roll")]
    /// Roll number, `roll` on the wire.
    pub roll_id: String,
}

impl Subject {
    /// A subject from name and roll.
    pub fn new(name: impl Into<String>, roll_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roll_id: roll_id.into(),
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (Roll: {})", self.name, self.roll_id)
    }
}

/// Today's attended / not-attended lists as last reported by the service.
///
/// Always replaced whole, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceStatusSnapshot {
    /// Marked present today, in service order.
    pub attended: Vec<Subject>,
    /// Registered but not yet marked today.
    pub not_attended: Vec<Subject>,
    /// When the snapshot was received.
    pub fetched_at: DateTime<Utc>,
}

impl AttendanceStatusSnapshot {
    /// Stamps the snapshot with the current time.
    pub fn new(attended: Vec<Subject>, not_attended: Vec<Subject>) -> Self {
        Self {
            attended,
            not_attended,
            fetched_at: Utc::now(),
        }
    }

    /// True if the subject appears in the attended list.
    pub fn has_attended(&self, subject: &Subject) -> bool {
        self.attended.iter().any(|s| s == subject)
    }
}

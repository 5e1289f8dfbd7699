use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Scheduling status derived from the event's start/end times at read time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MasterclassStatus {
    Upcoming,
    Live,
    Completed,
}

impl MasterclassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MasterclassStatus::Upcoming => "upcoming",
            MasterclassStatus::Live => "live",
            MasterclassStatus::Completed => "completed",
        }
    }
}

impl Display for MasterclassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

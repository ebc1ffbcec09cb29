//! Outcome status of a stored scrape record

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents how the latest scrape of a URL ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    /// The page was fetched and extracted
    Success,

    /// Every attempt failed; the record carries the last error
    Failed,

    /// Extraction produced an incomplete document
    Partial,
}

impl ScrapeStatus {
    /// Returns true if this represents a successful scrape
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all() -> [Self; 3] {
        [Self::Success, Self::Failed, Self::Partial]
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}

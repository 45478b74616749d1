//! Issue and action entries shared by every engine.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warning,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding or one performed action.
///
/// `subject` names the node, layer or bitmap, or a bucket such as `"Scene"`.
/// It serializes as `node` to keep the report schema stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub level: Level,
    #[serde(rename = "node")]
    pub subject: String,
    pub message: String,
}

/// Read-only finding from a scan
pub type IssueEntry = Entry;

/// Result of a mutating operation
pub type ActionEntry = Entry;

impl Entry {
    pub fn new(level: Level, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn info(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Info, subject, message)
    }

    pub fn warning(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, subject, message)
    }

    pub fn is_warning(&self) -> bool {
        self.level == Level::Warning
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", self.level, self.subject, self.message)
    }
}

/// Number of entries at `level`
pub fn count_level(entries: &[Entry], level: Level) -> usize {
    entries.iter().filter(|e| e.level == level).count()
}

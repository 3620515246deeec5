//! Filesystem change events.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Modify,
    Delete,
    /// The path was moved away; the destination arrives as a separate create.
    Move,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Modify => "modify",
            Operation::Delete => "delete",
            Operation::Move => "move",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change to a file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub operation: Operation,
    pub path: PathBuf,
}

impl SyncEvent {
    pub fn new(operation: Operation, path: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            path: path.into(),
        }
    }

    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self::new(Operation::Create, path)
    }

    pub fn modify(path: impl Into<PathBuf>) -> Self {
        Self::new(Operation::Modify, path)
    }

    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self::new(Operation::Delete, path)
    }

    pub fn moved(path: impl Into<PathBuf>) -> Self {
        Self::new(Operation::Move, path)
    }
}

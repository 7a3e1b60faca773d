use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage-generated row identifier for mind maps and their nodes.
pub type RowId = i64;

/// Caller-facing session identifier.
pub type SessionId = String;

/// Longest session id a caller may supply; matches the storage column width.
pub const MAX_SESSION_ID_CHARS: usize = 100;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

pub fn generate_session_id() -> SessionId {
    Uuid::new_v4().to_string()
}

/// Offset pagination as accepted by the list endpoints (`?skip=&limit=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }

    /// Clamp to a non-negative offset and a limit within `1..=MAX_PAGE_LIMIT`.
    pub fn normalized(self) -> Self {
        Self {
            skip: self.skip.max(0),
            limit: self.limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> usize {
        self.skip.max(0) as usize
    }

    pub fn take(&self) -> usize {
        self.limit.max(0) as usize
    }
}

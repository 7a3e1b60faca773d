use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{RowId, SessionId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSession {
    pub id: RowId,
    pub session_id: SessionId,
    pub user_ip: Option<String>,
    pub user_agent: Option<String>,
    pub total_queries: i32,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Client metadata recorded when a session is first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: SessionId,
    pub total_queries: i32,
    pub mindmap_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

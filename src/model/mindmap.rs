use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{GeneratedNode, RawPayload, RowId, SessionId};

/// One stored generation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMap {
    pub id: RowId,
    pub idea: String,
    pub session_id: Option<SessionId>,
    /// The external payload exactly as it was received
    pub raw_data: RawPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A flat, parent-linked node row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub id: RowId,
    /// Identifier supplied by the generation service; only unique within its payload, if at all
    pub node_id: i64,
    pub title: String,
    pub mindmap_id: RowId,
    pub parent_id: Option<RowId>,
    pub level: i32,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a mind map together with its node tree.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMindMap {
    pub idea: String,
    pub session_id: Option<SessionId>,
    pub raw_data: RawPayload,
    pub nodes: Vec<GeneratedNode>,
}

/// A mind map row and all of its node rows, as loaded from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct MindMapRecord {
    pub mindmap: MindMap,
    pub nodes: Vec<MindMapNode>,
}

/// A node with its children nested, rebuilt from flat rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapTreeNode {
    pub id: RowId,
    pub node_id: i64,
    pub title: String,
    pub parent_id: Option<RowId>,
    pub level: i32,
    pub order_index: i32,
    pub children: Vec<MindMapTreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapResponse {
    pub id: RowId,
    pub idea: String,
    pub session_id: Option<SessionId>,
    pub raw_data: RawPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub node_count: usize,
    pub nodes: Vec<MindMapTreeNode>,
}

impl MindMapResponse {
    pub fn from_record(record: MindMapRecord) -> Self {
        let node_count = record.nodes.len();
        let nodes = crate::logic::tree::build_tree(record.nodes);
        let mindmap = record.mindmap;

        Self {
            id: mindmap.id,
            idea: mindmap.idea,
            session_id: mindmap.session_id,
            raw_data: mindmap.raw_data,
            created_at: mindmap.created_at,
            updated_at: mindmap.updated_at,
            node_count,
            nodes,
        }
    }
}

/// List entry returned by the session and recent endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapSummary {
    pub id: RowId,
    pub idea: String,
    pub created_at: DateTime<Utc>,
    pub node_count: i64,
    pub session_id: Option<SessionId>,
}

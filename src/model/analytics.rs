use serde::{Deserialize, Serialize};

/// Row counts across the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTotals {
    pub total_mindmaps: i64,
    pub total_sessions: i64,
    pub total_nodes: i64,
}

/// Serialized as a `[keyword, count]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount(pub String, pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_mindmaps: i64,
    pub total_sessions: i64,
    pub total_nodes: i64,
    pub average_nodes_per_mindmap: f64,
    pub top_idea_keywords: Vec<KeywordCount>,
}

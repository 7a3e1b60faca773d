use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::logic::tree::plan_nodes;
use crate::model::{
    BusinessSession, ClientInfo, MindMap, MindMapNode, MindMapRecord, MindMapSummary, NewMindMap,
    Page, RowId, StoreTotals,
};
use crate::store::traits::{AnalyticsStore, MindMapStore, SessionStore, Store};

#[derive(Debug, Default)]
struct MemoryState {
    mindmaps: BTreeMap<RowId, MindMap>,
    /// Node rows keyed by owning mind map
    nodes: HashMap<RowId, Vec<MindMapNode>>,
    sessions: HashMap<String, BusinessSession>,
    next_mindmap_id: RowId,
    next_node_id: RowId,
    next_session_id: RowId,
}

impl MemoryState {
    fn summary(&self, mindmap: &MindMap) -> MindMapSummary {
        MindMapSummary {
            id: mindmap.id,
            idea: mindmap.idea.clone(),
            created_at: mindmap.created_at,
            node_count: self.nodes.get(&mindmap.id).map_or(0, |nodes| nodes.len() as i64),
            session_id: mindmap.session_id.clone(),
        }
    }
}

/// Process-local store used for development runs and tests.
///
/// Every operation takes the lock once, so each write is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MindMapStore for MemoryStore {
    async fn create_mindmap(&self, new_mindmap: NewMindMap) -> Result<MindMapRecord> {
        let plan = plan_nodes(&new_mindmap.nodes);
        let now = Utc::now();
        let mut state = self.state.write();

        state.next_mindmap_id += 1;
        let mindmap = MindMap {
            id: state.next_mindmap_id,
            idea: new_mindmap.idea,
            session_id: new_mindmap.session_id,
            raw_data: new_mindmap.raw_data,
            created_at: now,
            updated_at: now,
        };

        let mut nodes: Vec<MindMapNode> = Vec::with_capacity(plan.len());
        for planned in plan {
            state.next_node_id += 1;
            let parent_id = planned.parent.map(|parent| nodes[parent].id);
            nodes.push(MindMapNode {
                id: state.next_node_id,
                node_id: planned.node_id,
                title: planned.title,
                mindmap_id: mindmap.id,
                parent_id,
                level: planned.level,
                order_index: planned.order_index,
                created_at: now,
            });
        }

        state.mindmaps.insert(mindmap.id, mindmap.clone());
        state.nodes.insert(mindmap.id, nodes.clone());

        Ok(MindMapRecord { mindmap, nodes })
    }

    async fn get_mindmap(&self, id: RowId) -> Result<Option<MindMapRecord>> {
        let state = self.state.read();
        Ok(state.mindmaps.get(&id).map(|mindmap| MindMapRecord {
            mindmap: mindmap.clone(),
            nodes: state.nodes.get(&id).cloned().unwrap_or_default(),
        }))
    }

    async fn list_mindmaps_for_session(
        &self,
        session_id: &str,
        page: Page,
    ) -> Result<Vec<MindMapSummary>> {
        let state = self.state.read();
        Ok(state
            .mindmaps
            .values()
            .filter(|mindmap| mindmap.session_id.as_deref() == Some(session_id))
            .skip(page.offset())
            .take(page.take())
            .map(|mindmap| state.summary(mindmap))
            .collect())
    }

    async fn list_recent_mindmaps(&self, page: Page) -> Result<Vec<MindMapSummary>> {
        let state = self.state.read();
        let mut mindmaps: Vec<&MindMap> = state.mindmaps.values().collect();
        mindmaps.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(mindmaps
            .into_iter()
            .skip(page.offset())
            .take(page.take())
            .map(|mindmap| state.summary(mindmap))
            .collect())
    }

    async fn delete_mindmap(&self, id: RowId) -> Result<bool> {
        let mut state = self.state.write();
        let removed = state.mindmaps.remove(&id).is_some();
        // Cascade to the node rows
        state.nodes.remove(&id);
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn get_or_create_session(
        &self,
        session_id: &str,
        client: &ClientInfo,
    ) -> Result<BusinessSession> {
        let now = Utc::now();
        let mut state = self.state.write();

        if let Some(session) = state.sessions.get_mut(session_id) {
            session.last_activity = now;
            return Ok(session.clone());
        }

        state.next_session_id += 1;
        let session = BusinessSession {
            id: state.next_session_id,
            session_id: session_id.to_string(),
            user_ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            total_queries: 0,
            created_at: now,
            last_activity: now,
        };
        state.sessions.insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    async fn increment_session_queries(&self, session_id: &str) -> Result<Option<BusinessSession>> {
        let mut state = self.state.write();
        Ok(state.sessions.get_mut(session_id).map(|session| {
            session.total_queries += 1;
            session.last_activity = Utc::now();
            session.clone()
        }))
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<BusinessSession>> {
        Ok(self.state.read().sessions.get(session_id).cloned())
    }

    async fn count_mindmaps_for_session(&self, session_id: &str) -> Result<i64> {
        Ok(self
            .state
            .read()
            .mindmaps
            .values()
            .filter(|mindmap| mindmap.session_id.as_deref() == Some(session_id))
            .count() as i64)
    }
}

#[async_trait::async_trait]
impl AnalyticsStore for MemoryStore {
    async fn totals(&self) -> Result<StoreTotals> {
        let state = self.state.read();
        Ok(StoreTotals {
            total_mindmaps: state.mindmaps.len() as i64,
            total_sessions: state.sessions.len() as i64,
            total_nodes: state.nodes.values().map(|nodes| nodes.len() as i64).sum(),
        })
    }

    async fn list_ideas(&self) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .mindmaps
            .values()
            .map(|mindmap| mindmap.idea.clone())
            .collect())
    }
}

impl Store for MemoryStore {}

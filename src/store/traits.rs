use crate::model::{
    BusinessSession, ClientInfo, MindMapRecord, MindMapSummary, NewMindMap, Page, RowId,
    StoreTotals,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait MindMapStore: Send + Sync {
    /// Create a mind map and all of its nodes atomically
    async fn create_mindmap(&self, new_mindmap: NewMindMap) -> Result<MindMapRecord>;
    /// Get a mind map with its flat node rows
    async fn get_mindmap(&self, id: RowId) -> Result<Option<MindMapRecord>>;
    /// List mind maps recorded under a session, ordered by id
    async fn list_mindmaps_for_session(
        &self,
        session_id: &str,
        page: Page,
    ) -> Result<Vec<MindMapSummary>>;
    /// List mind maps newest first
    async fn list_recent_mindmaps(&self, page: Page) -> Result<Vec<MindMapSummary>>;
    /// Delete a mind map together with its nodes
    async fn delete_mindmap(&self, id: RowId) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert the session if unseen, otherwise refresh its last activity.
    /// Client metadata is only recorded on insert.
    async fn get_or_create_session(
        &self,
        session_id: &str,
        client: &ClientInfo,
    ) -> Result<BusinessSession>;
    /// Atomically bump the query counter; `None` if the session is unknown
    async fn increment_session_queries(&self, session_id: &str) -> Result<Option<BusinessSession>>;
    async fn get_session(&self, session_id: &str) -> Result<Option<BusinessSession>>;
    async fn count_mindmaps_for_session(&self, session_id: &str) -> Result<i64>;
}

#[async_trait::async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn totals(&self) -> Result<StoreTotals>;
    /// Every stored idea in mind map id order
    async fn list_ideas(&self) -> Result<Vec<String>>;
}

pub trait Store: MindMapStore + SessionStore + AnalyticsStore + Send + Sync {}

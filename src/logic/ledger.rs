use anyhow::Result;

use crate::model::SessionStats;
use crate::store::traits::Store;

pub struct SessionLedger;

impl SessionLedger {
    /// Query count and mind map count for a session; `None` if the session was never seen
    pub async fn stats<S: Store + ?Sized>(store: &S, session_id: &str) -> Result<Option<SessionStats>> {
        let Some(session) = store.get_session(session_id).await? else {
            return Ok(None);
        };
        let mindmap_count = store.count_mindmaps_for_session(session_id).await?;

        Ok(Some(SessionStats {
            session_id: session.session_id,
            total_queries: session.total_queries,
            mindmap_count,
            created_at: session.created_at,
            last_activity: session.last_activity,
        }))
    }
}

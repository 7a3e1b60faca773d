use std::sync::Arc;

use crate::config::TreeLimits;
use crate::error::{GenerationError, Result};
use crate::generator::IdeaGenerator;
use crate::logic::tree::count_nodes;
use crate::logic::validate::validate_payload;
use crate::model::{
    generate_session_id, ClientInfo, MindMapResponse, NewMindMap, SessionId, MAX_SESSION_ID_CHARS,
};
use crate::store::traits::Store;

/// Longest idea accepted from callers, in characters
pub const MAX_IDEA_CHARS: usize = 500;

/// Use the caller's session id verbatim, or mint a new one when none (or a blank one) is given.
pub fn resolve_session_id(session_id: Option<String>) -> Result<SessionId> {
    match session_id.filter(|id| !id.trim().is_empty()) {
        Some(id) if id.chars().count() > MAX_SESSION_ID_CHARS => Err(GenerationError::InvalidRequest(
            format!("session_id must be at most {} characters", MAX_SESSION_ID_CHARS),
        )),
        Some(id) => Ok(id),
        None => Ok(generate_session_id()),
    }
}

/// Records one generation event: session bookkeeping, the webhook call, and the tree write.
pub struct GenerationOrchestrator<S: ?Sized> {
    store: Arc<S>,
    generator: Arc<dyn IdeaGenerator>,
    limits: TreeLimits,
}

impl<S: ?Sized> Clone for GenerationOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
            limits: self.limits,
        }
    }
}

impl<S: Store + ?Sized> GenerationOrchestrator<S> {
    pub fn new(store: Arc<S>, generator: Arc<dyn IdeaGenerator>, limits: TreeLimits) -> Self {
        Self {
            store,
            generator,
            limits,
        }
    }

    pub fn generator(&self) -> &dyn IdeaGenerator {
        self.generator.as_ref()
    }

    /// Generate and persist a mind map for `idea`.
    ///
    /// Nothing is written for the mind map, and the session counter is left alone, unless the
    /// webhook answered with a well-formed tree.
    pub async fn generate(
        &self,
        idea: &str,
        session_id: Option<String>,
        client: &ClientInfo,
    ) -> Result<MindMapResponse> {
        let trimmed = idea.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::InvalidRequest("idea must not be empty".to_string()));
        }
        if trimmed.chars().count() > MAX_IDEA_CHARS {
            return Err(GenerationError::InvalidRequest(format!(
                "idea must be at most {} characters",
                MAX_IDEA_CHARS
            )));
        }

        let session_id = resolve_session_id(session_id)?;
        self.store.get_or_create_session(&session_id, client).await?;

        log::info!("Generating mind map for session {}", session_id);
        let payload = match self.generator.generate(idea).await {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Generation failed for session {}: {}", session_id, e);
                return Err(e);
            }
        };

        let tree = payload
            .to_value()
            .map_err(|e| GenerationError::invalid_shape(e.to_string()))?;
        let generated = validate_payload(&tree, &self.limits).map_err(|e| {
            log::warn!("Rejected webhook payload for session {}: {}", session_id, e);
            e
        })?;
        let node_total = count_nodes(&generated.nodes);

        let record = self
            .store
            .create_mindmap(NewMindMap {
                idea: generated.idea,
                session_id: Some(session_id.clone()),
                raw_data: payload,
                nodes: generated.nodes,
            })
            .await?;

        // The mind map is already committed, so a counter failure is logged rather than returned
        match self.store.increment_session_queries(&session_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                log::warn!("Session {} disappeared before its counter was updated", session_id);
            }
            Err(e) => log::error!(
                "Failed to count query for session {} after storing mind map {}: {:#}",
                session_id,
                record.mindmap.id,
                e
            ),
        }

        log::info!(
            "Stored mind map {} with {} nodes for session {}",
            record.mindmap.id,
            node_total,
            session_id
        );

        Ok(MindMapResponse::from_record(record))
    }
}

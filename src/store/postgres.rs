use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

use crate::logic::tree::plan_nodes;
use crate::model::{
    BusinessSession, ClientInfo, MindMap, MindMapNode, MindMapRecord, MindMapSummary, NewMindMap,
    Page, RawPayload, RowId, StoreTotals,
};
use crate::store::traits::{AnalyticsStore, MindMapStore, SessionStore, Store};

/// Idempotent bootstrap DDL, applied in order by [`PostgresStore::migrate`].
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS mindmaps (
        id BIGSERIAL PRIMARY KEY,
        idea TEXT NOT NULL,
        session_id VARCHAR(100),
        raw_data JSON NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_mindmaps_session_id ON mindmaps (session_id)",
    "CREATE INDEX IF NOT EXISTS idx_mindmaps_created_at ON mindmaps (created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS mindmap_nodes (
        id BIGSERIAL PRIMARY KEY,
        node_id BIGINT NOT NULL,
        title TEXT NOT NULL,
        parent_id BIGINT REFERENCES mindmap_nodes (id) ON DELETE CASCADE,
        mindmap_id BIGINT NOT NULL REFERENCES mindmaps (id) ON DELETE CASCADE,
        level INTEGER NOT NULL DEFAULT 0,
        order_index INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_mindmap_nodes_mindmap_id ON mindmap_nodes (mindmap_id)",
    // NULLS NOT DISTINCT needs PostgreSQL 15; roots are covered by the partial index below
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_mindmap_nodes_sibling_order
        ON mindmap_nodes (mindmap_id, parent_id, order_index)
        WHERE parent_id IS NOT NULL
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_mindmap_nodes_root_order
        ON mindmap_nodes (mindmap_id, order_index)
        WHERE parent_id IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS business_sessions (
        id BIGSERIAL PRIMARY KEY,
        session_id VARCHAR(100) NOT NULL UNIQUE,
        user_ip VARCHAR(45),
        user_agent TEXT,
        total_queries INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_activity TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

// `json` keeps the payload text as sent; reading it back as text avoids re-encoding
const MINDMAP_COLUMNS: &str =
    "id, idea, session_id, raw_data::text AS raw_data, created_at, updated_at";
const NODE_COLUMNS: &str =
    "id, node_id, title, mindmap_id, parent_id, level, order_index, created_at";
const SESSION_COLUMNS: &str =
    "id, session_id, user_ip, user_agent, total_queries, created_at, last_activity";
const SUMMARY_SELECT: &str = r#"
    SELECT m.id, m.idea, m.created_at, m.session_id,
           (SELECT COUNT(*) FROM mindmap_nodes n WHERE n.mindmap_id = m.id) AS node_count
    FROM mindmaps m
"#;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply schema")?;
        }
        log::info!("Database schema ready");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn mindmap_from_row(row: &PgRow) -> Result<MindMap> {
    let raw_data: String = row.get("raw_data");
    Ok(MindMap {
        id: row.get("id"),
        idea: row.get("idea"),
        session_id: row.get("session_id"),
        raw_data: RawPayload::from_text(raw_data).context("Stored raw_data is not valid JSON")?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn node_from_row(row: &PgRow) -> MindMapNode {
    MindMapNode {
        id: row.get("id"),
        node_id: row.get("node_id"),
        title: row.get("title"),
        mindmap_id: row.get("mindmap_id"),
        parent_id: row.get("parent_id"),
        level: row.get("level"),
        order_index: row.get("order_index"),
        created_at: row.get("created_at"),
    }
}

fn session_from_row(row: &PgRow) -> BusinessSession {
    BusinessSession {
        id: row.get("id"),
        session_id: row.get("session_id"),
        user_ip: row.get("user_ip"),
        user_agent: row.get("user_agent"),
        total_queries: row.get("total_queries"),
        created_at: row.get("created_at"),
        last_activity: row.get("last_activity"),
    }
}

fn summary_from_row(row: &PgRow) -> MindMapSummary {
    MindMapSummary {
        id: row.get("id"),
        idea: row.get("idea"),
        created_at: row.get("created_at"),
        node_count: row.get("node_count"),
        session_id: row.get("session_id"),
    }
}

#[async_trait::async_trait]
impl MindMapStore for PostgresStore {
    async fn create_mindmap(&self, new_mindmap: NewMindMap) -> Result<MindMapRecord> {
        let plan = plan_nodes(&new_mindmap.nodes);
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin mind map transaction")?;

        let row = sqlx::query(&format!(
            "INSERT INTO mindmaps (idea, session_id, raw_data) VALUES ($1, $2, $3::json) RETURNING {}",
            MINDMAP_COLUMNS
        ))
        .bind(&new_mindmap.idea)
        .bind(&new_mindmap.session_id)
        .bind(new_mindmap.raw_data.as_str())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert mind map")?;
        let mindmap = mindmap_from_row(&row)?;

        // Plan order guarantees a parent's id is known before any of its children is inserted
        let mut nodes: Vec<MindMapNode> = Vec::with_capacity(plan.len());
        for planned in plan {
            let parent_id = planned.parent.map(|parent| nodes[parent].id);
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO mindmap_nodes (node_id, title, parent_id, mindmap_id, level, order_index)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                NODE_COLUMNS
            ))
            .bind(planned.node_id)
            .bind(&planned.title)
            .bind(parent_id)
            .bind(mindmap.id)
            .bind(planned.level)
            .bind(planned.order_index)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to insert mind map node")?;
            nodes.push(node_from_row(&row));
        }

        tx.commit()
            .await
            .context("Failed to commit mind map transaction")?;

        Ok(MindMapRecord { mindmap, nodes })
    }

    async fn get_mindmap(&self, id: RowId) -> Result<Option<MindMapRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM mindmaps WHERE id = $1", MINDMAP_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch mind map")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let nodes = sqlx::query(&format!(
            "SELECT {} FROM mindmap_nodes WHERE mindmap_id = $1 ORDER BY level, order_index",
            NODE_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch mind map nodes")?;

        Ok(Some(MindMapRecord {
            mindmap: mindmap_from_row(&row)?,
            nodes: nodes.iter().map(node_from_row).collect(),
        }))
    }

    async fn list_mindmaps_for_session(
        &self,
        session_id: &str,
        page: Page,
    ) -> Result<Vec<MindMapSummary>> {
        let rows = sqlx::query(&format!(
            "{} WHERE m.session_id = $1 ORDER BY m.id OFFSET $2 LIMIT $3",
            SUMMARY_SELECT
        ))
        .bind(session_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list session mind maps")?;

        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn list_recent_mindmaps(&self, page: Page) -> Result<Vec<MindMapSummary>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY m.created_at DESC, m.id DESC OFFSET $1 LIMIT $2",
            SUMMARY_SELECT
        ))
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list recent mind maps")?;

        Ok(rows.iter().map(summary_from_row).collect())
    }

    async fn delete_mindmap(&self, id: RowId) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin delete")?;

        // Explicit cascade, independent of the FK action
        sqlx::query("DELETE FROM mindmap_nodes WHERE mindmap_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete mind map nodes")?;

        let result = sqlx::query("DELETE FROM mindmaps WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete mind map")?;

        tx.commit().await.context("Failed to commit delete")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl SessionStore for PostgresStore {
    async fn get_or_create_session(
        &self,
        session_id: &str,
        client: &ClientInfo,
    ) -> Result<BusinessSession> {
        // A concurrent first contact lands in the conflict branch and reads the winner's row
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO business_sessions (session_id, user_ip, user_agent)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id) DO UPDATE SET
                last_activity = NOW()
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(&client.ip)
        .bind(&client.user_agent)
        .fetch_one(&self.pool)
        .await
        .context("Failed to get or create session")?;

        Ok(session_from_row(&row))
    }

    async fn increment_session_queries(&self, session_id: &str) -> Result<Option<BusinessSession>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE business_sessions
            SET total_queries = total_queries + 1, last_activity = NOW()
            WHERE session_id = $1
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to increment session queries")?;

        Ok(row.as_ref().map(session_from_row))
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<BusinessSession>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM business_sessions WHERE session_id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch session")?;

        Ok(row.as_ref().map(session_from_row))
    }

    async fn count_mindmaps_for_session(&self, session_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mindmaps WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count session mind maps")?;

        Ok(count)
    }
}

#[async_trait::async_trait]
impl AnalyticsStore for PostgresStore {
    async fn totals(&self) -> Result<StoreTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM mindmaps) AS total_mindmaps,
                (SELECT COUNT(*) FROM business_sessions) AS total_sessions,
                (SELECT COUNT(*) FROM mindmap_nodes) AS total_nodes
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count rows")?;

        Ok(StoreTotals {
            total_mindmaps: row.get("total_mindmaps"),
            total_sessions: row.get("total_sessions"),
            total_nodes: row.get("total_nodes"),
        })
    }

    async fn list_ideas(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT idea FROM mindmaps ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list ideas")
    }
}

impl Store for PostgresStore {}

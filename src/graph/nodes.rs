//! Node storage operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

use super::model::{Dates, GraphStats, Node, NodeKind};
use crate::error::{GraphError, StoreError};
use crate::Result;

/// Insert or replace a node by id. Idempotent.
///
/// # Errors
///
/// Returns an error if the database operation fails or if entity metadata
/// cannot be serialized.
pub fn upsert_node(conn: &Connection, node: &Node) -> Result<()> {
    let (mtime_ms, frontmatter, dates) = match node {
        Node::Entity {
            mtime_ms,
            frontmatter,
            dates,
            ..
        } => {
            let fm = frontmatter
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| StoreError::Database(format!("frontmatter serialization: {e}")))?;
            (Some(*mtime_ms), fm, dates.clone())
        }
        Node::Virtual { .. } | Node::Tag { .. } => (None, None, Dates::default()),
    };

    conn.execute(
        "INSERT INTO nodes (id, kind, mtime_ms, frontmatter, date_created, date_modified, date_published)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           kind = excluded.kind,
           mtime_ms = excluded.mtime_ms,
           frontmatter = excluded.frontmatter,
           date_created = excluded.date_created,
           date_modified = excluded.date_modified,
           date_published = excluded.date_published",
        rusqlite::params![
            node.id(),
            node.kind().as_str(),
            mtime_ms,
            frontmatter,
            dates.created.map(|d| d.to_rfc3339()),
            dates.modified.map(|d| d.to_rfc3339()),
            dates.published.map(|d| d.to_rfc3339()),
        ],
    )
    .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(())
}

/// Delete a node by id. A no-op when the node does not exist.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn delete_node(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM nodes WHERE id = ?", [id])
        .map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(())
}

/// Get a single node by id.
///
/// # Errors
///
/// Returns an error if the database query fails or the stored row violates
/// the node invariants.
pub fn get_node(conn: &Connection, id: &str) -> Result<Option<Node>> {
    let result = conn.query_row(
        "SELECT id, kind, mtime_ms, frontmatter, date_created, date_modified, date_published
         FROM nodes WHERE id = ?",
        [id],
        node_from_row,
    );

    match result {
        Ok(node) => Ok(Some(node?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Database(e.to_string()).into()),
    }
}

/// Get all nodes, ordered by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn all_nodes(conn: &Connection) -> Result<Vec<Node>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, kind, mtime_ms, frontmatter, date_created, date_modified, date_published
             FROM nodes ORDER BY id",
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

    let rows = stmt
        .query_map([], node_from_row)
        .map_err(|e| StoreError::Database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Database(e.to_string()))?;

    rows.into_iter().collect()
}

/// Load all entity (id, mtime) pairs in one pass.
///
/// Used by change detection to stay O(files + entities).
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn entity_mtimes(conn: &Connection) -> Result<HashMap<String, i64>> {
    let mut stmt = conn
        .prepare("SELECT id, COALESCE(mtime_ms, 0) FROM nodes WHERE kind = 'entity'")
        .map_err(|e| StoreError::Database(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
        .map_err(|e| StoreError::Database(e.to_string()))?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(rows)
}

/// Set the stored mtime for an entity node.
///
/// Leaves non-entity nodes untouched.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn set_entity_mtime(conn: &Connection, id: &str, mtime_ms: i64) -> Result<()> {
    conn.execute(
        "UPDATE nodes SET mtime_ms = ? WHERE id = ? AND kind = 'entity'",
        rusqlite::params![mtime_ms, id],
    )
    .map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(())
}

/// Graph statistics: counts per node kind plus the edge count.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn stats(conn: &Connection) -> Result<GraphStats> {
    let count = |sql: &str| -> Result<i64> {
        conn.query_row(sql, [], |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()).into())
    };

    Ok(GraphStats {
        entity_count: count("SELECT COUNT(*) FROM nodes WHERE kind = 'entity'")?,
        virtual_count: count("SELECT COUNT(*) FROM nodes WHERE kind = 'virtual'")?,
        tag_count: count("SELECT COUNT(*) FROM nodes WHERE kind = 'tag'")?,
        edge_count: count("SELECT COUNT(*) FROM edges")?,
    })
}

/// Map a node row into the sum type.
fn node_from_row(row: &Row<'_>) -> std::result::Result<Result<Node>, rusqlite::Error> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let mtime_ms: Option<i64> = row.get(2)?;
    let frontmatter: Option<String> = row.get(3)?;
    let date_created: Option<String> = row.get(4)?;
    let date_modified: Option<String> = row.get(5)?;
    let date_published: Option<String> = row.get(6)?;

    Ok(build_node(
        id,
        &kind,
        mtime_ms,
        frontmatter,
        date_created,
        date_modified,
        date_published,
    ))
}

fn build_node(
    id: String,
    kind: &str,
    mtime_ms: Option<i64>,
    frontmatter: Option<String>,
    date_created: Option<String>,
    date_modified: Option<String>,
    date_published: Option<String>,
) -> Result<Node> {
    let Some(kind) = NodeKind::parse(kind) else {
        return Err(GraphError::consistency(format!("node '{id}' has unknown kind '{kind}'")).into());
    };

    match kind {
        NodeKind::Entity => {
            let frontmatter = frontmatter
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| {
                    GraphError::consistency(format!("node '{id}' has corrupt frontmatter: {e}"))
                })?;

            Ok(Node::Entity {
                id,
                mtime_ms: mtime_ms.unwrap_or(0),
                frontmatter,
                dates: Dates {
                    created: parse_date(date_created.as_deref()),
                    modified: parse_date(date_modified.as_deref()),
                    published: parse_date(date_published.as_deref()),
                },
            })
        }
        NodeKind::Virtual => Ok(Node::Virtual { id }),
        NodeKind::Tag => Ok(Node::Tag { id }),
    }
}

fn parse_date(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

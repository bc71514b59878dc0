//! Edge storage operations.

use rusqlite::Connection;

use super::model::{Edge, EdgeKind};
use crate::error::{GraphError, StoreError};
use crate::Result;

/// Add an edge. Duplicates (same source, target, kind) are ignored.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn add_edge(conn: &Connection, edge: &Edge) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO edges (source, target, kind) VALUES (?, ?, ?)",
        rusqlite::params![edge.source, edge.target, edge.kind.as_str()],
    )
    .map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(())
}

/// Delete a node's outgoing edges, optionally restricted to one kind.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn delete_outgoing_edges(conn: &Connection, id: &str, kind: Option<EdgeKind>) -> Result<()> {
    match kind {
        Some(kind) => conn
            .execute(
                "DELETE FROM edges WHERE source = ? AND kind = ?",
                rusqlite::params![id, kind.as_str()],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?,
        None => conn
            .execute("DELETE FROM edges WHERE source = ?", [id])
            .map_err(|e| StoreError::Database(e.to_string()))?,
    };
    Ok(())
}

/// Get a node's outgoing edges, optionally restricted to one kind.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn outgoing_edges(conn: &Connection, id: &str, kind: Option<EdgeKind>) -> Result<Vec<Edge>> {
    let (sql, params): (&str, Vec<&dyn rusqlite::ToSql>) = match kind {
        Some(ref kind_ref) => (
            "SELECT source, target, kind FROM edges
             WHERE source = ? AND kind = ? ORDER BY edge_id",
            vec![&id as &dyn rusqlite::ToSql, kind_ref as &dyn rusqlite::ToSql],
        ),
        None => (
            "SELECT source, target, kind FROM edges WHERE source = ? ORDER BY edge_id",
            vec![&id as &dyn rusqlite::ToSql],
        ),
    };

    query_edges(conn, sql, &params)
}

/// Get a node's incoming edges.
///
/// Used to render referrer listings for virtual placeholder pages.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn incoming_edges(conn: &Connection, id: &str) -> Result<Vec<Edge>> {
    query_edges(
        conn,
        "SELECT source, target, kind FROM edges WHERE target = ? ORDER BY edge_id",
        &[&id as &dyn rusqlite::ToSql],
    )
}

/// Get every edge in the graph, in insertion order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn all_edges(conn: &Connection) -> Result<Vec<Edge>> {
    query_edges(
        conn,
        "SELECT source, target, kind FROM edges ORDER BY source, target, kind",
        &[],
    )
}

/// Check whether any edge targets this node.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn has_incoming_edges(conn: &Connection, id: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM edges WHERE target = ?", [id], |row| {
            row.get(0)
        })
        .map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(count > 0)
}

impl rusqlite::ToSql for EdgeKind {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

fn query_edges(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Edge>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| StoreError::Database(e.to_string()))?;

    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| StoreError::Database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Database(e.to_string()))?;

    rows.into_iter()
        .map(|(source, target, kind)| {
            let kind = EdgeKind::parse(&kind).ok_or_else(|| {
                GraphError::consistency(format!("edge {source} -> {target} has unknown kind '{kind}'"))
            })?;
            Ok(Edge {
                source,
                target,
                kind,
            })
        })
        .collect()
}

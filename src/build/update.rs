//! Applies parsed-document deltas to the graph.
//!
//! The whole batch runs inside one store transaction: deletions first, then
//! changed documents. Any error rolls the entire batch back - partial graph
//! mutations from a multi-document batch are never observable.

use std::path::Path;

use rusqlite::Connection;

use crate::error::GraphError;
use crate::graph::{
    add_edge, delete_node, delete_outgoing_edges, entity_path, get_node, has_incoming_edges,
    set_entity_mtime, stats, tag_node_id, upsert_node, Document, Edge, EdgeKind, GraphStore, Node,
    NodeKind,
};
use crate::Result;

/// Apply a change batch to the graph in one transaction.
///
/// Deletions are processed before insertions so a rename (delete A +
/// create B) never produces a spurious virtual node for B. Entity mtimes are
/// written as placeholders; call [`fix_entity_mtimes`] after the commit once
/// the authoritative on-disk mtimes are known.
///
/// Tag nodes are never removed here, even when their last referencing
/// entity disappears: empty tag pages are intentionally retained.
///
/// # Errors
///
/// Any error rolls back the whole batch and is re-raised.
pub fn apply_changes(
    store: &GraphStore,
    parsed: &[Document],
    deleted_ids: &[String],
) -> Result<()> {
    store.transaction(|conn| {
        for id in deleted_ids {
            delete_entity(conn, id)?;
        }

        for doc in parsed {
            upsert_document(conn, doc)?;
        }

        // A virtual node that lost its last referrer in this batch is gone:
        // no zero-edge placeholder survives a build.
        prune_orphan_virtuals(conn)?;

        Ok(())
    })?;

    if let Ok(s) = store.with_conn(stats) {
        tracing::info!(
            entities = s.entity_count,
            virtuals = s.virtual_count,
            tags = s.tag_count,
            edges = s.edge_count,
            "Graph updated"
        );
    }

    Ok(())
}

/// Remove one deleted document from the graph.
///
/// An id that still has incoming edges degrades to a virtual placeholder
/// (out-edges cleared, entity fields cleared); otherwise the node and its
/// edges are deleted outright. An id with no node is skipped.
fn delete_entity(conn: &Connection, id: &str) -> Result<()> {
    if get_node(conn, id)?.is_none() {
        return Ok(());
    }

    if has_incoming_edges(conn, id)? {
        delete_outgoing_edges(conn, id, None)?;
        upsert_node(conn, &Node::Virtual { id: id.to_string() })?;
        tracing::debug!(id, "Entity degraded to virtual");
    } else {
        delete_node(conn, id)?;
        delete_outgoing_edges(conn, id, None)?;
        tracing::debug!(id, "Entity deleted");
    }

    Ok(())
}

/// Upsert one changed document: entity node plus replaced link/tag edges.
fn upsert_document(conn: &Connection, doc: &Document) -> Result<()> {
    let id = doc.id();

    if let Some(existing) = get_node(conn, &id)? {
        if existing.kind() == NodeKind::Virtual {
            tracing::debug!(id, "Virtual promoted to entity");
        }
    }

    // Placeholder mtime; corrected after commit from the on-disk stat.
    upsert_node(
        conn,
        &Node::Entity {
            id: id.clone(),
            mtime_ms: 0,
            frontmatter: doc.frontmatter.clone(),
            dates: doc.dates.clone(),
        },
    )?;

    delete_outgoing_edges(conn, &id, Some(EdgeKind::Link))?;
    for target in &doc.links {
        add_edge(conn, &Edge::link(id.clone(), target.clone()))?;
        if get_node(conn, target)?.is_none() {
            upsert_node(conn, &Node::Virtual { id: target.clone() })?;
        }
    }

    delete_outgoing_edges(conn, &id, Some(EdgeKind::Tag))?;
    for tag in &doc.tags {
        let tag_id = tag_node_id(tag);
        match get_node(conn, &tag_id)? {
            None => upsert_node(conn, &Node::Tag { id: tag_id.clone() })?,
            Some(node) if node.kind() == NodeKind::Tag => {}
            Some(node) => {
                return Err(GraphError::consistency(format!(
                    "tag edge target '{tag_id}' is a {} node",
                    node.kind().as_str()
                ))
                .into());
            }
        }
        add_edge(conn, &Edge::tag(id.clone(), tag_id))?;
    }

    Ok(())
}

/// Delete virtual nodes no longer targeted by any edge.
fn prune_orphan_virtuals(conn: &Connection) -> Result<()> {
    let pruned = conn
        .execute(
            "DELETE FROM nodes
             WHERE kind = 'virtual'
               AND id NOT IN (SELECT DISTINCT target FROM edges)",
            [],
        )
        .map_err(|e| crate::error::StoreError::Database(e.to_string()))?;

    if pruned > 0 {
        tracing::debug!(pruned, "Pruned orphan virtual nodes");
    }
    Ok(())
}

/// Correct placeholder mtimes from the authoritative on-disk stat.
///
/// Runs after the batch transaction commits, so a document rewritten while
/// the batch was in flight stays marked as changed for the next build. A
/// failed stat is logged and skipped.
pub fn fix_entity_mtimes(store: &GraphStore, content_dir: &Path, parsed: &[Document]) -> Result<()> {
    for doc in parsed {
        let id = doc.id();
        let full_path = content_dir.join(entity_path(&id));

        match super::scan::mtime_ms(&full_path) {
            Ok(mtime) => {
                store.with_conn(|conn| set_entity_mtime(conn, &id, mtime))?;
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "Failed to stat document for mtime update");
            }
        }
    }
    Ok(())
}

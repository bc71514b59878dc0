//! Persistent content graph.
//!
//! `SQLite`-backed node/edge storage with transactions. Nodes come in three
//! kinds (entity, virtual, tag); edges are directed and unique per
//! (source, target, kind). A single metadata row holds the content-root
//! fingerprint used for full cache invalidation.

pub mod edges;
pub mod meta;
pub mod model;
pub mod nodes;
mod schema;
mod store;

pub use edges::{
    add_edge, all_edges, delete_outgoing_edges, has_incoming_edges, incoming_edges, outgoing_edges,
};
pub use meta::{clear_all, root_fingerprint, store_root_fingerprint, stored_root_fingerprint};
pub use model::{
    doc_id, entity_path, tag_node_id, title_from_frontmatter, ContentRecord, Dates, Document, Edge,
    EdgeKind, GraphStats, Node, NodeKind, TAG_PREFIX,
};
pub use nodes::{
    all_nodes, delete_node, entity_mtimes, get_node, set_entity_mtime, stats, upsert_node,
};
pub use schema::{migrate, verify_schema, SCHEMA_VERSION};
pub use store::GraphStore;

/// Open the graph with migrations applied and the schema verified.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init_graph(store: &GraphStore) -> crate::Result<()> {
    store.with_conn(|conn| {
        migrate(conn)?;
        verify_schema(conn)?;

        let s = stats(conn)?;
        tracing::info!(
            entities = s.entity_count,
            virtuals = s.virtual_count,
            tags = s.tag_count,
            edges = s.edge_count,
            "Graph cache initialized, schema version {SCHEMA_VERSION}"
        );
        Ok(())
    })
}

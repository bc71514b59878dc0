//! Reconstructs the complete logical record set.
//!
//! Untouched documents are synthesized from stored graph metadata with an
//! empty body; only changed documents carry fresh parses. Downstream
//! consumers treat an empty body as "metadata only, no re-render needed".

use std::collections::HashSet;

use rusqlite::Connection;

use crate::graph::{
    all_nodes, outgoing_edges, title_from_frontmatter, ContentRecord, Document, EdgeKind, Node,
    TAG_PREFIX,
};
use crate::Result;

/// Produce the complete record set after a graph update.
///
/// The union of synthesized and freshly parsed records has exactly one
/// record per entity node: no duplicates, no omissions, and no virtual or
/// tag nodes leak in. Sorted by id.
///
/// # Errors
///
/// Returns an error if stored metadata cannot be read.
pub fn reconstruct(conn: &Connection, parsed: &[Document]) -> Result<Vec<ContentRecord>> {
    let mut fresh_ids: HashSet<String> = HashSet::new();
    let mut records: Vec<ContentRecord> = Vec::new();

    for doc in parsed {
        let record = ContentRecord::from_document(doc);
        if fresh_ids.insert(record.id.clone()) {
            records.push(record);
        }
    }

    for node in all_nodes(conn)? {
        let Node::Entity {
            id,
            frontmatter,
            dates,
            ..
        } = node
        else {
            continue;
        };

        if fresh_ids.contains(&id) {
            continue;
        }

        let links = outgoing_edges(conn, &id, Some(EdgeKind::Link))?
            .into_iter()
            .map(|e| e.target)
            .collect();

        let tags = outgoing_edges(conn, &id, Some(EdgeKind::Tag))?
            .into_iter()
            .map(|e| {
                e.target
                    .strip_prefix(TAG_PREFIX)
                    .map_or(e.target.clone(), String::from)
            })
            .collect();

        let title = title_from_frontmatter(frontmatter.as_ref()).unwrap_or_else(|| id.clone());

        records.push(ContentRecord {
            slug: id.clone(),
            id,
            title,
            frontmatter,
            dates,
            links,
            tags,
            body: String::new(),
        });
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::update::apply_changes;
    use crate::graph::{migrate, GraphStore};

    fn setup() -> GraphStore {
        let store = GraphStore::open_in_memory().unwrap();
        store.with_conn(migrate).unwrap();
        store
    }

    fn doc(path: &str, links: &[&str], tags: &[&str]) -> Document {
        Document {
            relative_path: path.to_string(),
            frontmatter: Some(serde_json::json!({"title": format!("Title of {path}")})),
            links: links.iter().map(|s| (*s).to_string()).collect(),
            tags: tags.iter().map(|s| (*s).to_string()).collect(),
            body: format!("body of {path}"),
            ..Document::default()
        }
    }

    #[test]
    fn test_one_record_per_entity() {
        let store = setup();
        apply_changes(
            &store,
            &[
                doc("a.md", &["b", "ghost"], &["rust"]),
                doc("b.md", &[], &[]),
            ],
            &[],
        )
        .unwrap();

        // Second build: only a changed.
        let changed = [doc("a.md", &["b", "ghost"], &["rust"])];
        apply_changes(&store, &changed, &[]).unwrap();

        let records = store
            .with_conn(|conn| reconstruct(conn, &changed))
            .unwrap();

        // Exactly a and b; ghost (virtual) and tags/rust never leak in.
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_fresh_record_has_body_cached_is_empty() {
        let store = setup();
        apply_changes(&store, &[doc("a.md", &[], &[]), doc("b.md", &[], &[])], &[]).unwrap();

        let changed = [doc("a.md", &[], &[])];
        let records = store
            .with_conn(|conn| reconstruct(conn, &changed))
            .unwrap();

        let a = records.iter().find(|r| r.id == "a").unwrap();
        let b = records.iter().find(|r| r.id == "b").unwrap();
        assert_eq!(a.body, "body of a.md");
        assert!(b.is_metadata_only());
        // Cached metadata still round-trips.
        assert_eq!(b.title, "Title of b.md");
    }

    #[test]
    fn test_synthesized_record_restores_links_and_tags() {
        let store = setup();
        apply_changes(&store, &[doc("a.md", &["b"], &["rust", "graphs"])], &[]).unwrap();

        let records = store.with_conn(|conn| reconstruct(conn, &[])).unwrap();
        let a = records.iter().find(|r| r.id == "a").unwrap();
        assert_eq!(a.links, vec!["b"]);
        assert_eq!(a.tags, vec!["rust", "graphs"]);
    }

    #[test]
    fn test_title_falls_back_to_id() {
        let store = setup();
        let plain = Document {
            relative_path: "plain.md".to_string(),
            body: "x".to_string(),
            ..Document::default()
        };
        apply_changes(&store, std::slice::from_ref(&plain), &[]).unwrap();

        let records = store.with_conn(|conn| reconstruct(conn, &[])).unwrap();
        assert_eq!(records[0].title, "plain");
    }

    #[test]
    fn test_deleted_entity_yields_no_record() {
        let store = setup();
        apply_changes(&store, &[doc("a.md", &[], &[]), doc("b.md", &[], &[])], &[]).unwrap();
        apply_changes(&store, &[], &["b".to_string()]).unwrap();

        let records = store.with_conn(|conn| reconstruct(conn, &[])).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }
}

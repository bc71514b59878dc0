//! Built-in output stages.

use std::path::{Path, PathBuf};

use crate::build::emit::{write_artifact, ChangeEvent, ChangeKind, EmitContext, EmitStage};
use crate::graph::{all_nodes, incoming_edges, ContentRecord, GraphStore, Node};
use crate::Result;

/// Renders one HTML page per document.
pub struct ContentPageStage;

impl ContentPageStage {
    fn render(record: &ContentRecord) -> String {
        let links = record
            .links
            .iter()
            .map(|target| format!("<li><a href=\"/{target}.html\">{target}</a></li>"))
            .collect::<Vec<_>>()
            .join("\n");
        let tags = record.tags.join(", ");

        format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n\
             <h1>{title}</h1>\n<article>\n{body}\n</article>\n\
             <nav><ul>\n{links}\n</ul></nav>\n<footer>{tags}</footer>\n</body>\n</html>\n",
            title = record.title,
            body = record.body,
        )
    }

    fn emit_record(ctx: &EmitContext, record: &ContentRecord) -> Result<PathBuf> {
        let path = ctx.artifact_path(&record.id);
        write_artifact(&path, &Self::render(record))?;
        Ok(path)
    }
}

impl EmitStage for ContentPageStage {
    fn name(&self) -> &'static str {
        "content-page"
    }

    fn supports_partial(&self) -> bool {
        true
    }

    fn full(&self, ctx: &EmitContext, records: &[ContentRecord]) -> Result<Vec<PathBuf>> {
        let mut artifacts = Vec::new();
        for record in records {
            // Metadata-only records already have a current page on disk.
            if record.is_metadata_only() {
                continue;
            }
            artifacts.push(Self::emit_record(ctx, record)?);
        }
        Ok(artifacts)
    }

    fn partial(
        &self,
        ctx: &EmitContext,
        _records: &[ContentRecord],
        events: &[ChangeEvent],
    ) -> Result<Option<Vec<PathBuf>>> {
        let mut artifacts = Vec::new();
        for event in events {
            if event.kind == ChangeKind::Delete {
                continue;
            }
            if let Some(record) = &event.record {
                if record.is_metadata_only() {
                    continue;
                }
                artifacts.push(Self::emit_record(ctx, record)?);
            }
        }
        if artifacts.is_empty() {
            return Ok(None);
        }
        Ok(Some(artifacts))
    }
}

/// Writes a site-wide `index.json` over the complete record set.
pub struct ContentIndexStage;

impl ContentIndexStage {
    fn emit_index(ctx: &EmitContext, records: &[ContentRecord]) -> Result<PathBuf> {
        let path = ctx.output_dir.join("index.json");
        let index = serde_json::to_string_pretty(records)
            .map_err(|e| crate::Error::internal(format!("Failed to serialize index: {e}")))?;
        write_artifact(&path, &index)?;
        Ok(path)
    }
}

impl EmitStage for ContentIndexStage {
    fn name(&self) -> &'static str {
        "content-index"
    }

    fn supports_partial(&self) -> bool {
        true
    }

    fn full(&self, ctx: &EmitContext, records: &[ContentRecord]) -> Result<Vec<PathBuf>> {
        Ok(vec![Self::emit_index(ctx, records)?])
    }

    fn partial(
        &self,
        ctx: &EmitContext,
        records: &[ContentRecord],
        _events: &[ChangeEvent],
    ) -> Result<Option<Vec<PathBuf>>> {
        // The index is global but cheap: rebuild it from the reconstructed
        // record set rather than falling back to a full page pass.
        Ok(Some(vec![Self::emit_index(ctx, records)?]))
    }
}

/// Renders a stub page for every virtual node, listing its referrers.
///
/// A dangling `[[target]]` and a deleted-but-still-linked document both get
/// a placeholder page so inbound links keep resolving.
pub struct VirtualPageStage {
    store: GraphStore,
}

impl VirtualPageStage {
    #[must_use]
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    fn render(id: &str, referrers: &[String]) -> String {
        let backlinks = if referrers.is_empty() {
            "<p>No backlinks found.</p>".to_string()
        } else {
            let items = referrers
                .iter()
                .map(|source| format!("<li><a href=\"/{source}.html\">{source}</a></li>"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("<ul>\n{items}\n</ul>")
        };

        format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{id}</title></head>\n<body>\n\
             <article>\n<h1>{id}</h1>\n\
             <p>This page does not exist yet, but it is referenced by:</p>\n\
             {backlinks}\n</article>\n</body>\n</html>\n"
        )
    }

    fn emit_stubs(&self, ctx: &EmitContext) -> Result<Vec<PathBuf>> {
        self.store.with_read_conn(|conn| {
            let mut artifacts = Vec::new();
            for node in all_nodes(conn)? {
                let Node::Virtual { id } = node else {
                    continue;
                };
                let referrers: Vec<String> = incoming_edges(conn, &id)?
                    .into_iter()
                    .map(|e| e.source)
                    .collect();

                let path = ctx.artifact_path(&id);
                write_artifact(&path, &Self::render(&id, &referrers))?;
                artifacts.push(path);
            }
            Ok(artifacts)
        })
    }
}

impl EmitStage for VirtualPageStage {
    fn name(&self) -> &'static str {
        "virtual-page"
    }

    fn supports_partial(&self) -> bool {
        true
    }

    fn full(&self, ctx: &EmitContext, _records: &[ContentRecord]) -> Result<Vec<PathBuf>> {
        self.emit_stubs(ctx)
    }

    // Any change batch can create or remove virtual nodes, so partial passes
    // recompute every stub from the graph; the set is small and cheap.
    fn partial(
        &self,
        ctx: &EmitContext,
        _records: &[ContentRecord],
        _events: &[ChangeEvent],
    ) -> Result<Option<Vec<PathBuf>>> {
        let artifacts = self.emit_stubs(ctx)?;
        if artifacts.is_empty() {
            return Ok(None);
        }
        Ok(Some(artifacts))
    }
}

/// Copies the static asset tree into the output directory. Full-only.
pub struct StaticCopyStage {
    static_dir: PathBuf,
}

impl StaticCopyStage {
    #[must_use]
    pub fn new(static_dir: PathBuf) -> Self {
        Self { static_dir }
    }

    fn copy_tree(src: &Path, dst: &Path, artifacts: &mut Vec<PathBuf>) -> Result<()> {
        std::fs::create_dir_all(dst)?;
        for entry in std::fs::read_dir(src)? {
            let entry = entry?;
            let target = dst.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                Self::copy_tree(&entry.path(), &target, artifacts)?;
            } else {
                std::fs::copy(entry.path(), &target)?;
                artifacts.push(target);
            }
        }
        Ok(())
    }
}

impl EmitStage for StaticCopyStage {
    fn name(&self) -> &'static str {
        "static-copy"
    }

    fn full(&self, ctx: &EmitContext, _records: &[ContentRecord]) -> Result<Vec<PathBuf>> {
        if !self.static_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut artifacts = Vec::new();
        Self::copy_tree(&self.static_dir, &ctx.output_dir.join("static"), &mut artifacts)?;
        Ok(artifacts)
    }
}

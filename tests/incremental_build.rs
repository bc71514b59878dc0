//! End-to-end builds against a real content tree and on-disk store.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use sitegraph::build::{
    ContentIndexStage, ContentPageStage, EmitStage, Pipeline, StaticCopyStage, VirtualPageStage,
};
use sitegraph::graph::{get_node, init_graph, GraphStore, NodeKind};
use sitegraph::parse::MarkdownParser;
use sitegraph::watch::{RebuildSerializer, WatchEvent, WatchEventKind};
use sitegraph::Config;

struct Site {
    _tmp: TempDir,
    config: Config,
    store: GraphStore,
    pipeline: Arc<Pipeline>,
}

impl Site {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            content_dir: tmp.path().join("content"),
            output_dir: tmp.path().join("public"),
            data_dir: tmp.path().join("data"),
            ..Config::default()
        };
        fs::create_dir_all(&config.content_dir).unwrap();

        let store = GraphStore::open(config.database_path()).unwrap();
        init_graph(&store).unwrap();

        let stages: Vec<Box<dyn EmitStage>> = vec![
            Box::new(ContentPageStage),
            Box::new(VirtualPageStage::new(store.clone())),
            Box::new(ContentIndexStage),
            Box::new(StaticCopyStage::new(config.static_dir())),
        ];
        let pipeline = Arc::new(Pipeline::new(
            config.clone(),
            store.clone(),
            Box::new(MarkdownParser::new()),
            stages,
        ));

        Self {
            _tmp: tmp,
            config,
            store,
            pipeline,
        }
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.config.content_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn remove(&self, relative: &str) {
        fs::remove_file(self.config.content_dir.join(relative)).unwrap();
    }

    fn artifact(&self, id: &str) -> PathBuf {
        self.config.output_dir.join(format!("{id}.html"))
    }

    fn node_kind(&self, id: &str) -> Option<NodeKind> {
        self.store
            .with_conn(|conn| Ok(get_node(conn, id)?.map(|n| n.kind())))
            .unwrap()
    }
}

// Writes spaced out so mtime-based change detection never misses an edit
// on coarse-timestamp filesystems.
fn settle() {
    std::thread::sleep(Duration::from_millis(20));
}

#[test]
fn test_full_site_build() {
    let site = Site::new();
    site.write(
        "index.md",
        "---\ntitle: Home\ntags: [meta]\n---\nWelcome. See [[notes/first]].",
    );
    site.write("notes/first.md", "---\ntitle: First\n---\nA note.");
    site.write("static/style.css", "body {}");

    let summary = site.pipeline.run().unwrap();
    assert_eq!(summary.changed_count, 2);
    assert!(site.artifact("index").exists());
    assert!(site.artifact("notes/first").exists());
    assert!(site.config.output_dir.join("static/style.css").exists());

    let index: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(site.config.output_dir.join("index.json")).unwrap())
            .unwrap();
    let ids: Vec<&str> = index
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["index", "notes/first"]);

    assert_eq!(site.node_kind("tags/meta"), Some(NodeKind::Tag));
}

#[test]
fn test_rebuild_is_idempotent() {
    let site = Site::new();
    site.write("a.md", "---\ntitle: A\n---\nhello [[b]]");
    site.write("b.md", "world");
    site.pipeline.run().unwrap();

    let before_a = fs::read(site.artifact("a")).unwrap();
    let before_index = fs::read(site.config.output_dir.join("index.json")).unwrap();

    let summary = site.pipeline.run().unwrap();
    assert_eq!(summary.changed_count, 0);
    assert_eq!(summary.emitted_artifact_count, 0);
    assert_eq!(fs::read(site.artifact("a")).unwrap(), before_a);
    assert_eq!(
        fs::read(site.config.output_dir.join("index.json")).unwrap(),
        before_index
    );
}

#[test]
fn test_incremental_edit_touches_one_page() {
    let site = Site::new();
    site.write("a.md", "version one");
    site.write("b.md", "stable");
    site.pipeline.run().unwrap();
    settle();

    site.write("a.md", "version two");
    let summary = site.pipeline.run().unwrap();
    assert_eq!(summary.changed_count, 1);

    let a = fs::read_to_string(site.artifact("a")).unwrap();
    assert!(a.contains("version two"));
    // b keeps an entry in the index even though it was never re-parsed.
    let index = fs::read_to_string(site.config.output_dir.join("index.json")).unwrap();
    assert!(index.contains("\"b\""));
}

#[test]
fn test_virtual_round_trip_on_disk() {
    let site = Site::new();
    site.write("a.md", "see [[b]]");
    site.write("b.md", "the target");
    site.pipeline.run().unwrap();
    settle();

    // Delete b: still linked from a, so it degrades and its page becomes a
    // stub listing the referrer.
    site.remove("b.md");
    site.pipeline.run().unwrap();
    assert_eq!(site.node_kind("b"), Some(NodeKind::Virtual));
    let stub = fs::read_to_string(site.artifact("b")).unwrap();
    assert!(stub.contains("does not exist yet"));
    assert!(stub.contains("a.html"));
    settle();

    // Recreate b: promoted back to a full entity, page re-rendered.
    site.write("b.md", "the target returns");
    site.pipeline.run().unwrap();
    assert_eq!(site.node_kind("b"), Some(NodeKind::Entity));
    assert!(fs::read_to_string(site.artifact("b"))
        .unwrap()
        .contains("the target returns"));
}

#[test]
fn test_unreferenced_delete_removes_page() {
    let site = Site::new();
    site.write("solo.md", "alone");
    site.pipeline.run().unwrap();
    assert!(site.artifact("solo").exists());
    settle();

    site.remove("solo.md");
    let summary = site.pipeline.run().unwrap();
    assert_eq!(summary.deleted_count, 1);
    assert!(!site.artifact("solo").exists());
    assert_eq!(site.node_kind("solo"), None);
}

#[test]
fn test_rename_keeps_graph_clean() {
    let site = Site::new();
    site.write("old-name.md", "the content");
    site.pipeline.run().unwrap();
    settle();

    site.remove("old-name.md");
    site.write("new-name.md", "the content");
    site.pipeline.run().unwrap();

    assert_eq!(site.node_kind("old-name"), None);
    assert_eq!(site.node_kind("new-name"), Some(NodeKind::Entity));
    assert!(!site.artifact("old-name").exists());
    assert!(site.artifact("new-name").exists());
}

#[test]
fn test_cache_survives_reopen() {
    let site = Site::new();
    site.write("a.md", "persistent");
    site.pipeline.run().unwrap();

    // A second pipeline over the same store starts from the cached graph.
    let store = GraphStore::open(site.config.database_path()).unwrap();
    let stages: Vec<Box<dyn EmitStage>> = vec![Box::new(ContentPageStage)];
    let reopened = Pipeline::new(
        site.config.clone(),
        store,
        Box::new(MarkdownParser::new()),
        stages,
    );

    let summary = reopened.run().unwrap();
    assert_eq!(summary.changed_count, 0);
    assert_eq!(summary.emitted_artifact_count, 0);
}

#[test]
fn test_event_burst_coalesces_to_one_build() {
    let site = Site::new();
    site.write("a.md", "hello");

    let serializer = RebuildSerializer::new(Arc::clone(&site.pipeline));
    for _ in 0..5 {
        serializer.notify(WatchEvent {
            path: site.config.content_dir.join("a.md"),
            kind: WatchEventKind::Change,
        });
    }

    // The first rebuild drains the whole burst; the second finds nothing.
    assert!(serializer.rebuild().unwrap().is_some());
    assert!(serializer.rebuild().unwrap().is_none());
    assert!(site.artifact("a").exists());
}

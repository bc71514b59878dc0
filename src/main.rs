//! Sitegraph - incremental content-graph site compiler
//!
//! Entry point for the sitegraph CLI.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use clap::Parser;
use sitegraph::build::{
    ContentIndexStage, ContentPageStage, EmitStage, Pipeline, StaticCopyStage, VirtualPageStage,
};
use sitegraph::graph::{init_graph, GraphStore};
use sitegraph::parse::MarkdownParser;
use sitegraph::telemetry::init_tracing;
use sitegraph::{Config, Result};

/// Sitegraph - incremental content-graph site compiler
#[derive(Parser, Debug)]
#[command(name = "sitegraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory of source documents
    #[arg(short, long, env = "SITEGRAPH_CONTENT_DIR", default_value = "./content")]
    content: std::path::PathBuf,

    /// Output directory for emitted artifacts
    #[arg(short, long, env = "SITEGRAPH_OUTPUT_DIR", default_value = "./public")]
    output: std::path::PathBuf,

    /// Data directory for the `SQLite` graph cache
    #[arg(short, long, env = "SITEGRAPH_DATA_DIR", default_value = "./data")]
    data_dir: std::path::PathBuf,

    /// Watch the content directory and rebuild on changes
    #[arg(short, long, env = "SITEGRAPH_WATCH")]
    watch: bool,

    /// Clear the graph cache and output directory before building
    #[arg(long, env = "SITEGRAPH_RESET")]
    reset: bool,

    /// Debounce window for filesystem events, in milliseconds
    #[arg(long, env = "SITEGRAPH_DEBOUNCE_MS", default_value = "500")]
    debounce_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SITEGRAPH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "SITEGRAPH_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!("sitegraph v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config {
        content_dir: cli.content,
        output_dir: cli.output,
        data_dir: cli.data_dir,
        log_level: cli.log_level,
        reset: cli.reset,
        debounce_ms: cli.debounce_ms,
    };

    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;

    std::fs::create_dir_all(&config.data_dir)?;

    // A store that cannot be opened is fatal: the cache is the source of
    // truth for incremental state.
    let store = GraphStore::open(&config.database_path())?;
    init_graph(&store)?;

    let stages: Vec<Box<dyn EmitStage>> = vec![
        Box::new(ContentPageStage),
        Box::new(VirtualPageStage::new(store.clone())),
        Box::new(ContentIndexStage),
        Box::new(StaticCopyStage::new(config.static_dir())),
    ];

    let pipeline = Arc::new(Pipeline::new(
        config.clone(),
        store,
        Box::new(MarkdownParser::new()),
        stages,
    ));

    if cli.watch {
        sitegraph::watch::watch(&config, pipeline).await
    } else {
        pipeline.run()?;
        Ok(())
    }
}

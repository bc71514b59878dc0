//! Sitegraph
//!
//! Incremental site compiler built around a persistent content graph.
//! Documents, dangling references, and tag facets live as nodes in a
//! `SQLite`-backed graph; each build diffs on-disk state against the graph,
//! applies the delta in one transaction, and drives full-vs-partial output
//! emission.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod build;
pub mod config;
pub mod error;
pub mod graph;
pub mod parse;
pub mod telemetry;
pub mod watch;

pub use config::Config;
pub use error::{Error, Result};

// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # neurovault
//!
//! Knowledge-base core: turns free text into a persistent knowledge graph.
//!
//! ## Architecture
//!
//! - **Extraction** (`extract`): pattern-based entities, relationships and facts
//! - **Resolution** (`resolve`): import-scoped node ids and the alias index
//! - **Linking** (`link`): relationship endpoints matched to resolved nodes
//! - **Graph store** (`graph`): read-only seed tier plus a persisted generated
//!   tier, with tombstones for deleted seed nodes
//! - **Sync** (`sync`): periodic deduplication of conversations, summaries and
//!   graph data
//!
//! ## Library usage
//!
//! ```no_run
//! use neurovault::engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let report = engine.generate_graph_from_text("Tim Cook is the CEO of Apple Inc.", Some("42"), None);
//! println!("{} nodes visible", report.nodes.len());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod graph;
pub mod link;
pub mod paths;
pub mod resolve;
pub mod sync;

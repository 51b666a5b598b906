//! Rich diagnostic error types for neurovault.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Most of the core is best-effort: store
//! operations log persistence failures instead of returning them, so these
//! types surface mainly at construction time and in the CLI.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::seed::SeedError;
use crate::paths::PathError;
use crate::sync::SyncError;

/// Top-level error type for neurovault.
#[derive(Debug, Error, Diagnostic)]
pub enum VaultError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sync(#[from] SyncError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("failed to read snapshot: {path}")]
    #[diagnostic(
        code(neurovault::store::read),
        help(
            "The snapshot file exists but could not be read. Check its permissions. \
             The store starts empty when the snapshot is unreadable."
        )
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {path}: {message}")]
    #[diagnostic(
        code(neurovault::store::parse),
        help(
            "The snapshot is not valid JSON or is missing the `nodes`/`edges` lists. \
             Move the file aside to start from an empty generated graph."
        )
    )]
    Parse { path: String, message: String },

    #[error("failed to serialize snapshot: {message}")]
    #[diagnostic(
        code(neurovault::store::serialize),
        help("A node or edge property could not be encoded as JSON.")
    )]
    Serialize { message: String },

    #[error("failed to write snapshot: {path}")]
    #[diagnostic(
        code(neurovault::store::write),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("entity list is empty")]
    #[diagnostic(
        code(neurovault::resolve::empty_batch),
        help(
            "The extractor found no entities in the text. Callers usually treat \
             this as a no-op import."
        )
    )]
    EmptyBatch,
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid engine configuration: {message}")]
    #[diagnostic(
        code(neurovault::engine::invalid_config),
        help("Check the values in config.toml or the command-line flags.")
    )]
    InvalidConfig { message: String },

    #[error("failed to create data directory: {path}")]
    #[diagnostic(
        code(neurovault::engine::data_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type VaultResult<T> = std::result::Result<T, VaultError>;

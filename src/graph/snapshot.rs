//! On-disk JSON snapshot of the generated graph tier.
//!
//! Layout: `{ "nodes": [...], "edges": [...], "deleted_sample_nodes": [...],
//! "last_updated": "<RFC 3339>", "import_sequence": n }`. Every save is a full
//! overwrite written to a sibling `.tmp` file and renamed into place.

use std::collections::BTreeSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Edge, Node};
use crate::error::{StoreError, StoreResult};

/// Serialized form of the generated tier and seed tombstones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub deleted_sample_nodes: BTreeSet<String>,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub import_sequence: u64,
}

impl Snapshot {
    /// Read a snapshot. A missing file yields `Ok(None)`.
    pub fn load(path: &Path) -> StoreResult<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    /// Stamp `last_updated` and write atomically.
    pub fn save(&mut self, path: &Path) -> StoreResult<()> {
        self.last_updated = chrono::Utc::now().to_rfc3339();
        write_json_atomic(path, self)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `value` as pretty JSON to `path.tmp`, flush, then rename over `path`.
///
/// On any failure the temporary file is removed before the error is returned.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Write {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let tmp = temp_path(path);
    let result = write_temp(&tmp, value).and_then(|()| {
        std::fs::rename(&tmp, path).map_err(|e| StoreError::Write {
            path: path.display().to_string(),
            source: e,
        })
    });
    if result.is_err() {
        if let Err(e) = std::fs::remove_file(&tmp) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %tmp.display(), error = %e, "could not remove temporary file");
            }
        }
    }
    result
}

fn write_temp<T: Serialize>(tmp: &Path, value: &T) -> StoreResult<()> {
    let write_err = |e: std::io::Error| StoreError::Write {
        path: tmp.display().to_string(),
        source: e,
    };

    let file = std::fs::File::create(tmp).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| StoreError::Serialize {
        message: e.to_string(),
    })?;
    writer.flush().map_err(write_err)?;
    writer
        .into_inner()
        .map_err(|e| write_err(e.into_error()))?
        .sync_all()
        .map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EntityType;

    #[test]
    fn failed_write_removes_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graph.json");

        // JSON object keys must be strings, so tuple keys fail mid-write.
        let unserializable: std::collections::BTreeMap<(u8, u8), u8> = [((1, 2), 3)].into();
        let err = write_json_atomic(&path, &unserializable).unwrap_err();

        assert!(matches!(err, StoreError::Serialize { .. }));
        assert!(!temp_path(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        // A non-empty directory at the target path makes the rename fail.
        let path = dir.path().join("graph.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupant"), "x").unwrap();

        let err = write_json_atomic(&path, &Snapshot::default()).unwrap_err();

        assert!(matches!(err, StoreError::Write { .. }));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Snapshot::load(&dir.path().join("absent.json")).unwrap().is_none());
    }

    #[test]
    fn save_writes_all_fields_and_leaves_no_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graph.json");

        let mut snapshot = Snapshot {
            nodes: vec![Node::new("n1", "Rust", EntityType::Technology)],
            deleted_sample_nodes: ["apple".to_string()].into(),
            import_sequence: 3,
            ..Default::default()
        };
        snapshot.save(&path).unwrap();

        assert!(!temp_path(&path).exists());
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["nodes"][0]["label"], "Rust");
        assert_eq!(raw["deleted_sample_nodes"][0], "apple");
        assert!(raw["last_updated"].as_str().unwrap().contains('T'));

        let loaded = Snapshot::load(&path).unwrap().unwrap();
        assert_eq!(loaded.import_sequence, 3);
        assert_eq!(loaded.nodes.len(), 1);
    }

    #[test]
    fn older_snapshot_without_optional_fields_loads() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(
            &path,
            r#"{"nodes":[],"edges":[],"last_updated":"2024-05-01T10:00:00.123456"}"#,
        )
        .unwrap();
        let loaded = Snapshot::load(&path).unwrap().unwrap();
        assert!(loaded.deleted_sample_nodes.is_empty());
        assert_eq!(loaded.import_sequence, 0);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Snapshot::load(&path), Err(StoreError::Parse { .. })));
    }
}

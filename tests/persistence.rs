//! Persistence and recovery tests for the neurovault graph store.
//!
//! These tests verify that generated nodes, tombstones and the import
//! counter survive engine restart, and that a damaged snapshot never stops
//! the engine from starting.

use neurovault::engine::{Engine, EngineConfig};
use neurovault::graph::snapshot::Snapshot;

fn persistent_engine(dir: &std::path::Path) -> Engine {
    Engine::new(EngineConfig {
        data_dir: Some(dir.to_path_buf()),
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn generated_graph_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    let (nodes, edges);
    // First session: import and let the merge persist.
    {
        let engine = persistent_engine(dir.path());
        let report = engine.generate_graph_from_text("Tim Cook is the CEO of Apple Inc.", Some("1"), None);
        assert!(report.persist_warning.is_none());
        let generated = engine.store().generated();
        nodes = generated.nodes.len();
        edges = generated.edges.len();
    }

    // Second session: reopen and verify.
    {
        let engine = persistent_engine(dir.path());
        let generated = engine.store().generated();
        assert_eq!(generated.nodes.len(), nodes);
        assert_eq!(generated.edges.len(), edges);
        assert!(generated.node("transcript_1_0").is_some());
    }
}

#[test]
fn tombstones_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let engine = persistent_engine(dir.path());
        engine.delete_node("tesla");
    }
    {
        let engine = persistent_engine(dir.path());
        let view = engine.get_combined_graph();
        assert!(view.node("tesla").is_none());
        assert!(view.edges.iter().all(|e| !e.touches("tesla")));
        assert_eq!(engine.info().stats.tombstones, 1);
    }
}

#[test]
fn clear_all_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let engine = persistent_engine(dir.path());
        engine.generate_graph_from_text("Sundar Pichai works at Google.", None, None);
        engine.clear_all_graph_data(Some("local-user-1"));
    }
    let engine = persistent_engine(dir.path());
    assert!(engine.get_combined_graph().is_empty());
}

#[test]
fn import_sequence_resumes_after_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let engine = persistent_engine(dir.path());
        let a = engine.generate_graph_from_text("Grace Hopper wrote code.", None, None);
        assert_eq!(a.import_key.as_deref(), Some("text_import_1"));
    }
    let engine = persistent_engine(dir.path());
    let b = engine.generate_graph_from_text("Alan Turing broke codes.", None, None);
    assert_eq!(b.import_key.as_deref(), Some("text_import_2"));
    assert!(engine.store().generated().node_by_label("Grace Hopper").is_some());
}

#[test]
fn snapshot_file_has_documented_layout() {
    let dir = tempfile::TempDir::new().unwrap();
    let engine = persistent_engine(dir.path());
    engine.generate_graph_from_text("Tim Cook is the CEO of Apple Inc.", Some("x"), None);
    engine.delete_node("cupertino");

    let path = engine.snapshot_path().unwrap().to_path_buf();
    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw["nodes"].is_array());
    assert!(raw["edges"].is_array());
    assert_eq!(raw["deleted_sample_nodes"], serde_json::json!(["cupertino"]));
    assert!(chrono::DateTime::parse_from_rfc3339(raw["last_updated"].as_str().unwrap()).is_ok());

    let snapshot = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(snapshot.nodes.len(), engine.store().generated().nodes.len());
    assert!(!path.with_file_name("generated_graph.json.tmp").exists());
}

#[test]
fn corrupt_snapshot_starts_empty() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("generated_graph.json"), "{ this is not json").unwrap();

    let engine = persistent_engine(dir.path());
    assert!(engine.store().generated().is_empty());
    // Seed graph is still fully visible.
    assert_eq!(engine.get_combined_graph().nodes.len(), 13);

    // The next mutation overwrites the damaged file.
    engine.generate_graph_from_text("Tim Cook is the CEO of Apple Inc.", Some("fix"), None);
    assert!(Snapshot::load(&dir.path().join("generated_graph.json")).unwrap().is_some());
}

#[test]
fn legacy_snapshot_without_sequence_loads() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("generated_graph.json"),
        r#"{
            "nodes": [{"id": "n1", "label": "Ada Lovelace", "type": "PERSON", "properties": {}}],
            "edges": [{"id": "x", "source": "n1", "target": "ghost", "type": "KNOWS"}],
            "deleted_sample_nodes": ["meta"],
            "last_updated": "2024-01-01T00:00:00Z"
        }"#,
    )
    .unwrap();

    let engine = persistent_engine(dir.path());
    let generated = engine.store().generated();
    assert_eq!(generated.nodes.len(), 1);
    // Edges pointing at unknown nodes are dropped on load.
    assert!(generated.edges.is_empty());
    assert!(engine.get_combined_graph().node("meta").is_none());
    assert_eq!(engine.info().stats.import_sequence, 0);
}

#[test]
fn snapshot_with_null_property_loads() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("generated_graph.json"),
        r#"{
            "nodes": [
                {"id": "n1", "label": "Ada Lovelace", "type": "PERSON", "properties": {"topic": null}},
                {"id": "n2", "label": "Analytical Engine", "type": "TECHNOLOGY", "properties": {}}
            ],
            "edges": [{"id": "e1", "source": "n1", "target": "n2", "type": "CREATED", "properties": {"note": null}}],
            "deleted_sample_nodes": [],
            "last_updated": "2024-01-01T00:00:00Z"
        }"#,
    )
    .unwrap();

    let engine = persistent_engine(dir.path());
    let generated = engine.store().generated();
    assert_eq!(generated.nodes.len(), 2);
    assert_eq!(generated.edges.len(), 1);
    assert!(generated.node("n1").unwrap().properties["topic"].as_text().is_none());
}

//! Cross-module tests for grove-core

use crate::*;
use std::path::Path;
use tempfile::TempDir;

fn python_file(path: &str, functions: &[&str], imports: &[&str]) -> ParsedFile {
    ParsedFile {
        path: path.to_string(),
        language: Language::Python,
        size: 64,
        lines: 4,
        functions: functions
            .iter()
            .enumerate()
            .map(|(i, name)| Function {
                name: name.to_string(),
                line_start: i as u32 + 1,
                line_end: i as u32 + 2,
                parameters: vec!["x".into()],
                ..Default::default()
            })
            .collect(),
        classes: Vec::new(),
        imports: imports
            .iter()
            .map(|m| RawImport::new(*m, 1).with_items(vec!["run".into()]))
            .collect(),
    }
}

fn hub_project() -> (Vec<ParsedFile>, ProjectGraph) {
    let mut a = python_file("a.py", &["main"], &["hub"]);
    a.functions[0].calls.insert("run".into());
    let files = vec![
        python_file("hub.py", &["run"], &[]),
        a,
        python_file("b.py", &[], &["hub"]),
    ];
    let resolved = vec![
        ResolvedEdge::import("a.py", "hub.py", &files[1].imports[0]),
        ResolvedEdge::import("b.py", "hub.py", &files[2].imports[0]),
    ];
    let graph = ProjectGraph {
        files: build_file_graph(&files, &resolved),
        functions: build_function_graph(&files),
    };
    (files, graph)
}

#[test]
fn test_cache_round_trip_reproduces_files_and_graph() {
    let tmp = TempDir::new().unwrap();
    let store = CacheStore::new(tmp.path()).unwrap();
    let project = Path::new("/work/hub-project");
    let (files, graph) = hub_project();

    let mut cached = CachedFiles::default();
    for (i, file) in files.iter().enumerate() {
        cached.files.insert(
            file.path.clone(),
            CachedFile {
                stamp: FileStamp {
                    size: file.size,
                    modified_ms: 1_700_000_000_000 + i as i64,
                },
                parsed: file.clone(),
            },
        );
    }
    store.save_parsed_files(project, &cached).unwrap();
    store.save_graph(project, &graph).unwrap();
    let stats = summarize(&files, &graph);
    store.save_stats(project, &stats).unwrap();

    assert_eq!(store.load_parsed_files(project), Some(cached));
    assert_eq!(store.load_graph(project), Some(graph));
    assert_eq!(store.load_stats(project), Some(stats));
}

#[test]
fn test_metadata_carries_filter_fingerprint() {
    let tmp = TempDir::new().unwrap();
    let store = CacheStore::new(tmp.path()).unwrap();
    let project = Path::new("/work/hub-project");

    store
        .save_metadata(project, &CacheMetadata::new(project, "abc123"))
        .unwrap();
    let meta = store.load_metadata(project).unwrap();
    assert_eq!(meta.cache_version, CACHE_VERSION);
    assert!(meta.matches_filters("abc123"));
    assert!(!meta.matches_filters("def456"));
}

#[test]
fn test_hub_graph_shape() {
    let (_, graph) = hub_project();
    let hub = graph.files.nodes.iter().find(|n| n.id == "hub.py").unwrap();
    assert_eq!(hub.metrics.in_degree, 2);
    assert!((hub.metrics.centrality - 0.7).abs() < 1e-12);

    let rendered: Vec<String> = graph
        .files
        .edges
        .iter()
        .map(|e| format!("{} -> {}", e.source, e.target))
        .collect();
    insta::assert_json_snapshot!(rendered, @r###"
    [
      "a.py -> hub.py",
      "b.py -> hub.py"
    ]
    "###);

    assert_eq!(
        graph.functions.edges,
        vec![ResolvedEdge::call("a.py::main", "hub.py::run")]
    );
}

#[test]
fn test_graph_json_shape() {
    let (_, graph) = hub_project();
    let json = serde_json::to_value(&graph.files).unwrap();
    let node = &json["nodes"][0];
    assert_eq!(node["id"], "a.py");
    assert_eq!(node["type"], "file");
    assert_eq!(node["language"], "python");
    assert!(node.get("in_degree").is_some());
    assert!(node.get("centrality").is_some());
    let edge = &json["edges"][0];
    assert_eq!(edge["type"], "import");
    assert_eq!(edge["module"], "hub");
    assert_eq!(edge["items"][0], "run");
}

#[test]
fn test_language_detection() {
    let cases = [
        ("main.py", Some(Language::Python)),
        ("app.tsx", Some(Language::TypeScript)),
        ("index.mjs", Some(Language::JavaScript)),
        ("lib.rs", Some(Language::Rust)),
        ("main.go", Some(Language::Go)),
        ("Main.java", Some(Language::Java)),
        ("util.h", Some(Language::C)),
        ("util.hpp", Some(Language::Cpp)),
        ("Program.cs", Some(Language::CSharp)),
        ("index.php", Some(Language::Php)),
        ("app.rb", Some(Language::Ruby)),
        ("Main.kt", Some(Language::Kotlin)),
        ("View.swift", Some(Language::Swift)),
        ("App.scala", Some(Language::Scala)),
        ("init.lua", Some(Language::Lua)),
        ("README.md", None),
        ("Makefile", None),
    ];
    for (name, expected) in cases {
        assert_eq!(Language::from_path(Path::new(name)), expected, "Failed for {}", name);
    }
}

//! Cross-module tests for grove-indexer

use crate::test_utils::{create_from_import_hub_repo, create_hub_repo, create_repo_with_structure};
use std::collections::HashSet;
use crate::*;
use grove_core::{CacheStore, NodeKind};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn coordinator() -> (TempDir, Coordinator) {
    let cache_dir = TempDir::new().unwrap();
    let cache = CacheStore::new(cache_dir.path()).unwrap();
    (cache_dir, Coordinator::new(Arc::new(cache)))
}

#[test]
fn test_hub_project_end_to_end() {
    let repo = create_hub_repo();
    let (_cache_dir, coordinator) = coordinator();

    let outcome = coordinator.scan(&ScanRequest::new(repo.path()).unwrap()).unwrap();
    assert_eq!(outcome.summary.file_count, 4);
    assert!(!outcome.summary.cached);

    let hub = outcome
        .graph
        .files
        .nodes
        .iter()
        .find(|n| n.id == "hub.py")
        .unwrap();
    assert_eq!(hub.metrics.in_degree, 3);
    assert_eq!(hub.metrics.out_degree, 0);

    let into_hub: Vec<&str> = outcome
        .graph
        .files
        .edges
        .iter()
        .filter(|e| e.target == "hub.py")
        .map(|e| e.source.as_str())
        .collect();
    assert_eq!(into_hub, vec!["a.py", "b.py", "c.py"]);

    let calls: Vec<(&str, &str)> = outcome
        .graph
        .functions
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![("a.py::main", "hub.py::run"), ("c.py::Job.go", "hub.py::helper")]
    );
    let go = outcome
        .graph
        .functions
        .nodes
        .iter()
        .find(|n| n.id == "c.py::Job.go")
        .unwrap();
    assert_eq!(go.kind, NodeKind::Method);

    assert_eq!(outcome.stats.unused_files, vec!["a.py", "b.py", "c.py"]);
    assert_eq!(outcome.stats.most_central[0].0, "hub.py");
}

#[test]
fn test_three_from_imports_of_one_hub() {
    let repo = create_from_import_hub_repo();
    let (_cache_dir, coordinator) = coordinator();

    let outcome = coordinator.scan(&ScanRequest::new(repo.path()).unwrap()).unwrap();
    assert_eq!(outcome.summary.file_count, 4);

    let edges = &outcome.graph.files.edges;
    assert_eq!(edges.len(), 3);
    assert!(edges.iter().all(|e| e.target == "hub.py"));
    assert!(edges.iter().all(|e| e.items == vec!["run"]));

    let hub = outcome.graph.files.nodes.iter().find(|n| n.id == "hub.py").unwrap();
    assert_eq!(hub.metrics.in_degree, 3);
    assert!((hub.metrics.centrality - 0.7).abs() < 1e-12);
}

#[test]
fn test_repeated_import_of_same_file_counts_twice() {
    let repo = create_repo_with_structure(&[
        ("hub.py", "def run():\n    pass\n"),
        ("a.py", "import hub\nfrom hub import run\n"),
        ("b.py", "from hub import run\n"),
    ]);
    let (_cache_dir, coordinator) = coordinator();

    let outcome = coordinator.scan(&ScanRequest::new(repo.path()).unwrap()).unwrap();
    let from_a = outcome.graph.files.edges.iter().filter(|e| e.source == "a.py").count();
    assert_eq!(from_a, 2);

    let node = |id: &str| outcome.graph.files.nodes.iter().find(|n| n.id == id).unwrap();
    assert_eq!(node("hub.py").metrics.in_degree, 3);
    assert_eq!(node("a.py").metrics.out_degree, 2);
    assert!(node("a.py").metrics.centrality > node("b.py").metrics.centrality);
}

#[test]
fn test_property_accessors_share_one_function_node() {
    let repo = create_repo_with_structure(&[(
        "m.py",
        "class C:\n    @property\n    def value(self):\n        return self._v\n\n    @value.setter\n    def value(self, v):\n        self._v = v\n",
    )]);
    let (_cache_dir, coordinator) = coordinator();

    let outcome = coordinator.scan(&ScanRequest::new(repo.path()).unwrap()).unwrap();
    let ids: Vec<&str> = outcome.graph.functions.nodes.iter().map(|n| n.id.as_str()).collect();
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(ids, vec!["m.py::C.value"]);
}

#[test]
fn test_scan_is_deterministic() {
    let repo = create_hub_repo();
    let (_a, first) = coordinator();
    let (_b, second) = coordinator();
    let request = ScanRequest::new(repo.path()).unwrap();

    let one = first.scan(&request).unwrap();
    let two = second.scan(&request).unwrap();
    assert_eq!(one.files, two.files);
    assert_eq!(
        serde_json::to_string(&one.graph).unwrap(),
        serde_json::to_string(&two.graph).unwrap()
    );
}

#[test]
fn test_repeat_scan_is_served_from_cache() {
    let repo = create_hub_repo();
    let (_cache_dir, coordinator) = coordinator();
    let request = ScanRequest::new(repo.path()).unwrap();

    let fresh = coordinator.scan(&request).unwrap();
    let cached = coordinator.scan(&request).unwrap();
    assert!(cached.summary.cached);
    assert_eq!(cached.summary.file_count, 4);
    assert_eq!(cached.files, fresh.files);
    assert_eq!(cached.graph, fresh.graph);

    let forced = coordinator.scan(&request.clone().with_force(true)).unwrap();
    assert!(!forced.summary.cached);
    assert_eq!(forced.summary.reused, 0);
}

#[test]
fn test_filter_change_invalidates_cache() {
    let repo = create_hub_repo();
    let (_cache_dir, coordinator) = coordinator();

    let all = ScanRequest::new(repo.path()).unwrap();
    coordinator.scan(&all).unwrap();

    let mut narrowed = all.clone();
    narrowed.filters = FilterSet::with_defaults(&["c.py".to_string()], &[]).unwrap();
    let outcome = coordinator.scan(&narrowed).unwrap();
    assert!(!outcome.summary.cached);
    assert_eq!(outcome.summary.reused, 0);
    assert_eq!(outcome.summary.file_count, 3);

    let hub = outcome.graph.files.nodes.iter().find(|n| n.id == "hub.py").unwrap();
    assert_eq!(hub.metrics.in_degree, 2);
}

#[test]
fn test_stale_scan_reparses_only_changed_files() {
    let repo = create_hub_repo();
    let (_cache_dir, coordinator) = coordinator();
    let mut request = ScanRequest::new(repo.path()).unwrap();
    coordinator.scan(&request).unwrap();

    std::fs::write(
        repo.path().join("b.py"),
        "from hub import run\nimport a\n\nrun(2)\n",
    )
    .unwrap();
    request.max_age = Duration::ZERO;
    let outcome = coordinator.scan(&request).unwrap();

    assert!(!outcome.summary.cached);
    assert_eq!(outcome.summary.reused, 3);
    assert_eq!(outcome.summary.file_count, 4);
    assert!(
        outcome
            .graph
            .files
            .edges
            .iter()
            .any(|e| e.source == "b.py" && e.target == "a.py")
    );
}

#[test]
fn test_unparsable_files_are_skipped() {
    let repo = create_repo_with_structure(&[
        ("ok.py", "def fine():\n    return 1\n"),
        ("broken.py", "def broken(:\n    return\n"),
        ("blob.py", "\0\0\0\0binary"),
        ("notes.txt", "not a source file\n"),
    ]);
    let (_cache_dir, coordinator) = coordinator();

    let outcome = coordinator.scan(&ScanRequest::new(repo.path()).unwrap()).unwrap();
    assert_eq!(outcome.summary.file_count, 1);
    assert_eq!(outcome.summary.skipped, 2);
    assert_eq!(outcome.files[0].path, "ok.py");
}

#[test]
fn test_cancelled_scan_writes_nothing() {
    let repo = create_hub_repo();
    let (_cache_dir, coordinator) = coordinator();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let request = ScanRequest::new(repo.path()).unwrap().with_cancel(cancel);
    assert!(matches!(coordinator.scan(&request), Err(ScanError::Cancelled)));

    let root = repo.path().canonicalize().unwrap();
    assert!(coordinator.cache().load_metadata(&root).is_none());
}

#[test]
fn test_invalid_project_path() {
    let (_cache_dir, coordinator) = coordinator();
    let request = ScanRequest::new("/definitely/not/a/grove/project").unwrap();
    assert!(matches!(
        coordinator.scan(&request),
        Err(ScanError::InvalidProjectPath(_))
    ));

    let repo = create_repo_with_structure(&[("file.py", "x = 1\n")]);
    let request = ScanRequest::new(repo.path().join("file.py")).unwrap();
    assert!(matches!(
        coordinator.scan(&request),
        Err(ScanError::InvalidProjectPath(_))
    ));
}

#[test]
fn test_mixed_language_project_with_aliases() {
    let repo = create_repo_with_structure(&[
        (
            "tsconfig.json",
            r#"{ "compilerOptions": { "baseUrl": ".", "paths": { "@/*": ["web/*"] } } }"#,
        ),
        ("web/app.ts", "import { fmt } from '@/lib/fmt';\nexport function start() { fmt(1); }\n"),
        ("web/lib/fmt.ts", "export function fmt(n: number) { return String(n); }\n"),
        ("core/src/lib.rs", "mod graph;\npub fn build() { graph::walk(); }\n"),
        ("core/src/graph.rs", "pub fn walk() {}\n"),
        ("tools/gen.go", "package tools\n\nimport \"fmt\"\n\nfunc Gen() { fmt.Println() }\n"),
    ]);
    let config = GroveConfig::load(repo.path()).unwrap();
    let (_cache_dir, coordinator) = coordinator();

    let request = ScanRequest::from_config(repo.path(), &config).unwrap();
    let outcome = coordinator.scan(&request).unwrap();
    assert_eq!(outcome.summary.file_count, 5);

    let edges: Vec<(&str, &str)> = outcome
        .graph
        .files
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("core/src/lib.rs", "core/src/graph.rs"),
            ("web/app.ts", "web/lib/fmt.ts"),
        ]
    );
    assert_eq!(outcome.stats.languages.len(), 3);
}

#[test]
fn test_bundle_over_discovered_files() {
    let repo = create_hub_repo();
    let filters = FilterSet::with_defaults(&[], &["hub.py".to_string()]).unwrap();
    let files = discover_files(repo.path(), &filters);

    let mut out = Vec::new();
    let summary = Bundler::new(BundleFormat::Plain)
        .write(repo.path(), &files, &mut out)
        .unwrap();
    assert_eq!(summary.included, vec!["hub.py"]);
    assert!(String::from_utf8(out).unwrap().starts_with("----- hub.py -----\ndef run(task):"));
}

//! Integration tests for Grove
//!
//! These tests drive the indexer, the cache and the CLI together.

use grove_core::{CacheStore, Language, detect_cycles, file_detail, find_dead_code};
use grove_indexer::{Coordinator, Extractor, GroveConfig, ScanRequest};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

fn write_repo(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }
    dir
}

fn cycle_repo() -> TempDir {
    write_repo(&[
        ("app/__init__.py", ""),
        ("app/models.py", "from .views import render\n\ndef load():\n    return render()\n"),
        ("app/views.py", "from .models import load\n\ndef render():\n    return 1\n"),
        ("main.py", "from app.models import load\n\ndef main():\n    load()\n"),
    ])
}

fn grove(repo: &Path, cache: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_grove"))
        .arg("--root")
        .arg(repo)
        .arg("--cache-dir")
        .arg(cache)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("GROVE_CACHE_DIR")
        .output()
        .expect("Failed to execute grove")
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_grove"))
        .arg("--help")
        .output()
        .expect("Failed to execute grove");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("grove"));
    assert!(stdout.contains("Dependency and call graphs"));
}

#[test]
fn test_cli_scan_prints_summary() {
    let repo = cycle_repo();
    let cache = TempDir::new().unwrap();

    let output = grove(repo.path(), cache.path(), &["scan"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["file_count"], 4);
    assert_eq!(summary["cached"], false);

    let again = grove(repo.path(), cache.path(), &["scan"]);
    let summary: serde_json::Value = serde_json::from_slice(&again.stdout).unwrap();
    assert_eq!(summary["cached"], true);
}

#[test]
fn test_cli_analyze_reports_cycle() {
    let repo = cycle_repo();
    let cache = TempDir::new().unwrap();

    let output = grove(repo.path(), cache.path(), &["analyze"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        report["cycles"],
        serde_json::json!([["app/models.py", "app/views.py"]])
    );
    assert!(
        report["unused_files"]
            .as_array()
            .unwrap()
            .iter()
            .any(|f| f == "main.py")
    );
}

#[test]
fn test_cli_file_rejects_unknown_path() {
    let repo = cycle_repo();
    let cache = TempDir::new().unwrap();

    let output = grove(repo.path(), cache.path(), &["file", "nowhere.py"]);
    assert!(!output.status.success());

    let output = grove(repo.path(), cache.path(), &["file", "app/views.py"]);
    assert!(output.status.success());
    let detail: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(detail["path"], "app/views.py");
    assert_eq!(detail["dependencies"]["imports"], serde_json::json!(["app/models.py"]));
}

#[test]
fn test_cli_bundle_to_file() {
    let repo = write_repo(&[("a.py", "x = 1\n"), ("README.md", "# Demo\n")]);
    let cache = TempDir::new().unwrap();
    let out = cache.path().join("out/bundle.txt");

    let output = grove(
        repo.path(),
        cache.path(),
        &["bundle", "--output", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let bundle = std::fs::read_to_string(&out).unwrap();
    assert!(bundle.starts_with(grove_indexer::FORMATTED_HEADER));
    assert!(bundle.contains("BA\n'README.md'\n# Demo\n\nWA\n"));
    assert!(bundle.contains("BA\n'a.py'\nx = 1\n\nWA\n"));
}

#[test]
fn test_cli_names_text_listing() {
    let repo = cycle_repo();
    let cache = TempDir::new().unwrap();

    let output = grove(repo.path(), cache.path(), &["names", "--no-files", "--text"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        ".; [FOLDER]\napp; [FOLDER]\n"
    );
}

#[test]
fn test_cli_clear_removes_project_cache() {
    let repo = cycle_repo();
    let cache = TempDir::new().unwrap();

    assert!(grove(repo.path(), cache.path(), &["scan"]).status.success());
    let store = CacheStore::new(cache.path()).unwrap();
    let root = repo.path().canonicalize().unwrap();
    assert!(store.load_metadata(&root).is_some());

    assert!(grove(repo.path(), cache.path(), &["clear"]).status.success());
    assert!(store.load_metadata(&root).is_none());
}

/// Test that scans can run on the blocking pool of an async runtime
#[tokio::test]
async fn test_scan_on_blocking_pool() {
    let repo = cycle_repo();
    let cache_dir = TempDir::new().unwrap();
    let cache = Arc::new(CacheStore::new(cache_dir.path()).unwrap());
    let coordinator = Arc::new(Coordinator::new(cache));

    let request = ScanRequest::new(repo.path()).unwrap();
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let request = request.clone();
            tokio::task::spawn_blocking(move || coordinator.scan(&request))
        })
        .collect();

    let mut cached = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.summary.file_count, 4);
        if outcome.summary.cached {
            cached += 1;
        }
    }
    // The project lock serializes the two scans, so the second one hits the cache.
    assert_eq!(cached, 1);
}

#[test]
fn test_analysis_over_scanned_project() {
    let repo = cycle_repo();
    let cache_dir = TempDir::new().unwrap();
    let coordinator = Coordinator::new(Arc::new(CacheStore::new(cache_dir.path()).unwrap()));
    let config = GroveConfig::load(repo.path()).unwrap();

    let outcome = coordinator
        .scan(&ScanRequest::from_config(repo.path(), &config).unwrap())
        .unwrap();

    assert_eq!(
        detect_cycles(&outcome.graph.files),
        vec![vec!["app/models.py".to_string(), "app/views.py".to_string()]]
    );

    let dead = find_dead_code(&outcome.graph.files, &outcome.graph.functions);
    assert!(dead.unused_files.contains(&"main.py".to_string()));
    assert!(dead.unused_functions.contains(&"main.py::main".to_string()));

    let detail = file_detail(&outcome.files, &outcome.graph.files, "app/models.py").unwrap();
    assert_eq!(detail.dependencies.imports, vec!["app/views.py"]);
    assert_eq!(detail.dependencies.imported_by, vec!["app/views.py", "main.py"]);

    let stats = coordinator.cache().cache_stats(Some(&outcome.root));
    assert_eq!(stats.projects, 1);
    assert!(stats.documents >= 4);
    assert_eq!(stats.metadata.unwrap().file_count, 4);
}

/// Test that every registered extension maps to an extractor
#[test]
fn test_language_extractors() {
    let extractor = Extractor::new().unwrap();
    let test_cases = [
        ("test.rs", "pub fn run() {}\n", Language::Rust),
        ("test.ts", "export function run() {}\n", Language::TypeScript),
        ("test.js", "function run() {}\n", Language::JavaScript),
        ("test.py", "def run():\n    pass\n", Language::Python),
        ("test.go", "package main\n\nfunc run() {}\n", Language::Go),
        ("test.java", "class Test { void run() {} }\n", Language::Java),
        ("test.c", "void run(void) {}\n", Language::C),
        ("test.cpp", "void run() {}\n", Language::Cpp),
        ("test.rb", "def run\nend\n", Language::Ruby),
        ("test.lua", "function run()\nend\n", Language::Lua),
    ];

    for (filename, source, language) in test_cases {
        let parsed = extractor
            .parse_source(filename, source.as_bytes())
            .unwrap_or_else(|e| panic!("{} should parse: {}", filename, e));
        assert_eq!(parsed.language, language, "{}", filename);
    }

    assert!(extractor.parse_source("test.txt", b"plain text").is_err());
}

//! Cycle, dead-code and summary analysis over built graphs

use crate::graph::DependencyGraph;
use crate::model::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// How many of the most central files the statistics keep.
pub const TOP_CENTRAL_FILES: usize = 10;

/// Files and functions nothing points at.
///
/// Entry points (`main.py`, CLI handlers, tests) always land here: nothing
/// in the project imports or calls them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeadCode {
    pub unused_files: Vec<String>,
    pub unused_functions: Vec<String>,
}

/// Derived per-project statistics, persisted beside the graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectStats {
    pub file_count: usize,
    pub function_count: usize,
    pub method_count: usize,
    pub class_count: usize,
    pub import_count: usize,
    pub resolved_import_count: usize,
    pub call_edge_count: usize,
    pub total_lines: u64,
    pub total_bytes: u64,
    pub languages: BTreeMap<Language, usize>,
    pub cycles: Vec<Vec<String>>,
    pub unused_files: Vec<String>,
    pub unused_functions: Vec<String>,
    /// (file id, centrality), highest first.
    pub most_central: Vec<(String, f64)>,
}

/// Detect import cycles in the file graph.
pub fn detect_cycles(graph: &FileGraph) -> Vec<Vec<String>> {
    let index = DependencyGraph::from_parts(
        graph.nodes.iter().map(|n| n.id.as_str()),
        graph
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str())),
    );
    let cycles = index.find_cycles();
    if !cycles.is_empty() {
        tracing::debug!("Found {} import cycles", cycles.len());
    }
    cycles
}

/// Files with no importer and functions with no caller, both sorted.
pub fn find_dead_code(files: &FileGraph, functions: &FunctionGraph) -> DeadCode {
    let imported: HashSet<&str> = files.edges.iter().map(|e| e.target.as_str()).collect();
    let called: HashSet<&str> = functions.edges.iter().map(|e| e.target.as_str()).collect();

    let mut unused_files: Vec<String> = files
        .nodes
        .iter()
        .filter(|n| !imported.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();
    unused_files.sort();

    let mut unused_functions: Vec<String> = functions
        .nodes
        .iter()
        .filter(|n| !called.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();
    unused_functions.sort();

    DeadCode {
        unused_files,
        unused_functions,
    }
}

/// Files a given file imports and files that import it, in edge order.
pub fn file_dependencies(graph: &FileGraph, path: &str) -> FileDependencies {
    let mut deps = FileDependencies::default();
    for edge in &graph.edges {
        if edge.source == path && !deps.imports.contains(&edge.target) {
            deps.imports.push(edge.target.clone());
        }
        if edge.target == path && !deps.imported_by.contains(&edge.source) {
            deps.imported_by.push(edge.source.clone());
        }
    }
    deps
}

/// Full parsed record of one file plus its resolved neighbours.
pub fn file_detail(files: &[ParsedFile], graph: &FileGraph, path: &str) -> Option<FileDetail> {
    let file = files.iter().find(|f| f.path == path)?;
    Some(FileDetail {
        file: file.clone(),
        dependencies: file_dependencies(graph, path),
    })
}

/// Summarize a scan into persisted statistics.
pub fn summarize(files: &[ParsedFile], graph: &ProjectGraph) -> ProjectStats {
    let mut stats = ProjectStats {
        file_count: files.len(),
        resolved_import_count: graph.files.edges.len(),
        call_edge_count: graph.functions.edges.len(),
        ..Default::default()
    };

    for file in files {
        stats.function_count += file.functions.len();
        stats.method_count += file.method_count();
        stats.class_count += file.classes.len();
        stats.import_count += file.imports.len();
        stats.total_lines += u64::from(file.lines);
        stats.total_bytes += file.size;
        *stats.languages.entry(file.language).or_insert(0) += 1;
    }

    stats.cycles = detect_cycles(&graph.files);
    let dead = find_dead_code(&graph.files, &graph.functions);
    stats.unused_files = dead.unused_files;
    stats.unused_functions = dead.unused_functions;

    let mut central: Vec<(String, f64)> = graph
        .files
        .nodes
        .iter()
        .filter(|n| n.metrics.centrality > 0.0)
        .map(|n| (n.id.clone(), n.metrics.centrality))
        .collect();
    central.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    central.truncate(TOP_CENTRAL_FILES);
    stats.most_central = central;

    stats
}

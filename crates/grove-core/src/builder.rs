//! File and function graph construction with centrality scoring

use crate::graph::DependencyGraph;
use crate::model::*;
use crate::symbols::SymbolTable;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Weight of normalized in-degree in the centrality score.
pub const IN_DEGREE_WEIGHT: f64 = 0.7;
/// Weight of normalized out-degree in the centrality score.
pub const OUT_DEGREE_WEIGHT: f64 = 0.3;

/// Build the file graph: one node per parsed file, one edge per resolved import.
///
/// Edges whose endpoints are not both in `files` are dropped, as are
/// self-imports. Nodes come out sorted by path.
pub fn build_file_graph(files: &[ParsedFile], resolved: &[ResolvedEdge]) -> FileGraph {
    let mut sorted: Vec<&ParsedFile> = files.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let known: HashSet<&str> = sorted.iter().map(|f| f.path.as_str()).collect();

    let mut nodes: Vec<FileNode> = sorted
        .iter()
        .map(|file| FileNode {
            id: file.path.clone(),
            kind: NodeKind::File,
            language: file.language,
            size: file.size,
            lines: file.lines,
            functions_count: file.functions.len() as u32,
            classes_count: file.classes.len() as u32,
            metrics: NodeMetrics::default(),
        })
        .collect();

    let edges: Vec<ResolvedEdge> = resolved
        .iter()
        .filter(|e| e.source != e.target)
        .filter(|e| known.contains(e.source.as_str()) && known.contains(e.target.as_str()))
        .cloned()
        .collect();

    let index = index_of(nodes.iter().map(|n| n.id.as_str()), &edges);
    for node in &mut nodes {
        node.metrics = metrics_for(&index, &node.id);
    }
    apply_centrality(nodes.iter_mut().map(|n| &mut n.metrics));

    tracing::debug!("File graph: {} nodes, {} edges", nodes.len(), edges.len());
    FileGraph { nodes, edges }
}

/// Build the function call graph.
///
/// Every top-level function and method becomes a node. Each callee short name
/// that matches a definition anywhere in the project yields an edge to the
/// first-registered definition with that name (files in path order, functions
/// before methods). Same-named definitions elsewhere are never disambiguated.
///
/// Definitions sharing an id (a property getter and its setter, overloads,
/// redefinitions) collapse into the first node; their callees are merged.
pub fn build_function_graph(files: &[ParsedFile]) -> FunctionGraph {
    let mut sorted: Vec<&ParsedFile> = files.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut nodes = Vec::new();
    let mut symbols = SymbolTable::new();
    // (caller id, callee short names)
    let mut callers: Vec<(String, BTreeSet<&str>)> = Vec::new();
    let mut caller_at: HashMap<String, usize> = HashMap::new();

    for file in &sorted {
        for function in file.all_functions() {
            let qualified = function.qualified_name();
            let id = function_id(&file.path, &qualified);
            let calls = function.calls.iter().map(String::as_str);
            if let Some(&at) = caller_at.get(&id) {
                callers[at].1.extend(calls);
                continue;
            }
            symbols.insert(&function.name, &id, &file.path);
            caller_at.insert(id.clone(), callers.len());
            callers.push((id.clone(), calls.collect()));

            nodes.push(FunctionNode {
                id,
                name: qualified,
                kind: if function.class_name.is_some() {
                    NodeKind::Method
                } else {
                    NodeKind::Function
                },
                class: function.class_name.clone(),
                file: file.path.clone(),
                line_start: function.line_start,
                line_end: function.line_end,
                parameters: function.parameters.clone(),
                is_async: function.is_async,
                metrics: NodeMetrics::default(),
            });
        }
    }

    let mut edges = Vec::new();
    for (source, calls) in &callers {
        for call in calls {
            if let Some(target) = symbols.lookup(call) {
                edges.push(ResolvedEdge::call(source, target));
            }
        }
    }

    let index = index_of(nodes.iter().map(|n| n.id.as_str()), &edges);
    for node in &mut nodes {
        node.metrics = metrics_for(&index, &node.id);
    }
    apply_centrality(nodes.iter_mut().map(|n| &mut n.metrics));

    tracing::debug!(
        "Function graph: {} nodes, {} edges ({} distinct names)",
        nodes.len(),
        edges.len(),
        symbols.len()
    );
    FunctionGraph { nodes, edges }
}

/// Node id of a function: `relative-path::qualified-name`.
pub fn function_id(path: &str, qualified_name: &str) -> String {
    format!("{}::{}", path, qualified_name)
}

/// Fill in centrality from already-set degrees.
///
/// `score = 0.7 * in / max_in + 0.3 * out / max_out`, where a zero maximum is
/// treated as 1.
pub fn apply_centrality<'a, I>(metrics: I)
where
    I: IntoIterator<Item = &'a mut NodeMetrics>,
{
    let mut all: Vec<&mut NodeMetrics> = metrics.into_iter().collect();
    let max_in = all.iter().map(|m| m.in_degree).max().unwrap_or(0).max(1) as f64;
    let max_out = all.iter().map(|m| m.out_degree).max().unwrap_or(0).max(1) as f64;
    for m in all.iter_mut() {
        m.centrality = IN_DEGREE_WEIGHT * (m.in_degree as f64 / max_in)
            + OUT_DEGREE_WEIGHT * (m.out_degree as f64 / max_out);
    }
}

fn index_of<'a>(
    ids: impl Iterator<Item = &'a str>,
    edges: &'a [ResolvedEdge],
) -> DependencyGraph {
    DependencyGraph::from_parts(
        ids,
        edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str())),
    )
}

fn metrics_for(index: &DependencyGraph, id: &str) -> NodeMetrics {
    NodeMetrics {
        in_degree: index.in_degree(id) as u32,
        out_degree: index.out_degree(id) as u32,
        centrality: 0.0,
    }
}

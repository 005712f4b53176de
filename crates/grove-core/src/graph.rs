//! Graph index using petgraph::DiGraph keyed by string node ids

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// A directed multigraph over file paths or function ids.
pub struct DependencyGraph {
    inner: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            inner: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Build an index from node ids and edges between them.
    pub fn from_parts<'a, N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator<Item = &'a str>,
        E: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = DependencyGraph::new();
        for id in nodes {
            graph.add_node(id);
        }
        for (source, target) in edges {
            graph.add_edge(source, target);
        }
        graph
    }

    /// Add a node. Adding an existing id returns its index unchanged.
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.inner.add_node(id.to_string());
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Add an edge between two known nodes. Returns false if either endpoint is unknown.
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => {
                self.inner.add_edge(s, t, ());
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.inner
            .node_indices()
            .map(move |idx| self.inner[idx].as_str())
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, |&idx| {
            self.inner.edges_directed(idx, Direction::Incoming).count()
        })
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, |&idx| {
            self.inner.edges_directed(idx, Direction::Outgoing).count()
        })
    }

    /// Distinct targets of outgoing edges, in edge insertion order.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Distinct sources of incoming edges, in edge insertion order.
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        // petgraph walks adjacency newest-first
        let mut found: Vec<NodeIndex> = self
            .inner
            .edges_directed(idx, direction)
            .map(|edge| match direction {
                Direction::Outgoing => edge.target(),
                Direction::Incoming => edge.source(),
            })
            .collect();
        found.reverse();
        let mut seen = Vec::with_capacity(found.len());
        for n in found {
            if !seen.contains(&n) {
                seen.push(n);
            }
        }
        seen.into_iter().map(|n| self.inner[n].as_str()).collect()
    }

    /// Report every cycle met by a depth-first traversal.
    ///
    /// Roots are tried in insertion order. A back edge into a node that is
    /// still on the traversal stack yields the stack suffix starting at that
    /// node, closed by repeating it (`[a, b, c, a]`). A node may appear in
    /// several reported cycles.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let ids: Vec<&str> = self.node_ids().collect();
        let position: HashMap<&str, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let adjacency: Vec<Vec<usize>> = ids
            .iter()
            .map(|id| {
                self.successors(id)
                    .into_iter()
                    .filter_map(|t| position.get(t).copied())
                    .collect()
            })
            .collect();

        let mut cycles = Vec::new();
        let mut visited = vec![false; ids.len()];
        let mut on_stack = vec![false; ids.len()];
        let mut path: Vec<usize> = Vec::new();
        // (node, next neighbour cursor)
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..ids.len() {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            on_stack[root] = true;
            path.push(root);
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                if let Some(&next) = adjacency[node].get(cursor) {
                    frame.1 += 1;
                    if !visited[next] {
                        visited[next] = true;
                        on_stack[next] = true;
                        path.push(next);
                        stack.push((next, 0));
                    } else if on_stack[next] {
                        if let Some(start) = path.iter().position(|&n| n == next) {
                            let mut cycle: Vec<String> =
                                path[start..].iter().map(|&n| ids[n].to_string()).collect();
                            cycle.push(ids[next].to_string());
                            cycles.push(cycle);
                        }
                    }
                } else {
                    stack.pop();
                    on_stack[node] = false;
                    path.pop();
                }
            }
        }

        cycles
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        DependencyGraph::from_parts(nodes.iter().copied(), edges.iter().copied())
    }

    #[test]
    fn test_degrees_count_parallel_edges() {
        let g = graph(&["a", "b"], &[("a", "b"), ("a", "b")]);
        assert_eq!(g.in_degree("b"), 2);
        assert_eq!(g.out_degree("a"), 2);
        assert_eq!(g.successors("a"), vec!["b"]);
    }

    #[test]
    fn test_unknown_endpoint_is_rejected() {
        let mut g = graph(&["a"], &[]);
        assert!(!g.add_edge("a", "missing"));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_neighbors_keep_insertion_order() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "c"), ("a", "b"), ("a", "d"), ("d", "b")],
        );
        assert_eq!(g.successors("a"), vec!["c", "b", "d"]);
        assert_eq!(g.predecessors("b"), vec!["a", "d"]);
    }

    #[test]
    fn test_three_node_cycle() {
        let g = graph(&["x", "y", "z"], &[("x", "y"), ("y", "z"), ("z", "x")]);
        let cycles = g.find_cycles();
        assert_eq!(cycles, vec![vec!["x", "y", "z", "x"]]);
    }

    #[test]
    fn test_acyclic_chain_has_no_cycles() {
        let g = graph(&["x", "y", "z"], &[("x", "y"), ("y", "z")]);
        assert!(g.find_cycles().is_empty());
    }

    #[test]
    fn test_disjoint_cycles_are_all_reported() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")],
        );
        let cycles = g.find_cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["a".to_string(), "b".to_string(), "a".to_string()]));
        assert!(cycles.contains(&vec!["c".to_string(), "d".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_node_shared_by_two_cycles() {
        let g = graph(
            &["hub", "a", "b"],
            &[("hub", "a"), ("a", "hub"), ("hub", "b"), ("b", "hub")],
        );
        let cycles = g.find_cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().all(|c| c.first().map(String::as_str) == Some("hub")));
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let g = graph(&["a"], &[("a", "a")]);
        assert_eq!(g.find_cycles(), vec![vec!["a", "a"]]);
    }
}

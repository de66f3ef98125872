//! Import graph with PageRank-based ranking

use petgraph::algo::page_rank;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Directed file graph built from resolved import edges
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
        }
    }

    /// Build from `(importer, imported)` path pairs; repeated pairs collapse
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = Self::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    fn node(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.to_string());
        self.node_indices.insert(path.to_string(), idx);
        idx
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from_idx = self.node(from);
        let to_idx = self.node(to);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn file_count(&self) -> usize {
        self.graph.node_count()
    }

    /// PageRank score for every file in the graph
    pub fn page_rank(&self) -> HashMap<String, f64> {
        if self.graph.node_count() == 0 {
            return HashMap::new();
        }

        let scores = page_rank(&self.graph, 0.85, 100);

        self.node_indices
            .iter()
            .map(|(path, &idx)| (path.clone(), scores[idx.index()]))
            .collect()
    }

    /// Most imported-into files first; ties broken by path
    pub fn ranked(&self, limit: usize) -> Vec<(String, f64)> {
        let mut ranks: Vec<_> = self.page_rank().into_iter().collect();
        ranks.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranks.truncate(limit);
        ranks
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

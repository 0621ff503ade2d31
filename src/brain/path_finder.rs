//! Bounded Path Finder
//!
//! Enumerates every simple path between two nodes with at most `max_hops`
//! channels. Depth-first and lazy: paths are produced one at a time and the
//! search can be dropped early.

use petgraph::graph::{Neighbors, NodeIndex};

use crate::cartographer::ChannelGraph;
use crate::types::{ChannelRecord, NodeId};

/// Ordered node ids, no node repeated
pub type Path = Vec<NodeId>;

pub struct PathFinder<'a> {
    graph: &'a ChannelGraph,
    max_hops: usize,
}

impl<'a> PathFinder<'a> {
    pub fn new(graph: &'a ChannelGraph, max_hops: usize) -> Self {
        Self { graph, max_hops }
    }

    /// All simple paths `start -> ... -> end`. Calling again restarts the search.
    pub fn paths(&self, start: &str, end: &str) -> SimplePaths<'a> {
        let endpoints = self
            .graph
            .index_of(start)
            .zip(self.graph.index_of(end))
            .filter(|(from, to)| from != to && self.max_hops > 0);

        match endpoints {
            Some((from, to)) => SimplePaths {
                graph: self.graph,
                target: to,
                max_hops: self.max_hops,
                visited: vec![from],
                stack: vec![self.graph.raw().neighbors(from)],
            },
            None => SimplePaths {
                graph: self.graph,
                target: NodeIndex::end(),
                max_hops: self.max_hops,
                visited: Vec::new(),
                stack: Vec::new(),
            },
        }
    }

    pub fn count_paths(&self, start: &str, end: &str) -> usize {
        self.paths(start, end).count()
    }
}

/// Lazy iterator over the simple paths found by [`PathFinder::paths`]
pub struct SimplePaths<'a> {
    graph: &'a ChannelGraph,
    target: NodeIndex,
    max_hops: usize,
    /// Nodes on the current partial path, start first
    visited: Vec<NodeIndex>,
    /// Unexplored successors of each node on `visited`
    stack: Vec<Neighbors<'a, ChannelRecord>>,
}

impl Iterator for SimplePaths<'_> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        while let Some(children) = self.stack.last_mut() {
            match children.next() {
                Some(child) if child == self.target => {
                    // Taking this channel makes the path visited.len() hops long
                    if self.visited.len() <= self.max_hops {
                        let mut path: Path = self
                            .visited
                            .iter()
                            .map(|&node| self.graph.id_of(node).clone())
                            .collect();
                        path.push(self.graph.id_of(child).clone());
                        return Some(path);
                    }
                }
                Some(child) => {
                    if self.visited.len() < self.max_hops && !self.visited.contains(&child) {
                        self.visited.push(child);
                        self.stack.push(self.graph.raw().neighbors(child));
                    }
                }
                None => {
                    self.stack.pop();
                    self.visited.pop();
                }
            }
        }
        None
    }
}

//! Channel Graph
//!
//! Directed view of the channel snapshot. Each (source, destination) pair
//! holds exactly one `ChannelRecord`, the policy for traffic flowing that way.

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::errors::{RebalanceError, Result};
use crate::types::{ChannelRecord, NodeId};

/// What to do when the snapshot carries two records for the same direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The later record replaces the earlier one
    #[default]
    LastWins,
    /// Fail the build
    Reject,
    /// Keep the later fee policy, add the capacities together
    SumCapacity,
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicatePolicy::LastWins => write!(f, "last_wins"),
            DuplicatePolicy::Reject => write!(f, "reject"),
            DuplicatePolicy::SumCapacity => write!(f, "sum_capacity"),
        }
    }
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = RebalanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "last_wins" | "lastwins" | "last" => Ok(DuplicatePolicy::LastWins),
            "reject" => Ok(DuplicatePolicy::Reject),
            "sum_capacity" | "sum" => Ok(DuplicatePolicy::SumCapacity),
            other => Err(RebalanceError::Config(format!(
                "unknown duplicate policy '{}'",
                other
            ))),
        }
    }
}

/// The channel graph
#[derive(Debug, Clone, Default)]
pub struct ChannelGraph {
    graph: DiGraph<NodeId, ChannelRecord>,
    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<(NodeIndex, NodeIndex), EdgeIndex>,
}

impl ChannelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build with the default `LastWins` policy
    pub fn from_records(records: &[ChannelRecord]) -> Result<Self> {
        Self::build(records, DuplicatePolicy::LastWins)
    }

    pub fn build(records: &[ChannelRecord], policy: DuplicatePolicy) -> Result<Self> {
        let mut graph = Self::new();
        let mut duplicates = 0usize;

        for record in records {
            if graph.insert(record.clone(), policy)? {
                duplicates += 1;
            }
        }

        info!(
            "Channel graph built: {} Nodes, {} Edges",
            graph.node_count(),
            graph.edge_count()
        );
        if duplicates > 0 {
            debug!(
                "  Resolved {} duplicate channel records ({})",
                duplicates, policy
            );
        }

        Ok(graph)
    }

    /// Insert one record. Returns true when it collided with an existing edge.
    fn insert(&mut self, record: ChannelRecord, policy: DuplicatePolicy) -> Result<bool> {
        record.validate()?;

        let from = self.get_or_create_node(&record.source);
        let to = self.get_or_create_node(&record.destination);

        if let Some(&edge) = self.edge_index.get(&(from, to)) {
            match policy {
                DuplicatePolicy::Reject => {
                    return Err(RebalanceError::DuplicateChannel {
                        from: record.source,
                        to: record.destination,
                    });
                }
                DuplicatePolicy::LastWins => {
                    self.graph[edge] = record;
                }
                DuplicatePolicy::SumCapacity => {
                    let capacity_sat = self.graph[edge]
                        .capacity_sat
                        .saturating_add(record.capacity_sat);
                    self.graph[edge] = ChannelRecord {
                        capacity_sat,
                        ..record
                    };
                }
            }
            return Ok(true);
        }

        let edge = self.graph.add_edge(from, to, record);
        self.edge_index.insert((from, to), edge);
        Ok(false)
    }

    fn get_or_create_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&node) = self.node_index.get(id) {
            return node;
        }

        let node = self.graph.add_node(id.to_string());
        self.node_index.insert(id.to_string(), node);
        node
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// The record for traffic flowing `from -> to`, if such a channel exists
    pub fn channel(&self, from: &str, to: &str) -> Option<&ChannelRecord> {
        let from = *self.node_index.get(from)?;
        let to = *self.node_index.get(to)?;
        self.edge_index.get(&(from, to)).map(|&edge| &self.graph[edge])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.graph.node_weights()
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelRecord> + '_ {
        self.graph.edge_weights()
    }

    /// Nodes reachable over one outgoing channel of `id`
    pub fn successors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.node_index
            .get(id)
            .into_iter()
            .flat_map(move |&node| self.graph.neighbors(node))
            .map(move |node| &self.graph[node])
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(id).copied()
    }

    pub(crate) fn id_of(&self, node: NodeIndex) -> &NodeId {
        &self.graph[node]
    }

    pub(crate) fn raw(&self) -> &DiGraph<NodeId, ChannelRecord> {
        &self.graph
    }
}

//! Ego Network
//!
//! Friend-of-friend view of the channel graph: the channels of our direct
//! peers, minus our own channels, minus peers that expose only a single
//! onward channel (they offer no alternate route).

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::ChannelGraph;
use crate::errors::Result;
use crate::types::{ChannelRecord, NodeId, OwnChannel};

/// The pruned graph plus the sets used to derive it
#[derive(Debug, Clone)]
pub struct EgoNetwork {
    graph: ChannelGraph,
    friends: HashSet<NodeId>,
    removed: HashSet<NodeId>,
}

impl EgoNetwork {
    pub fn graph(&self) -> &ChannelGraph {
        &self.graph
    }

    /// Peers we hold a channel with
    pub fn friends(&self) -> &HashSet<NodeId> {
        &self.friends
    }

    /// Sources dropped for being left with a single onward channel
    pub fn removed(&self) -> &HashSet<NodeId> {
        &self.removed
    }
}

pub struct EgoNetworkBuilder;

impl EgoNetworkBuilder {
    pub fn prune(
        full: &ChannelGraph,
        own_channels: &[OwnChannel],
        own_node_id: &str,
    ) -> Result<EgoNetwork> {
        let friends: HashSet<NodeId> = own_channels.iter().map(|c| c.peer_id.clone()).collect();

        let selected: Vec<&ChannelRecord> = full
            .channels()
            .filter(|c| friends.contains(&c.source) || friends.contains(&c.destination))
            .collect();

        let mut retained: Vec<&ChannelRecord> = selected
            .iter()
            .copied()
            .filter(|c| c.source != own_node_id && c.destination != own_node_id)
            .collect();

        // Dropping a leaf can leave another source with a single edge, so
        // repeat until every remaining source has zero or several edges
        let mut removed: HashSet<NodeId> = HashSet::new();
        let mut rounds = 0;
        loop {
            let leaves = single_edge_sources(&retained);
            if leaves.is_empty() {
                break;
            }
            rounds += 1;
            retained.retain(|c| !leaves.contains(&c.source) && !leaves.contains(&c.destination));
            removed.extend(leaves);
        }

        debug!(
            "Ego network: {} friends, {} selected channels, {} pruning rounds",
            friends.len(),
            selected.len(),
            rounds
        );

        let retained: Vec<ChannelRecord> = retained.into_iter().cloned().collect();
        // Edges come from a graph that is already unique per direction
        let graph = ChannelGraph::from_records(&retained)?;

        info!(
            "Pruned ego network: {} of {} selected channels kept, {} leaf peers removed",
            retained.len(),
            selected.len(),
            removed.len()
        );

        Ok(EgoNetwork {
            graph,
            friends,
            removed,
        })
    }
}

/// Sources with exactly one outgoing edge in `channels`.
/// The counts live only for this call.
fn single_edge_sources(channels: &[&ChannelRecord]) -> HashSet<NodeId> {
    let mut out_degree: HashMap<&str, usize> = HashMap::new();
    for channel in channels {
        *out_degree.entry(channel.source.as_str()).or_insert(0) += 1;
    }

    out_degree
        .into_iter()
        .filter(|&(_, count)| count == 1)
        .map(|(node, _)| node.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn own(peers: &[&str]) -> Vec<OwnChannel> {
        peers
            .iter()
            .map(|p| OwnChannel::new(*p, 50, 100).unwrap())
            .collect()
    }

    #[test]
    fn test_single_edge_friend_is_removed() {
        // X has exactly one selected outgoing edge, so X -> Y goes
        let full = ChannelGraph::from_records(&[
            ChannelRecord::new("X", "Y", "1x0x0", 100),
            ChannelRecord::new("Y", "Z", "2x0x0", 100),
        ])
        .unwrap();

        let ego = EgoNetworkBuilder::prune(&full, &own(&["X"]), "ME").unwrap();

        assert!(ego.removed().contains("X"));
        assert!(ego.graph().channel("X", "Y").is_none());
        // Y -> Z is not selected at all: neither endpoint is a friend
        assert!(ego.graph().channel("Y", "Z").is_none());
        assert_eq!(ego.graph().edge_count(), 0);
    }

    #[test]
    fn test_retention_depends_on_own_count() {
        // Friends {X, Y}. X has one selected edge and is removed.
        // Y keeps Y -> Z and Y -> W because it originates two.
        let full = ChannelGraph::from_records(&[
            ChannelRecord::new("X", "Y", "1x0x0", 100),
            ChannelRecord::new("Y", "Z", "2x0x0", 100),
            ChannelRecord::new("Y", "W", "3x0x0", 100),
        ])
        .unwrap();

        let ego = EgoNetworkBuilder::prune(&full, &own(&["X", "Y"]), "ME").unwrap();

        assert!(ego.graph().channel("X", "Y").is_none());
        assert!(!ego.removed().contains("Y"));
        assert!(ego.graph().channel("Y", "Z").is_some());
        assert!(ego.graph().channel("Y", "W").is_some());
    }

    #[test]
    fn test_own_node_edges_excluded() {
        let full = ChannelGraph::from_records(&[
            ChannelRecord::new("ME", "A", "1x0x0", 100),
            ChannelRecord::new("A", "ME", "1x0x0", 100),
            ChannelRecord::new("A", "B", "2x0x0", 100),
            ChannelRecord::new("A", "C", "3x0x0", 100),
            ChannelRecord::new("B", "A", "2x0x0", 100),
            ChannelRecord::new("B", "C", "4x0x0", 100),
        ])
        .unwrap();

        let ego = EgoNetworkBuilder::prune(&full, &own(&["A", "B"]), "ME").unwrap();

        assert!(!ego.graph().contains_node("ME"));
        assert!(ego
            .graph()
            .channels()
            .all(|c| c.source != "ME" && c.destination != "ME"));
        assert_eq!(ego.graph().edge_count(), 4);
    }

    #[test]
    fn test_reprune_is_stable() {
        let full = ChannelGraph::from_records(&[
            ChannelRecord::new("A", "B", "1x0x0", 100),
            ChannelRecord::new("A", "C", "2x0x0", 100),
            ChannelRecord::new("B", "A", "1x0x0", 100),
            ChannelRecord::new("B", "D", "3x0x0", 100),
            ChannelRecord::new("D", "A", "4x0x0", 100),
            ChannelRecord::new("D", "B", "3x0x0", 100),
            ChannelRecord::new("E", "A", "5x0x0", 100),
        ])
        .unwrap();
        let friends = own(&["A", "B"]);

        let first = EgoNetworkBuilder::prune(&full, &friends, "ME").unwrap();
        assert!(first.removed().contains("E"));

        let second = EgoNetworkBuilder::prune(first.graph(), &friends, "ME").unwrap();
        assert!(second.removed().is_empty());
        assert_eq!(second.graph().edge_count(), first.graph().edge_count());
    }

    #[test]
    fn test_removal_cascades_until_stable() {
        // Dropping C leaves A with only A -> B, dropping A leaves B with only B -> F
        let full = ChannelGraph::from_records(&[
            ChannelRecord::new("A", "B", "1x0x0", 100),
            ChannelRecord::new("A", "C", "2x0x0", 100),
            ChannelRecord::new("C", "F", "3x0x0", 100),
            ChannelRecord::new("B", "A", "1x0x0", 100),
            ChannelRecord::new("B", "F", "4x0x0", 100),
        ])
        .unwrap();
        let friends = own(&["A", "F"]);

        let first = EgoNetworkBuilder::prune(&full, &friends, "ME").unwrap();
        let expected: HashSet<NodeId> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        assert_eq!(first.removed(), &expected);
        assert_eq!(first.graph().edge_count(), 0);

        let second = EgoNetworkBuilder::prune(first.graph(), &friends, "ME").unwrap();
        assert!(second.removed().is_empty());
    }

    #[test]
    fn test_no_source_left_with_single_edge() {
        // Own-node edges do not count towards a peer's onward channels
        let full = ChannelGraph::from_records(&[
            ChannelRecord::new("A", "ME", "1x0x0", 100),
            ChannelRecord::new("A", "B", "2x0x0", 100),
            ChannelRecord::new("B", "C", "3x0x0", 100),
            ChannelRecord::new("B", "D", "4x0x0", 100),
            ChannelRecord::new("C", "B", "3x0x0", 100),
            ChannelRecord::new("C", "D", "5x0x0", 100),
        ])
        .unwrap();

        let ego = EgoNetworkBuilder::prune(&full, &own(&["A", "B", "C"]), "ME").unwrap();

        assert_eq!(ego.removed().len(), 1);
        assert!(ego.removed().contains("A"));
        let mut out_degree: HashMap<&str, usize> = HashMap::new();
        for channel in ego.graph().channels() {
            *out_degree.entry(channel.source.as_str()).or_insert(0) += 1;
        }
        assert!(out_degree.values().all(|&count| count != 1));
        assert!(ego.graph().channel("B", "C").is_some());
        assert!(ego.graph().channel("C", "D").is_some());
        assert_eq!(ego.graph().edge_count(), 4);
    }

    #[test]
    fn test_no_friends_yields_empty_graph() {
        let full = ChannelGraph::from_records(&[ChannelRecord::new("A", "B", "1x0x0", 100)]).unwrap();
        let ego = EgoNetworkBuilder::prune(&full, &[], "ME").unwrap();
        assert_eq!(ego.graph().node_count(), 0);
    }
}

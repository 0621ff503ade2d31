//! Liquidity Classifier
//!
//! Buckets our own channels by how much of their capacity sits on our side.
//! - Dry: ratio below `min_incoming`, we need funds pushed back in
//! - Liquid: ratio above `max_outgoing`, we have funds to push out

use std::collections::HashMap;
use std::fmt;
use tracing::info;

use crate::types::{NodeId, OwnChannel};

/// An own channel paired with its utilization ratio
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityBucket {
    pub ratio: f64,
    pub channel: OwnChannel,
}

impl LiquidityBucket {
    pub fn peer_id(&self) -> &NodeId {
        &self.channel.peer_id
    }
}

/// Balance summary for one peer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityStats {
    pub ours_sat: u64,
    pub total_sat: u64,
    pub relative: f64,
}

impl fmt::Display for LiquidityStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "us:{:10} total:{:10} relative: {:4.2}",
            self.ours_sat, self.total_sat, self.relative
        )
    }
}

pub struct LiquidityClassifier {
    /// Ascending by ratio
    sorted: Vec<LiquidityBucket>,
    by_peer: HashMap<NodeId, OwnChannel>,
    min_incoming: f64,
    max_outgoing: f64,
}

impl LiquidityClassifier {
    pub fn new(own_channels: &[OwnChannel], min_incoming: f64, max_outgoing: f64) -> Self {
        let mut sorted: Vec<LiquidityBucket> = own_channels
            .iter()
            .map(|channel| LiquidityBucket {
                ratio: channel.ratio(),
                channel: channel.clone(),
            })
            .collect();
        sorted.sort_by(|a, b| {
            a.ratio
                .partial_cmp(&b.ratio)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let by_peer = own_channels
            .iter()
            .map(|c| (c.peer_id.clone(), c.clone()))
            .collect();

        Self {
            sorted,
            by_peer,
            min_incoming,
            max_outgoing,
        }
    }

    /// True when at least one channel is dry and at least one is liquid
    /// enough to feed it
    pub fn is_rebalance_needed(&self) -> bool {
        if self.sorted.len() < 2 {
            info!("Not enough channels to do a balancing operation");
            return false;
        }

        let lowest = &self.sorted[0];
        let highest = &self.sorted[self.sorted.len() - 1];

        if lowest.ratio > self.min_incoming {
            info!(
                "Not enough incoming capacity to rebalance (lowest ratio {:.2} > {:.2})",
                lowest.ratio, self.min_incoming
            );
            return false;
        }
        if highest.ratio < self.max_outgoing {
            info!(
                "Not enough outgoing capacity to rebalance (highest ratio {:.2} < {:.2})",
                highest.ratio, self.max_outgoing
            );
            return false;
        }
        true
    }

    pub fn dry_channels(&self) -> Vec<LiquidityBucket> {
        self.sorted
            .iter()
            .filter(|b| b.ratio < self.min_incoming)
            .cloned()
            .collect()
    }

    /// Most liquid channel comes last
    pub fn liquid_channels(&self) -> Vec<LiquidityBucket> {
        self.sorted
            .iter()
            .filter(|b| b.ratio > self.max_outgoing)
            .cloned()
            .collect()
    }

    pub fn liquidity_stats(&self, peer_id: &str) -> Option<LiquidityStats> {
        self.by_peer.get(peer_id).map(|c| LiquidityStats {
            ours_sat: c.balance_sat,
            total_sat: c.capacity_sat,
            relative: c.ratio(),
        })
    }
}

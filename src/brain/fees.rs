//! Fee Calculator
//!
//! Builds the onion for a path tail-to-head: the last hop forwards exactly
//! the requested amount, and every earlier hop must carry enough extra to
//! pay the fee of the channel after it. The sender finally pays the fee of
//! the first channel on top.

use serde::Serialize;

use crate::cartographer::ChannelGraph;
use crate::errors::{RebalanceError, Result};
use crate::types::{ChannelRecord, NodeId};

/// Final CLTV delta assumed for the last hop when none is configured
pub const DEFAULT_FINAL_CLTV_DELTA: u32 = 10;

/// One entry of the onion route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnionHop {
    /// Amount carried over this hop's channel
    pub amount_msat: u64,
    pub short_channel_id: String,
    /// Node receiving this hop
    pub node_id: NodeId,
    /// Accumulated CLTV delay from this hop to the end of the route
    pub delay: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Onion {
    /// Amount delivered at the end of the route
    pub amount_msat: u64,
    /// Amount the first node has to send, fees included
    pub total_msat: u64,
    pub hops: Vec<OnionHop>,
}

impl Onion {
    pub fn fee_msat(&self) -> u64 {
        self.total_msat - self.amount_msat
    }
}

pub struct FeeCalculator<'a> {
    graph: &'a ChannelGraph,
    final_cltv_delta: u32,
}

impl<'a> FeeCalculator<'a> {
    pub fn new(graph: &'a ChannelGraph) -> Self {
        Self {
            graph,
            final_cltv_delta: DEFAULT_FINAL_CLTV_DELTA,
        }
    }

    pub fn with_final_cltv_delta(mut self, final_cltv_delta: u32) -> Self {
        self.final_cltv_delta = final_cltv_delta;
        self
    }

    /// Resolve consecutive node pairs to the channels between them
    pub fn channels_for_path(&self, path: &[NodeId]) -> Result<Vec<&'a ChannelRecord>> {
        path.windows(2)
            .map(|pair| {
                self.graph
                    .channel(&pair[0], &pair[1])
                    .ok_or_else(|| RebalanceError::MissingChannel {
                        from: pair[0].clone(),
                        to: pair[1].clone(),
                    })
            })
            .collect()
    }

    pub fn onion(&self, amount_msat: u64, path: &[NodeId]) -> Result<Onion> {
        let channels = self.channels_for_path(path)?;

        let Some(last) = channels.last() else {
            return Ok(Onion {
                amount_msat,
                total_msat: amount_msat,
                hops: Vec::new(),
            });
        };

        let mut route = Vec::with_capacity(channels.len());
        route.push(OnionHop {
            amount_msat,
            short_channel_id: last.short_channel_id.clone(),
            node_id: last.destination.clone(),
            delay: self.final_cltv_delta,
        });

        for i in (1..channels.len()).rev() {
            let next = &route[route.len() - 1];
            let fee = channels[i]
                .fee_for(next.amount_msat)
                .ok_or(RebalanceError::FeeOverflow { hop: i })?;

            let hop = OnionHop {
                amount_msat: next
                    .amount_msat
                    .checked_add(fee)
                    .ok_or(RebalanceError::FeeOverflow { hop: i })?,
                short_channel_id: channels[i - 1].short_channel_id.clone(),
                node_id: channels[i - 1].destination.clone(),
                delay: next.delay.saturating_add(channels[i].delay),
            };
            route.push(hop);
        }
        route.reverse();

        let first_fee = channels[0]
            .fee_for(route[0].amount_msat)
            .ok_or(RebalanceError::FeeOverflow { hop: 0 })?;
        let total_msat = route[0]
            .amount_msat
            .checked_add(first_fee)
            .ok_or(RebalanceError::FeeOverflow { hop: 0 })?;

        Ok(Onion {
            amount_msat,
            total_msat,
            hops: route,
        })
    }

    /// Total routing fee for delivering `amount_msat` along `path`
    pub fn compute_fee(&self, amount_msat: u64, path: &[NodeId]) -> Result<u64> {
        self.onion(amount_msat, path).map(|onion| onion.fee_msat())
    }
}

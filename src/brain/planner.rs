//! Rebalance Planner
//!
//! For every (liquid, dry) pair of our channels, look for the cheapest cycle
//! own -> liquid peer -> ... -> dry peer -> own. A pair that fails is
//! recorded and skipped; it never aborts the scan.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fees::{FeeCalculator, Onion, DEFAULT_FINAL_CLTV_DELTA};
use super::liquidity::{LiquidityBucket, LiquidityClassifier};
use super::path_finder::{Path, PathFinder};
use crate::cartographer::ChannelGraph;
use crate::errors::{RebalanceError, Result};
use crate::types::NodeId;

pub const DEFAULT_MAX_HOPS: usize = 3;
pub const DEFAULT_PROBE_AMOUNT_MSAT: u64 = 100_000_000;

/// Which graph the candidate paths are searched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphView {
    /// Friend-of-friend network without our own channels
    #[default]
    Pruned,
    /// Every channel in the snapshot
    Full,
}

impl std::fmt::Display for GraphView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphView::Pruned => write!(f, "pruned"),
            GraphView::Full => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for GraphView {
    type Err = RebalanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pruned" | "ego" => Ok(GraphView::Pruned),
            "full" => Ok(GraphView::Full),
            other => Err(RebalanceError::Config(format!("unknown graph view '{}'", other))),
        }
    }
}

/// Result of examining one (liquid, dry) pair
#[derive(Debug)]
pub enum PairOutcome {
    /// Cheapest cycle found, with its fee at the probe amount
    Route {
        path: Path,
        fee_msat: u64,
        onion: Onion,
        candidates: usize,
    },
    /// No candidate path exists between the two peers
    NoRoute,
    /// Something went wrong while evaluating this pair
    Failed { error: RebalanceError },
}

#[derive(Debug)]
pub struct PairPlan {
    pub liquid_peer: NodeId,
    pub dry_peer: NodeId,
    pub outcome: PairOutcome,
}

impl PairPlan {
    pub fn fee_msat(&self) -> Option<u64> {
        match &self.outcome {
            PairOutcome::Route { fee_msat, .. } => Some(*fee_msat),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.outcome {
            PairOutcome::Route { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Outcome of a full planning pass
#[derive(Debug, Default)]
pub struct RebalancePlan {
    pub pairs: Vec<PairPlan>,
}

impl RebalancePlan {
    pub fn routed_count(&self) -> usize {
        self.pairs.iter().filter(|p| p.fee_msat().is_some()).count()
    }

    pub fn no_route_count(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p.outcome, PairOutcome::NoRoute))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p.outcome, PairOutcome::Failed { .. }))
            .count()
    }

    /// Routed pairs, cheapest first
    pub fn best_routes(&self) -> Vec<&PairPlan> {
        let mut routes: Vec<&PairPlan> = self.pairs.iter().filter(|p| p.fee_msat().is_some()).collect();
        routes.sort_by_key(|p| p.fee_msat());
        routes
    }
}

pub struct RebalancePlanner<'a> {
    /// Used for fees: our own channels only exist here
    full: &'a ChannelGraph,
    /// Used for path search
    search: &'a ChannelGraph,
    own_node_id: &'a str,
    max_hops: usize,
    probe_amount_msat: u64,
    final_cltv_delta: u32,
}

impl<'a> RebalancePlanner<'a> {
    pub fn new(full: &'a ChannelGraph, search: &'a ChannelGraph, own_node_id: &'a str) -> Self {
        Self {
            full,
            search,
            own_node_id,
            max_hops: DEFAULT_MAX_HOPS,
            probe_amount_msat: DEFAULT_PROBE_AMOUNT_MSAT,
            final_cltv_delta: DEFAULT_FINAL_CLTV_DELTA,
        }
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_probe_amount(mut self, probe_amount_msat: u64) -> Self {
        self.probe_amount_msat = probe_amount_msat;
        self
    }

    pub fn with_final_cltv_delta(mut self, final_cltv_delta: u32) -> Self {
        self.final_cltv_delta = final_cltv_delta;
        self
    }

    /// Cheapest cycle moving funds out through `liquid` and back in through `dry`
    pub fn plan_pair(&self, liquid: &LiquidityBucket, dry: &LiquidityBucket) -> PairPlan {
        let outcome = match self.best_cycle(liquid.peer_id(), dry.peer_id()) {
            Ok(Some((path, onion, candidates))) => PairOutcome::Route {
                fee_msat: onion.fee_msat(),
                path,
                onion,
                candidates,
            },
            Ok(None) => PairOutcome::NoRoute,
            Err(error) => {
                debug!(
                    "Pair {} -> {} failed: {}",
                    liquid.peer_id(),
                    dry.peer_id(),
                    error
                );
                PairOutcome::Failed { error }
            }
        };

        PairPlan {
            liquid_peer: liquid.peer_id().clone(),
            dry_peer: dry.peer_id().clone(),
            outcome,
        }
    }

    fn best_cycle(&self, from: &str, to: &str) -> Result<Option<(Path, Onion, usize)>> {
        if from == to {
            return Ok(None);
        }

        let finder = PathFinder::new(self.search, self.max_hops);
        let calculator =
            FeeCalculator::new(self.full).with_final_cltv_delta(self.final_cltv_delta);

        let mut best: Option<(Path, Onion)> = None;
        let mut candidates = 0;

        for body in finder.paths(from, to) {
            // Only reachable on the full view: the cycle would not be simple
            if body.iter().any(|node| node == self.own_node_id) {
                continue;
            }
            candidates += 1;

            let mut cycle = Vec::with_capacity(body.len() + 2);
            cycle.push(self.own_node_id.to_string());
            cycle.extend(body);
            cycle.push(self.own_node_id.to_string());

            let onion = calculator.onion(self.probe_amount_msat, &cycle)?;
            let cheaper = match &best {
                Some((_, current)) => onion.fee_msat() < current.fee_msat(),
                None => true,
            };
            if cheaper {
                best = Some((cycle, onion));
            }
        }

        Ok(best.map(|(path, onion)| (path, onion, candidates)))
    }

    /// Examine every (liquid, dry) pair of the classifier
    pub fn plan(&self, classifier: &LiquidityClassifier) -> RebalancePlan {
        self.plan_with_progress(classifier, |_| {})
    }

    /// Like [`plan`](Self::plan), calling `on_pair` after each pair
    pub fn plan_with_progress<F>(&self, classifier: &LiquidityClassifier, mut on_pair: F) -> RebalancePlan
    where
        F: FnMut(&PairPlan),
    {
        let liquid = classifier.liquid_channels();
        let dry = classifier.dry_channels();
        let mut plan = RebalancePlan {
            pairs: Vec::with_capacity(liquid.len() * dry.len()),
        };

        for source in &liquid {
            for dest in &dry {
                let pair = self.plan_pair(source, dest);

                if let PairOutcome::Route { fee_msat, path, candidates, .. } = &pair.outcome {
                    debug!(
                        "Found {} paths from {} to {}, best fee {} msat via {}",
                        candidates,
                        pair.liquid_peer,
                        pair.dry_peer,
                        fee_msat,
                        path.join(" → ")
                    );
                }

                on_pair(&pair);
                plan.pairs.push(pair);
            }
        }

        info!(
            "Examined {} pairs: {} routed, {} without route, {} failed",
            plan.pairs.len(),
            plan.routed_count(),
            plan.no_route_count(),
            plan.failed_count()
        );
        if plan.failed_count() > 0 {
            warn!("  {} pairs failed and were skipped", plan.failed_count());
        }

        plan
    }
}

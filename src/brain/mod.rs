//! The Brain
//!
//! Responsible for:
//! - Bucketing our channels into dry and liquid
//! - Enumerating bounded simple paths between peers
//! - Onion fee accumulation along a path
//! - Picking the cheapest rebalancing cycle per (liquid, dry) pair

mod fees;
mod liquidity;
mod path_finder;
mod planner;

pub use fees::{FeeCalculator, Onion, OnionHop, DEFAULT_FINAL_CLTV_DELTA};
pub use liquidity::{LiquidityBucket, LiquidityClassifier, LiquidityStats};
pub use path_finder::{Path, PathFinder, SimplePaths};
pub use planner::{
    GraphView, PairOutcome, PairPlan, RebalancePlan, RebalancePlanner, DEFAULT_MAX_HOPS,
    DEFAULT_PROBE_AMOUNT_MSAT,
};

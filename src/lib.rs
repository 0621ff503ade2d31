//! Liquidity analysis and rebalancing route discovery for a node in a
//! payment-channel network.
//!
//! The flow is snapshot -> [`ChannelGraph`] -> [`EgoNetworkBuilder`] ->
//! [`RebalancePlanner`], which combines the [`LiquidityClassifier`],
//! [`PathFinder`] and [`FeeCalculator`].

pub mod brain;
pub mod cartographer;
pub mod config;
pub mod errors;
pub mod types;

pub use brain::{
    FeeCalculator, GraphView, LiquidityClassifier, PairOutcome, PathFinder, RebalancePlan,
    RebalancePlanner,
};
pub use cartographer::{ChannelGraph, DuplicatePolicy, EgoNetwork, EgoNetworkBuilder};
pub use config::Config;
pub use errors::{RebalanceError, Result};
pub use types::{ChannelRecord, NodeId, OwnChannel};

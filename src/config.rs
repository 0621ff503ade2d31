//! Configuration for the rebalancer
//!
//! Loaded from environment variables (with `.env` support) or a TOML file,
//! then overridden by command line flags in the binary.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::brain::{
    GraphView, PairOutcome, PairPlan, DEFAULT_FINAL_CLTV_DELTA, DEFAULT_MAX_HOPS,
    DEFAULT_PROBE_AMOUNT_MSAT,
};
use crate::cartographer::DuplicatePolicy;
use crate::errors::{RebalanceError, Result};

/// Upper bound on the hop limit; path counts explode beyond this
pub const MAX_ALLOWED_HOPS: usize = 6;

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Snapshot ==========
    /// Our node id (hex public key)
    pub own_node_id: Option<String>,

    /// Network dump in `listchannels` format
    pub channels_path: String,

    /// Own channel dump in `listfunds` format
    pub funds_path: String,

    /// How to treat repeated (source, destination) records
    pub duplicate_policy: DuplicatePolicy,

    // ========== Liquidity Thresholds ==========
    /// Channels with a local ratio below this need inbound funds
    pub min_incoming: f64,

    /// Channels with a local ratio above this have funds to push out
    pub max_outgoing: f64,

    // ========== Path Finding ==========
    /// Maximum channels between the liquid and the dry peer
    pub max_hops: usize,

    /// Amount used to compare candidate fees (msat)
    pub probe_amount_msat: u64,

    /// Graph the candidate paths are searched on
    pub graph_view: GraphView,

    /// CLTV delta given to the last hop of the onion
    pub final_cltv_delta: u32,

    // ========== Reporting ==========
    /// Append found routes to `report_path`
    pub report_enabled: bool,

    pub report_path: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            own_node_id: env::var("OWN_NODE_ID").ok().filter(|s| !s.is_empty()),
            channels_path: env_or("CHANNELS_PATH", defaults.channels_path),
            funds_path: env_or("FUNDS_PATH", defaults.funds_path),
            duplicate_policy: env_or("DUPLICATE_POLICY", defaults.duplicate_policy),

            min_incoming: env_or("MIN_INCOMING", defaults.min_incoming),
            max_outgoing: env_or("MAX_OUTGOING", defaults.max_outgoing),

            max_hops: env_or("MAX_HOPS", defaults.max_hops),
            probe_amount_msat: env_or("PROBE_AMOUNT_MSAT", defaults.probe_amount_msat),
            graph_view: env_or("GRAPH_VIEW", defaults.graph_view),
            final_cltv_delta: env_or("FINAL_CLTV_DELTA", defaults.final_cltv_delta),

            report_enabled: env_or("REPORT_ENABLED", defaults.report_enabled),
            report_path: env_or("REPORT_PATH", defaults.report_path),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RebalanceError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| RebalanceError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_incoming) {
            return Err(RebalanceError::Config(format!(
                "MIN_INCOMING must be within [0, 1] (currently {})",
                self.min_incoming
            )));
        }
        if !(0.0..=1.0).contains(&self.max_outgoing) {
            return Err(RebalanceError::Config(format!(
                "MAX_OUTGOING must be within [0, 1] (currently {})",
                self.max_outgoing
            )));
        }
        if self.min_incoming >= self.max_outgoing {
            return Err(RebalanceError::Config(format!(
                "MIN_INCOMING ({}) must be below MAX_OUTGOING ({}) or a channel can be both dry and liquid",
                self.min_incoming, self.max_outgoing
            )));
        }
        if self.max_hops == 0 || self.max_hops > MAX_ALLOWED_HOPS {
            return Err(RebalanceError::Config(format!(
                "MAX_HOPS must be between 1 and {} (currently {})",
                MAX_ALLOWED_HOPS, self.max_hops
            )));
        }
        if self.probe_amount_msat == 0 {
            return Err(RebalanceError::Config(
                "PROBE_AMOUNT_MSAT must be positive".to_string(),
            ));
        }
        if matches!(self.own_node_id.as_deref(), Some("")) {
            return Err(RebalanceError::Config("OWN_NODE_ID is empty".to_string()));
        }
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let node = self
            .own_node_id
            .as_deref()
            .map(|id| {
                if id.chars().count() > 16 {
                    format!("{}…", id.chars().take(16).collect::<String>())
                } else {
                    id.to_string()
                }
            })
            .unwrap_or_else(|| "✗ Not Set".to_string());

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              CHANNEL REBALANCER - CONFIGURATION            ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Own Node:          {:^40} ║", node);
        println!("║ Duplicates:        {:^40} ║", self.duplicate_policy);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ LIQUIDITY THRESHOLDS                                       ║");
        println!("║ • Min Incoming:    {:<40.2} ║", self.min_incoming);
        println!("║ • Max Outgoing:    {:<40.2} ║", self.max_outgoing);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ PATH FINDING                                               ║");
        println!("║ • Max Hops:        {:^40} ║", self.max_hops);
        println!("║ • Graph View:      {:^40} ║", self.graph_view);
        println!("║ • Probe Amount:    {:>35} msat ║", self.probe_amount_msat);
        println!("║ • Final CLTV:      {:^40} ║", self.final_cltv_delta);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ • Route Report:    {:^40} ║",
            if self.report_enabled { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            own_node_id: None,
            channels_path: "./data/channels.json".to_string(),
            funds_path: "./data/funds.json".to_string(),
            duplicate_policy: DuplicatePolicy::LastWins,
            min_incoming: 0.01,
            max_outgoing: 0.99,
            max_hops: DEFAULT_MAX_HOPS,
            probe_amount_msat: DEFAULT_PROBE_AMOUNT_MSAT,
            graph_view: GraphView::Pruned,
            final_cltv_delta: DEFAULT_FINAL_CLTV_DELTA,
            report_enabled: true,
            report_path: "./logs/rebalance_routes.log".to_string(),
        }
    }
}

// ============================================
// ROUTE LOGGER
// ============================================

use chrono::{DateTime, Utc};
use std::io::Write;

/// One found rebalancing route, written as a JSON line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLog {
    pub timestamp: DateTime<Utc>,
    pub liquid_peer: String,
    pub dry_peer: String,
    pub path: Vec<String>,
    pub short_channel_ids: Vec<String>,
    pub fee_msat: u64,
    pub probe_amount_msat: u64,
    pub candidates: usize,
    pub graph_view: GraphView,
}

impl RouteLog {
    /// `None` for pairs without a route
    pub fn from_pair(pair: &PairPlan, probe_amount_msat: u64, graph_view: GraphView) -> Option<Self> {
        let PairOutcome::Route {
            path,
            fee_msat,
            onion,
            candidates,
        } = &pair.outcome
        else {
            return None;
        };

        Some(Self {
            timestamp: Utc::now(),
            liquid_peer: pair.liquid_peer.clone(),
            dry_peer: pair.dry_peer.clone(),
            path: path.clone(),
            short_channel_ids: onion.hops.iter().map(|h| h.short_channel_id.clone()).collect(),
            fee_msat: *fee_msat,
            probe_amount_msat,
            candidates: *candidates,
            graph_view,
        })
    }

    /// Append this log to a file
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let json = serde_json::to_string(self)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{FeeCalculator, LiquidityClassifier, RebalancePlanner};
    use crate::cartographer::ChannelGraph;
    use crate::types::{ChannelRecord, OwnChannel};

    fn scratch(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("channel-rebalancer-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.min_incoming, 0.01);
        assert_eq!(config.max_outgoing, 0.99);
        assert_eq!(config.max_hops, 3);
        assert_eq!(config.probe_amount_msat, 100_000_000);
        assert_eq!(config.graph_view, GraphView::Pruned);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            Config { min_incoming: -0.1, ..Config::default() },
            Config { max_outgoing: 1.5, ..Config::default() },
            Config { min_incoming: 0.6, max_outgoing: 0.4, ..Config::default() },
            Config { min_incoming: 0.5, max_outgoing: 0.5, ..Config::default() },
            Config { max_hops: 0, ..Config::default() },
            Config { max_hops: 7, ..Config::default() },
            Config { probe_amount_msat: 0, ..Config::default() },
            Config { own_node_id: Some(String::new()), ..Config::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(RebalanceError::Config(_))));
        }
    }

    #[test]
    fn test_toml_file_round_trip() {
        let path = scratch("config.toml");
        let config = Config {
            own_node_id: Some("03abc".to_string()),
            graph_view: GraphView::Full,
            duplicate_policy: DuplicatePolicy::SumCapacity,
            min_incoming: 0.25,
            max_outgoing: 0.5,
            ..Config::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("max_hops = 4\ngraph_view = \"full\"\n").unwrap();
        assert_eq!(config.max_hops, 4);
        assert_eq!(config.graph_view, GraphView::Full);
        assert_eq!(config.min_incoming, 0.01);
    }

    #[test]
    fn test_route_log_appends_json_lines() {
        let graph = ChannelGraph::from_records(&[
            ChannelRecord::new("ME", "L", "1", 100).with_fees(0, 0),
            ChannelRecord::new("L", "D", "2", 100).with_fees(1, 0),
            ChannelRecord::new("D", "ME", "3", 100).with_fees(0, 0),
        ])
        .unwrap();
        let own = vec![
            OwnChannel::new("L", 99, 100).unwrap(),
            OwnChannel::new("D", 0, 100).unwrap(),
        ];
        let classifier = LiquidityClassifier::new(&own, 0.25, 0.5);
        let plan = RebalancePlanner::new(&graph, &graph, "ME").plan(&classifier);

        let log = RouteLog::from_pair(&plan.pairs[0], 100_000_000, GraphView::Full).unwrap();
        let expected_fee = FeeCalculator::new(&graph)
            .compute_fee(100_000_000, &log.path)
            .unwrap();
        assert_eq!(log.fee_msat, expected_fee);
        assert_eq!(log.short_channel_ids, vec!["1", "2", "3"]);

        let path = scratch("routes.log");
        log.append_to_file(&path).unwrap();
        log.append_to_file(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: RouteLog = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.path, log.path);
    }
}

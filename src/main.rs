//! Channel Rebalancer - finds cheap cycles that move liquidity from our
//! over-funded channels into our drained ones.
//!
//! Run with: cargo run -- --node-id <own node id>

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use channel_rebalancer::brain::{GraphView, LiquidityClassifier, PairOutcome, RebalancePlanner};
use channel_rebalancer::cartographer::{snapshot, ChannelGraph, DuplicatePolicy, EgoNetworkBuilder};
use channel_rebalancer::config::{Config, RouteLog};

#[derive(Debug, Parser)]
#[command(name = "channel-rebalancer", version, about)]
struct Args {
    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Network dump (`listchannels` JSON)
    #[arg(long)]
    channels: Option<String>,

    /// Own channel dump (`listfunds` JSON)
    #[arg(long)]
    funds: Option<String>,

    /// Our node id
    #[arg(long)]
    node_id: Option<String>,

    #[arg(long)]
    min_incoming: Option<f64>,

    #[arg(long)]
    max_outgoing: Option<f64>,

    #[arg(long)]
    max_hops: Option<usize>,

    /// Amount used to compare candidate fees (msat)
    #[arg(long)]
    probe_amount: Option<u64>,

    /// `pruned` or `full`
    #[arg(long)]
    graph_view: Option<GraphView>,

    /// `last_wins`, `reject` or `sum_capacity`
    #[arg(long)]
    duplicates: Option<DuplicatePolicy>,

    /// Do not append found routes to the report file
    #[arg(long)]
    no_report: bool,
}

impl Args {
    fn apply(self, mut config: Config) -> Config {
        if let Some(v) = self.channels {
            config.channels_path = v;
        }
        if let Some(v) = self.funds {
            config.funds_path = v;
        }
        if let Some(v) = self.node_id {
            config.own_node_id = Some(v);
        }
        if let Some(v) = self.min_incoming {
            config.min_incoming = v;
        }
        if let Some(v) = self.max_outgoing {
            config.max_outgoing = v;
        }
        if let Some(v) = self.max_hops {
            config.max_hops = v;
        }
        if let Some(v) = self.probe_amount {
            config.probe_amount_msat = v;
        }
        if let Some(v) = self.graph_view {
            config.graph_view = v;
        }
        if let Some(v) = self.duplicates {
            config.duplicate_policy = v;
        }
        if self.no_report {
            config.report_enabled = false;
        }
        config
    }
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" ⚖  CHANNEL REBALANCER - Cheapest Liquidity Cycles").cyan().bold()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn short_id(id: &str) -> String {
    if id.chars().count() > 12 {
        format!("{}…", id.chars().take(12).collect::<String>())
    } else {
        id.to_string()
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("channel_rebalancer=info".parse()?),
        )
        .init();

    print_banner();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };
    let config = args.apply(config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }
    let own_node_id = config
        .own_node_id
        .clone()
        .ok_or_else(|| eyre!("Own node id is required (--node-id or OWN_NODE_ID)"))?;

    config.print_summary();
    println!();

    // =============================================
    // STEP 1: LIQUIDITY
    // =============================================
    println!("{}", style("═══ STEP 1: OWN CHANNEL LIQUIDITY ═══").blue().bold());
    println!();

    let own_channels = snapshot::load_own_channels(&config.funds_path)?;
    let classifier =
        LiquidityClassifier::new(&own_channels, config.min_incoming, config.max_outgoing);

    if !classifier.is_rebalance_needed() {
        println!("{} No rebalancing needed", style("✓").green());
        return Ok(());
    }
    println!("{} Channel balancing is suggested", style("!").yellow().bold());

    let liquid = classifier.liquid_channels();
    let dry = classifier.dry_channels();

    println!("   Channels with too little incoming capacity ({}):", liquid.len());
    for bucket in &liquid {
        println!("     {:4.2}  {}", bucket.ratio, bucket.peer_id());
    }
    println!("   Channels with too little outgoing capacity ({}):", dry.len());
    for bucket in &dry {
        println!("     {:4.2}  {}", bucket.ratio, bucket.peer_id());
    }

    // =============================================
    // STEP 2: THE CARTOGRAPHER
    // =============================================
    println!();
    println!("{}", style("═══ STEP 2: THE CARTOGRAPHER ═══").blue().bold());
    println!();

    let start = Instant::now();
    let records = snapshot::load_channels(&config.channels_path)?;
    let full = ChannelGraph::build(&records, config.duplicate_policy)?;
    let ego = EgoNetworkBuilder::prune(&full, &own_channels, &own_node_id)?;

    println!(
        "{} Graphs built in {:?}: full {} nodes / {} edges, pruned {} nodes / {} edges",
        style("✓").green(),
        start.elapsed(),
        full.node_count(),
        full.edge_count(),
        ego.graph().node_count(),
        ego.graph().edge_count()
    );

    // =============================================
    // STEP 3: THE BRAIN
    // =============================================
    println!();
    println!("{}", style("═══ STEP 3: THE BRAIN ═══").magenta().bold());
    println!();

    let search = match config.graph_view {
        GraphView::Pruned => ego.graph(),
        GraphView::Full => &full,
    };
    let planner = RebalancePlanner::new(&full, search, &own_node_id)
        .with_max_hops(config.max_hops)
        .with_probe_amount(config.probe_amount_msat)
        .with_final_cltv_delta(config.final_cltv_delta);

    let progress = ProgressBar::new((liquid.len() * dry.len()) as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} pairs {msg}")?
            .progress_chars("=> "),
    );

    let start = Instant::now();
    let plan = planner.plan_with_progress(&classifier, |pair| {
        progress.set_message(short_id(&pair.dry_peer));
        progress.inc(1);
    });
    progress.finish_and_clear();

    println!(
        "{} Examined {} pairs in {:?}: {} routed, {} without route, {} failed",
        style("✓").green(),
        plan.pairs.len(),
        start.elapsed(),
        plan.routed_count(),
        plan.no_route_count(),
        plan.failed_count()
    );

    for pair in &plan.pairs {
        if let PairOutcome::Failed { error } = &pair.outcome {
            warn!(
                "  {} -> {} skipped: {}",
                short_id(&pair.liquid_peer),
                short_id(&pair.dry_peer),
                error
            );
        }
    }

    println!();
    for pair in plan.best_routes() {
        let PairOutcome::Route { path, fee_msat, candidates, .. } = &pair.outcome else {
            continue;
        };
        let from_stats = classifier
            .liquidity_stats(&pair.liquid_peer)
            .map(|s| s.to_string())
            .unwrap_or_default();
        let to_stats = classifier
            .liquidity_stats(&pair.dry_peer)
            .map(|s| s.to_string())
            .unwrap_or_default();

        println!(
            "{} {:>10} msat  {}",
            style("→").green().bold(),
            fee_msat,
            path.iter().map(|n| short_id(n)).collect::<Vec<_>>().join(" → ")
        );
        println!(
            "   found {:6} paths from {} with {} to {} with {}",
            candidates,
            short_id(&pair.liquid_peer),
            from_stats,
            short_id(&pair.dry_peer),
            to_stats
        );

        if config.report_enabled {
            if let Some(log) = RouteLog::from_pair(pair, config.probe_amount_msat, config.graph_view) {
                if let Err(e) = log.append_to_file(&config.report_path) {
                    warn!("Failed to write route report: {}", e);
                }
            }
        }
    }

    if config.report_enabled && plan.routed_count() > 0 {
        info!("Routes appended to {}", config.report_path);
    }

    Ok(())
}

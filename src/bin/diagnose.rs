//! Diagnostic tool - check configuration and snapshot files
//!
//! Run with: cargo run --bin diagnose

use std::env;
use std::path::Path;

use channel_rebalancer::cartographer::{snapshot, ChannelGraph, EgoNetworkBuilder};
use channel_rebalancer::config::Config;

fn main() {
    println!("🔍 REBALANCER DIAGNOSTIC CHECK\n");

    let config = Config::from_env();

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("MIN_INCOMING", "0.01", "Ratio below which a channel is dry"),
        ("MAX_OUTGOING", "0.99", "Ratio above which a channel is liquid"),
        ("MAX_HOPS", "3", "Maximum channels between liquid and dry peer"),
        ("PROBE_AMOUNT_MSAT", "100000000", "Amount used to compare fees"),
        ("GRAPH_VIEW", "pruned", "Graph searched for paths"),
        ("DUPLICATE_POLICY", "last_wins", "Handling of repeated channel records"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let marker = if env::var(key).is_err() { "(default)" } else { "(from .env)" };
        println!("  {}: {} {}", key, value, marker);
        println!("    └─ {}\n", desc);
    }

    match config.validate() {
        Ok(()) => println!("  Validation:   ✅ OK"),
        Err(e) => println!("  Validation:   ❌ {}", e),
    }
    println!(
        "  OWN_NODE_ID:  {}",
        if config.own_node_id.is_some() { "✅ Set" } else { "❌ Not set" }
    );

    println!("\n═══════════════════════════════════════════════════");
    println!("                    SNAPSHOTS                       ");
    println!("═══════════════════════════════════════════════════\n");

    let channels_ok = Path::new(&config.channels_path).exists();
    let funds_ok = Path::new(&config.funds_path).exists();
    println!("  CHANNELS_PATH: {} {}", config.channels_path, if channels_ok { "✅" } else { "❌ missing" });
    println!("  FUNDS_PATH:    {} {}", config.funds_path, if funds_ok { "✅" } else { "❌ missing" });

    if !(channels_ok && funds_ok) {
        return;
    }

    let own = match snapshot::load_own_channels(&config.funds_path) {
        Ok(own) => own,
        Err(e) => {
            println!("  ❌ Own channels unreadable: {}", e);
            return;
        }
    };
    let graph = match snapshot::load_channels(&config.channels_path)
        .and_then(|records| ChannelGraph::build(&records, config.duplicate_policy))
    {
        Ok(graph) => graph,
        Err(e) => {
            println!("  ❌ Channel graph unreadable: {}", e);
            return;
        }
    };

    println!("\n  Own channels:  {}", own.len());
    println!("  Full graph:    {} nodes, {} edges", graph.node_count(), graph.edge_count());

    if let Some(node_id) = &config.own_node_id {
        if !graph.contains_node(node_id) {
            println!("  ⚠️  Own node does not appear in the channel snapshot");
        }
        match EgoNetworkBuilder::prune(&graph, &own, node_id) {
            Ok(ego) => println!(
                "  Pruned graph:  {} nodes, {} edges ({} friends, {} leaf peers removed)",
                ego.graph().node_count(),
                ego.graph().edge_count(),
                ego.friends().len(),
                ego.removed().len()
            ),
            Err(e) => println!("  ❌ Pruning failed: {}", e),
        }
    }

    println!();
}

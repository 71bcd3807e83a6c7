// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! heapdom CLI
//!
//! Loads a decoded heap snapshot document and reports dominators and
//! retained sizes.

mod config;
mod document;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use document::SnapshotDocument;
use heapdom_core::{HeapAnalysis, NodeId};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{Level, error, info};

#[derive(Parser, Debug)]
#[command(name = "heapdom")]
#[command(about = "Heap dominator and retained size inspector")]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML, overrides $HEAPDOM_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Node, root and reachability totals of a snapshot
    Summary {
        /// Snapshot document (JSON)
        snapshot: PathBuf,
    },
    /// Immediate dominator of every reachable node
    Dominators {
        snapshot: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Nodes retaining the most memory
    Retained {
        snapshot: PathBuf,
        /// Rank by one heap partition instead of all heaps together
        #[arg(long)]
        heap: Option<String>,
        /// Number of nodes to list
        #[arg(long, default_value_t = 20)]
        top: usize,
        #[arg(long)]
        json: bool,
    },
    /// Dominator chain of a node up to the sentinel root
    Path {
        snapshot: PathBuf,
        /// Node id, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_node_id)]
        id: NodeId,
    },
}

fn parse_node_id(raw: &str) -> Result<NodeId, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map(NodeId::from).map_err(|e| format!("invalid node id {raw:?}: {e}"))
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(log_level(cli.verbose)).with_writer(std::io::stderr).init();

    let result = match cli.command {
        Commands::Summary { ref snapshot } => handle_summary(&cli, snapshot),
        Commands::Dominators { ref snapshot, json } => handle_dominators(&cli, snapshot, json),
        Commands::Retained { ref snapshot, ref heap, top, json } => handle_retained(&cli, snapshot, heap.as_deref(), top, json),
        Commands::Path { ref snapshot, id } => handle_path(&cli, snapshot, id),
    };

    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            error!("Command failed: {:#}", e);
            process::exit(1);
        }
    }
}

/// Load the configuration and snapshot into a fresh analysis session
fn open_session(cli: &Cli, snapshot: &Path) -> Result<HeapAnalysis> {
    let config = config::resolve_config(cli.config.clone())?;
    let graph = SnapshotDocument::load(snapshot)?.into_graph(config.graph)?;
    info!(nodes = graph.len(), heaps = graph.heaps().len(), "snapshot ready");
    Ok(HeapAnalysis::with_config(Arc::new(graph), config))
}

fn handle_summary(cli: &Cli, snapshot: &Path) -> Result<String> {
    let analysis = open_session(cli, snapshot)?;
    report::summary(&analysis)
}

fn handle_dominators(cli: &Cli, snapshot: &Path, json: bool) -> Result<String> {
    let analysis = open_session(cli, snapshot)?;
    report::dominators(&analysis, json)
}

fn handle_retained(cli: &Cli, snapshot: &Path, heap: Option<&str>, top: usize, json: bool) -> Result<String> {
    let analysis = open_session(cli, snapshot)?;
    report::retained(&analysis, heap, top, json)
}

fn handle_path(cli: &Cli, snapshot: &Path, id: NodeId) -> Result<String> {
    let analysis = open_session(cli, snapshot)?;
    report::path(&analysis, id)
}

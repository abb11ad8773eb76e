//! Process bootstrap for one lease node: parses `--id`/`--population`/
//! `--config`, starts the node, and keeps the process alive until an
//! interrupt signal arrives. Everything interesting happens inside the
//! `paxoslease` library; this binary is just the thin wrapper around it.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use paxoslease::{LeaseNode, ReplicaId};

/// Command-line arguments for one lease node process.
#[derive(Parser, Debug)]
#[command(name = "paxoslease_node", about = "Paxos-based leader lease node")]
struct Args {
    /// This node's ID, in [0, population).
    #[arg(long)]
    id: ReplicaId,

    /// Total number of nodes in the cluster, including this one.
    #[arg(long)]
    population: u8,

    /// Optional TOML config fragment overriding the compiled-in defaults,
    /// e.g. `--config "period_len_ms = 500"`.
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("node exited with error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), paxoslease::LeaseError> {
    let mut node =
        LeaseNode::new_and_setup(args.id, args.population, args.config.as_deref()).await?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_for_handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_for_handler.store(true, Ordering::SeqCst);
    })
    .expect("failed to install Ctrl-C handler");

    println!("node {} started, population {}", args.id, args.population);
    let handle = node.handle();
    let mut was_master = false;

    while !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let is_master = handle.check_master();
        if is_master != was_master {
            println!(
                "node {} CheckMaster() -> {}",
                args.id, is_master
            );
            was_master = is_master;
        }
    }

    println!("node {} shutting down", args.id);
    node.shutdown().await;
    Ok(())
}

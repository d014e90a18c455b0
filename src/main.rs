//! CLI for the extraction pipelines

use anyhow::Result;
use chain_extract::driver::{self, MultisigConfig, PoolConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chain-extract")]
#[command(about = "Multisig output and mining pool datasets from indexed Bitcoin data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every multisignature output from a transaction graph snapshot
    Multisig {
        /// Path to the graph snapshot (JSON export of the indexed graph)
        #[arg(short, long)]
        graph: PathBuf,

        /// Output file for the multisig dataset
        #[arg(short, long, default_value = "output/multisig.csv")]
        output: PathBuf,
    },

    /// Attribute each block to a known mining pool
    Pools {
        /// Raw block file, or a directory of blk*.dat files
        #[arg(short, long)]
        blocks: PathBuf,

        /// pools.json file of known payout addresses and coinbase tags
        #[arg(short, long)]
        pool_data: PathBuf,

        /// Output file, one pool name per block
        #[arg(short, long, default_value = "output/known-pools.txt")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Multisig { graph, output } => {
            driver::run_multisig(&MultisigConfig {
                graph_path: graph,
                output_path: output,
            })?;
        }
        Commands::Pools {
            blocks,
            pool_data,
            output,
        } => {
            driver::run_pools(&PoolConfig {
                blocks_path: blocks,
                directory_path: pool_data,
                output_path: output,
            })?;
        }
    }

    Ok(())
}

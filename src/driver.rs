//! Pipeline orchestration
//!
//! The driver pulls candidates from a data source, invokes the
//! relevant extractor, and forwards rows to the result sink.
//! Per-record data faults are handled inside the extractors; any error
//! that reaches the driver is fatal to the run. Each pipeline takes an
//! explicit config struct, so no process-wide state is involved.

use crate::block::reader::BlockFileReader;
use crate::graph::memory::MemoryGraph;
use crate::multisig::{MultisigOutputs, MultisigRow};
use crate::pool::directory::PoolDirectory;
use crate::pool::PoolAttributionEngine;
use crate::sink::RowSink;
use anyhow::{Context, Result};
use bitcoin::Block;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Inputs and outputs of a multisig extraction run.
#[derive(Debug, Clone)]
pub struct MultisigConfig {
    /// Graph snapshot to traverse.
    pub graph_path: PathBuf,
    /// Destination of the multisig dataset.
    pub output_path: PathBuf,
}

/// Inputs and outputs of a pool attribution run.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Raw block file or directory of blk*.dat files.
    pub blocks_path: PathBuf,
    /// pools.json directory of payout addresses and coinbase tags.
    pub directory_path: PathBuf,
    /// Destination of the attribution list, one name per block.
    pub output_path: PathBuf,
}

/// Forward multisig rows to the sink. Returns the row count.
pub fn write_multisig_rows<I>(rows: I, sink: &mut RowSink) -> Result<u64>
where
    I: IntoIterator<Item = MultisigRow>,
{
    let mut count = 0u64;
    for row in rows {
        sink.write_row(row.fields())?;
        count += 1;
    }
    sink.flush()?;
    Ok(count)
}

/// Attribute every block to a pool, writing one line per block in
/// input order. A block that cannot be supplied aborts the run:
/// skipping it would silently break the positional alignment between
/// input blocks and output lines.
pub fn attribute_pools<B, E, W>(blocks: B, directory: &PoolDirectory, mut out: W) -> Result<u64>
where
    B: IntoIterator<Item = Result<Block, E>>,
    E: std::error::Error + Send + Sync + 'static,
    W: Write,
{
    let engine = PoolAttributionEngine::new(directory);
    let mut count = 0u64;
    for block in blocks {
        let block = block.context("failed to read block")?;
        let name = engine.attribute(&block);
        writeln!(out, "{name}").context("failed to write pool attribution")?;
        count += 1;
    }
    out.flush().context("failed to flush pool attributions")?;
    Ok(count)
}

/// Run the multisig pipeline end to end.
pub fn run_multisig(config: &MultisigConfig) -> Result<u64> {
    let graph = MemoryGraph::from_json_file(&config.graph_path)?;
    let mut sink = RowSink::create(&config.output_path)?;

    let pb = spinner("multisig outputs")?;
    let rows = write_multisig_rows(pb.wrap_iter(MultisigOutputs::new(&graph)), &mut sink)?;
    pb.finish_and_clear();

    info!(
        "extracted {} multisig outputs to {}",
        rows,
        config.output_path.display()
    );
    Ok(rows)
}

/// Run the pool attribution pipeline end to end.
pub fn run_pools(config: &PoolConfig) -> Result<u64> {
    let directory = PoolDirectory::load(&config.directory_path).with_context(|| {
        format!(
            "failed to load pool directory {}",
            config.directory_path.display()
        )
    })?;
    info!(
        "loaded {} payout addresses and {} coinbase tags",
        directory.n_payout_addresses(),
        directory.n_coinbase_tags()
    );

    let blocks = BlockFileReader::new(&config.blocks_path)?;
    let file = File::create(&config.output_path).with_context(|| {
        format!(
            "failed to create output file {}",
            config.output_path.display()
        )
    })?;

    let pb = spinner("blocks")?;
    let count = attribute_pools(pb.wrap_iter(blocks), &directory, BufWriter::new(file))?;
    pb.finish_and_clear();

    info!(
        "attributed {} blocks to {}",
        count,
        config.output_path.display()
    );
    Ok(count)
}

fn spinner(label: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")?,
    );
    pb.set_message(label.to_string());
    Ok(pb)
}

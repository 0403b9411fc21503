//! `send` subcommand: transmit a file to the peer.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use xmlink::{BlockSize, XmodemTransfer, cancel_context_from_global};

use crate::Cli;
use crate::config::Config;
use crate::serial::open_channel;

pub(crate) fn cmd_send(cli: &Cli, config: &Config, file: &Path, block_size: BlockSize) -> Result<()> {
    let mut source =
        File::open(file).with_context(|| format!("failed to open {}", file.display()))?;
    let file_len = source
        .metadata()
        .with_context(|| format!("failed to stat {}", file.display()))?
        .len();
    let padded_len = file_len.div_ceil(block_size.bytes() as u64) * block_size.bytes() as u64;

    let mut channel = open_channel(cli, config)?;

    println!(
        "{} Sending {} ({} bytes, {}-byte blocks)",
        style("->").cyan(),
        file.display(),
        file_len,
        block_size.bytes()
    );
    println!(
        "{} Waiting for the receiver to request the transfer...",
        style("*").yellow()
    );

    let pb = ProgressBar::new(padded_len.max(1));
    #[allow(clippy::unwrap_used)] // Static template string, unwrap is safe
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let sent = XmodemTransfer::new(&mut channel)
        .with_cancel(cancel_context_from_global())
        .transmit(&mut source, block_size, |done, _total| {
            pb.set_position(done as u64);
        })?;

    pb.finish_and_clear();
    println!(
        "{} Sent {} byte(s) ({} on the wire after padding)",
        style("ok").green().bold(),
        file_len,
        sent
    );
    Ok(())
}

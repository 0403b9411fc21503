//! `recv` subcommand: receive a file from the peer.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use xmlink::{XmodemTransfer, cancel_context_from_global};

use crate::Cli;
use crate::config::Config;
use crate::serial::open_channel;

pub(crate) fn cmd_recv(cli: &Cli, config: &Config, file: &Path) -> Result<()> {
    let mut channel = open_channel(cli, config)?;

    println!(
        "{} Receiving into {} (start the peer with `xmlink send`)",
        style("<-").cyan(),
        file.display()
    );

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::unwrap_used)] // Static template string, unwrap is safe
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap());
    pb.set_message("waiting for the sender...");

    // Buffer the whole transfer; the destination file is only written on
    // success, so a failed session leaves nothing behind.
    let mut data = Vec::new();
    let received = XmodemTransfer::new(&mut channel)
        .with_cancel(cancel_context_from_global())
        .receive(&mut data, |bytes| {
            pb.set_message(format!("{bytes} byte(s) received"));
        })?;

    pb.finish_and_clear();
    fs::write(file, &data).with_context(|| format!("failed to write {}", file.display()))?;
    println!(
        "{} Received {} byte(s) into {}",
        style("ok").green().bold(),
        received,
        file.display()
    );
    Ok(())
}

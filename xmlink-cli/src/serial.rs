//! Serial port selection for the CLI.
//!
//! Mirrors the usual flashing-tool flow: an explicit `-p` wins, then the
//! config file, then auto-selection when exactly one port exists, and
//! finally an interactive pick when running on a terminal.

use std::io::IsTerminal;

use anyhow::{Context, Result, bail};
use dialoguer::{Select, theme::ColorfulTheme};
use log::{debug, info};
use xmlink::{PortInfo, SerialChannel, SerialConfig, list_ports};

use crate::Cli;
use crate::config::Config;

const DEFAULT_BAUD: u32 = 115200;

/// Open the serial channel for a session, resolving port and baud rate.
pub(crate) fn open_channel(cli: &Cli, config: &Config) -> Result<SerialChannel> {
    let name = select_port_name(cli, config)?;
    let baud = cli
        .baud
        .or(config.connection.baud)
        .unwrap_or(DEFAULT_BAUD);
    info!("opening {name} at {baud} baud");

    let mut channel = SerialChannel::open(&SerialConfig::new(&name, baud))
        .with_context(|| format!("failed to open serial port {name}"))?;
    // Stale bytes from before the session would confuse the handshake.
    channel
        .clear()
        .with_context(|| format!("failed to clear buffers on {name}"))?;
    Ok(channel)
}

fn select_port_name(cli: &Cli, config: &Config) -> Result<String> {
    if let Some(port) = &cli.port {
        return Ok(port.clone());
    }
    if let Some(port) = &config.connection.serial {
        debug!("using port from config: {port}");
        return Ok(port.clone());
    }

    let ports = list_ports().context("failed to enumerate serial ports")?;
    if ports.is_empty() {
        bail!("no serial ports found; connect a device or pass -p");
    }
    if ports.len() == 1 {
        info!("auto-selected port: {}", ports[0].name);
        return Ok(ports[0].name.clone());
    }
    if !std::io::stdin().is_terminal() {
        bail!("multiple serial ports found; pass -p to choose one");
    }

    let items: Vec<String> = ports.iter().map(describe_port).collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select serial port")
        .items(&items)
        .default(0)
        .interact()
        .context("port selection aborted")?;
    Ok(ports[index].name.clone())
}

fn describe_port(port: &PortInfo) -> String {
    let mut desc = port.name.clone();
    if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
        desc.push_str(&format!(" ({vid:04X}:{pid:04X})"));
    }
    if let Some(product) = &port.product {
        desc.push_str(&format!(" - {product}"));
    }
    desc
}

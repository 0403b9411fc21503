//! xmlink CLI - XMODEM-CRC / XMODEM-1K file transfer over a serial port.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use env_logger::Env;
use std::path::PathBuf;
use xmlink::BlockSize;

mod commands;
mod config;
mod serial;

/// xmlink - transfer files over serial links with XMODEM.
#[derive(Parser)]
#[command(name = "xmlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial port to use (selected interactively if not specified).
    #[arg(short, long, env = "XMLINK_PORT", global = true)]
    port: Option<String>,

    /// Baud rate for the link [default: 115200].
    #[arg(short, long, env = "XMLINK_BAUD", global = true)]
    baud: Option<u32>,

    /// Verbose output level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Send a file to the peer.
    Send {
        /// File to transmit.
        file: PathBuf,

        /// Payload size per frame: 128 (XMODEM-CRC) or 1024 (XMODEM-1K).
        #[arg(long, default_value = "128", value_parser = parse_block_size)]
        block_size: BlockSize,
    },

    /// Receive a file from the peer.
    Recv {
        /// Destination file, written only when the transfer succeeds.
        file: PathBuf,
    },

    /// List available serial ports.
    ListPorts {
        /// Machine-readable JSON output.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parse the frame payload size.
fn parse_block_size(s: &str) -> Result<BlockSize, String> {
    match s {
        "128" => Ok(BlockSize::Standard),
        "1024" | "1k" => Ok(BlockSize::OneK),
        _ => Err(format!("invalid block size '{s}': expected 128 or 1024")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Ctrl-C flips the interrupt flag; the active session answers with CAN.
    ctrlc::set_handler(xmlink::set_interrupt_flag)
        .context("failed to install Ctrl-C handler")?;

    let config = config::Config::load();

    match &cli.command {
        Commands::Send { file, block_size } => {
            commands::send::cmd_send(&cli, &config, file, *block_size)
        }
        Commands::Recv { file } => commands::recv::cmd_recv(&cli, &config, file),
        Commands::ListPorts { json } => commands::ports::cmd_list_ports(*json),
        Commands::Completions { shell } => {
            commands::completions::cmd_completions(*shell);
            Ok(())
        }
    }
}

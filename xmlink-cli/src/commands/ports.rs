//! `list-ports` subcommand.

use anyhow::Result;
use console::style;
use xmlink::list_ports;

pub(crate) fn cmd_list_ports(json: bool) -> Result<()> {
    let ports = list_ports()?;

    if json {
        let entries: Vec<serde_json::Value> = ports
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "vid": p.vid,
                    "pid": p.pid,
                    "product": p.product,
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(entries));
        return Ok(());
    }

    println!("{}", style("Available Serial Ports").bold().underlined());
    if ports.is_empty() {
        println!("  {}", style("No serial ports found").dim());
        return Ok(());
    }
    for port in &ports {
        let vid_pid = if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            format!(" ({vid:04X}:{pid:04X})")
        } else {
            String::new()
        };
        let product = port
            .product
            .as_deref()
            .map(|p| format!(" - {}", style(p).dim()))
            .unwrap_or_default();
        println!(
            "  {} {}{}{}",
            style("*").green(),
            style(&port.name).cyan(),
            vid_pid,
            product
        );
    }
    Ok(())
}

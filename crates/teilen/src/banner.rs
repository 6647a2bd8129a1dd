//! Startup welcome message.

use std::net::{IpAddr, UdpSocket};

use crate::config::{AppConfig, Mode};

/// An address the instance is probably reachable at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressOption {
    pub name: &'static str,
    pub address: String,
}

/// Detect the LAN address by asking the OS which interface routes to a private IP.
///
/// Connecting a UDP socket sends no packets.
pub fn local_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
    socket.connect(("10.254.254.254", 1)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

pub fn address_options() -> Vec<AddressOption> {
    local_address()
        .map(|ip| AddressOption {
            name: "local",
            address: format!("http://{ip}"),
        })
        .into_iter()
        .collect()
}

/// Frame the welcome lines in a box of `#`.
pub fn render(config: &AppConfig, options: &[AddressOption]) -> String {
    let mut lines = vec!["Your teilen-instance will be available shortly.".to_string()];
    if config.mode == Mode::Dev {
        lines.push("Running in dev-mode.".to_string());
    }
    if !options.is_empty() {
        lines.push("The following addresses have been detected automatically:".to_string());
    }
    lines.extend(
        options
            .iter()
            .map(|o| format!(" * {}: {}:{}", o.name, o.address, config.port)),
    );

    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let delimiter = "#".repeat(width + 4);

    let mut out = String::new();
    out.push_str(&delimiter);
    out.push('\n');
    for line in &lines {
        let pad = width - line.chars().count();
        out.push_str(&format!("# {line}{} #\n", " ".repeat(pad)));
    }
    out.push_str(&delimiter);
    out.push('\n');
    out
}

//! amcdrive - command-line access to AMC servo drive parameters
//!
//! Opens a session on a serial port, requests access control and runs one command.

use amcdrive_core::drive::{Drive, StatusReport};
use amcdrive_core::protocol::{list_ports, Session, SessionConfig, Transport};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: &str = "/dev/ttyUSB0";

#[derive(Parser)]
#[command(name = "amcdrive")]
#[command(about = "Read and write AMC servo drive parameters over a serial link")]
#[command(version)]
struct Cli {
    /// Serial port [default: /dev/ttyUSB0]
    #[arg(short, long, env = "AMCDRIVE_PORT")]
    port: Option<String>,

    /// Baud rate [default: 115200]
    #[arg(short, long)]
    baud: Option<u32>,

    /// Drive address [default: 63]
    #[arg(short, long)]
    address: Option<u8>,

    /// Response timeout in milliseconds [default: 1000]
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON session configuration; flags given on the command line take precedence
    #[arg(short, long, env = "AMCDRIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Log protocol activity and raw frames
    #[arg(long)]
    debug: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// List available serial ports
    Ports,

    #[command(flatten)]
    Drive(DriveCommand),
}

/// Commands that talk to a drive
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum DriveCommand {
    /// Show drive name and product information
    Id,

    /// Show bridge control and all status registers
    BridgeStatus,

    /// Enable the power bridge
    EnableBridge {
        /// Disable (inhibit) the bridge instead
        #[arg(long)]
        off: bool,
    },

    /// Engage quick stop
    QuickStop {
        /// Release quick stop instead
        #[arg(long)]
        release: bool,
    },

    /// Clear latched drive events
    ResetEvents,

    /// Read an interface value (0-15)
    GetInterface {
        /// Interface number
        n: u8,
    },

    /// Write an interface value (0-15)
    SetInterface {
        /// Interface number
        n: u8,

        /// New value
        value: u32,
    },
}

impl Cli {
    /// Defaults, then the config file, then explicit flags
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_file(path)?,
            None => SessionConfig::default(),
        };

        if let Some(port) = &self.port {
            config.port_name = port.clone();
        } else if config.port_name.is_empty() {
            config.port_name = DEFAULT_PORT.to_string();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        config.diagnostics |= self.debug;

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let command = match &cli.command {
        Commands::Ports => return print_ports(cli.json),
        Commands::Drive(command) => command,
    };

    let config = cli.session_config()?;
    tracing::debug!(?config, "opening session");
    let session = Session::open(&config)
        .with_context(|| format!("Failed to open {}", config.port_name))?;
    let mut drive = Drive::new(session);

    if let Err(e) = drive.get_access_control() {
        tracing::warn!("Could not gain access control: {}", e);
    }

    run(&mut drive, command, cli.json)
}

fn init_logging(debug: bool) {
    let default = if debug {
        "amcdrive=debug,amcdrive_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run<T: Transport>(drive: &mut Drive<T>, command: &DriveCommand, json: bool) -> Result<()> {
    match *command {
        DriveCommand::Id => {
            let name = drive.drive_name().context("Failed to read drive name")?;
            let info = drive
                .get_product_info()
                .context("Failed to read product information")?;

            if json {
                let out = serde_json::json!({ "name": name, "product": info });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Drive name:       {}", name);
                println!(
                    "Control board:    {} v{}",
                    info.control_board_name, info.control_board_version
                );
                println!("  serial:         {}", info.control_board_serial);
                println!(
                    "  built:          {} {}",
                    info.control_board_build_date, info.control_board_build_time
                );
                println!(
                    "Product:          {} v{}",
                    info.product_part_number, info.product_version
                );
                println!("  serial:         {}", info.product_serial_number);
                println!(
                    "  built:          {} {}",
                    info.product_build_date, info.product_build_time
                );
            }
        }
        DriveCommand::BridgeStatus => {
            let report = drive.status_report().context("Failed to read status registers")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        DriveCommand::EnableBridge { off } => {
            drive
                .enable_bridge(!off)
                .context("Failed to update bridge control")?;
            println!("Bridge {}", if off { "disabled" } else { "enabled" });
        }
        DriveCommand::QuickStop { release } => {
            drive
                .quick_stop(!release)
                .context("Failed to update bridge control")?;
            println!("Quick stop {}", if release { "released" } else { "engaged" });
        }
        DriveCommand::ResetEvents => {
            drive.reset_events().context("Failed to reset events")?;
            println!("Events reset");
        }
        DriveCommand::GetInterface { n } => {
            let value = drive
                .get_command_param(n)
                .with_context(|| format!("Failed to read interface {}", n))?;
            if json {
                println!("{}", serde_json::json!({ "interface": n, "value": value }));
            } else {
                println!("Interface {} = {}", n, value);
            }
        }
        DriveCommand::SetInterface { n, value } => {
            drive
                .set_command_param(n, value)
                .with_context(|| format!("Failed to write interface {}", n))?;
            println!("Interface {} set to {}", n, value);
        }
    }
    Ok(())
}

fn print_report(report: &StatusReport) {
    let rows: [(&str, u16, Vec<&str>); 6] = [
        ("Bridge control", report.bridge_control.bits(), report.bridge_control.active()),
        ("Bridge status", report.bridge_status.bits(), report.bridge_status.active()),
        ("Drive protection", report.protection.bits(), report.protection.active()),
        (
            "System protection",
            report.system_protection.bits(),
            report.system_protection.active(),
        ),
        ("Drive status 1", report.drive_status_1.bits(), report.drive_status_1.active()),
        ("Drive status 2", report.drive_status_2.bits(), report.drive_status_2.active()),
    ];

    for (label, bits, active) in rows {
        if active.is_empty() {
            println!("{:<18} {:#06x}", label, bits);
        } else {
            println!("{:<18} {:#06x}  {}", label, bits, active.join(", "));
        }
    }
}

fn print_ports(json: bool) -> Result<()> {
    let ports = list_ports();

    if json {
        let out: Vec<_> = ports
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
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}  [{:04x}:{:04x}] {}",
                port.name,
                vid,
                pid,
                port.product.as_deref().unwrap_or("")
            ),
            _ => println!("{}", port.name),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_without_config() {
        let cli = Cli::try_parse_from(["amcdrive", "id"]).unwrap();
        let config = cli.session_config().unwrap();
        assert_eq!(config.port_name, DEFAULT_PORT);
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.address, 63);
        assert_eq!(config.timeout_ms, 1000);
        assert!(!config.diagnostics);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "port_name": "/dev/ttyS1", "baud_rate": 57600, "address": 5 }}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from([
            "amcdrive", "--config", path, "--address", "9", "--debug", "bridge-status",
        ])
        .unwrap();
        let config = cli.session_config().unwrap();
        assert_eq!(config.port_name, "/dev/ttyS1");
        assert_eq!(config.baud_rate, 57600);
        assert_eq!(config.address, 9);
        assert!(config.diagnostics);
    }

    #[test]
    fn test_subcommand_arguments() {
        let cli = Cli::try_parse_from(["amcdrive", "set-interface", "3", "1500"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Drive(DriveCommand::SetInterface { n: 3, value: 1500 })
        );

        let cli = Cli::try_parse_from(["amcdrive", "enable-bridge", "--off"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Drive(DriveCommand::EnableBridge { off: true })
        );

        let cli = Cli::try_parse_from(["amcdrive", "ports"]).unwrap();
        assert_eq!(cli.command, Commands::Ports);

        assert!(Cli::try_parse_from(["amcdrive", "get-interface", "x"]).is_err());
    }
}

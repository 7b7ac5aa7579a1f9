//! Command line parsing and the validated runtime configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::{ArgAction, Parser};

use crate::error::ConfigError;
use crate::sniff::CaptureConfig;

#[derive(Parser, Debug)]
#[command(name = "arpwatch")]
#[command(version, about = "Passive ARP monitor with gratuitous ARP detection", long_about = None)]
pub struct Cli {
    /// Comma separated list of interfaces to watch
    #[arg(short = 'i', long = "ifs", value_delimiter = ',', required = true)]
    pub interfaces: Vec<String>,

    /// Port for the HTTP reporting endpoint (disabled when absent)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address the reporting endpoint binds to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Capture without promiscuous mode
    #[arg(long)]
    pub no_promisc: bool,

    /// Maximum bytes captured per frame
    #[arg(long, default_value_t = 65536)]
    pub snaplen: i32,

    /// Capture read timeout in milliseconds
    #[arg(long, default_value_t = 500)]
    pub read_timeout_ms: i32,

    /// BPF filter applied to every capture (empty to disable)
    #[arg(long, default_value = "arp")]
    pub filter: String,

    /// Verbose output (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Requested interface names, trimmed and deduplicated, in request order.
    pub interfaces: Vec<String>,
    pub report_addr: Option<SocketAddr>,
    pub promiscuous: bool,
    pub capture: CaptureConfig,
}

/// Default `tracing` directive for a `-v` count.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let mut interfaces: Vec<String> = Vec::new();
        for name in cli.interfaces.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if !interfaces.iter().any(|known| known == name) {
                interfaces.push(name.to_string());
            }
        }
        if interfaces.is_empty() {
            return Err(ConfigError::NoInterfacesRequested);
        }

        if cli.snaplen <= 0 {
            return Err(ConfigError::InvalidSnaplen(cli.snaplen));
        }
        // libpcap reads 0 as no timeout at all.
        if cli.read_timeout_ms <= 0 {
            return Err(ConfigError::InvalidReadTimeout(cli.read_timeout_ms));
        }

        let filter = cli.filter.trim();
        Ok(Config {
            interfaces,
            report_addr: cli.port.map(|port| SocketAddr::new(cli.bind, port)),
            promiscuous: !cli.no_promisc,
            capture: CaptureConfig {
                snaplen: cli.snaplen,
                timeout_ms: cli.read_timeout_ms,
                immediate_mode: true,
                filter: (!filter.is_empty()).then(|| filter.to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(args: &[&str]) -> Result<Config, ConfigError> {
        let cli = Cli::try_parse_from(std::iter::once("arpwatch").chain(args.iter().copied()))
            .expect("valid arguments");
        Config::try_from(cli)
    }

    #[test]
    fn splits_trims_and_dedups_interfaces() {
        let config = config(&["--ifs", "eth0, eth1,,eth0"]).unwrap();
        assert_eq!(config.interfaces, vec!["eth0", "eth1"]);
        assert_eq!(config.report_addr, None);
        assert!(config.promiscuous);
        assert_eq!(config.capture, CaptureConfig::default());
    }

    #[test]
    fn empty_interface_list_is_rejected() {
        assert!(matches!(
            config(&["--ifs", ""]),
            Err(ConfigError::NoInterfacesRequested)
        ));
        assert!(matches!(
            config(&["-i", " , "]),
            Err(ConfigError::NoInterfacesRequested)
        ));
    }

    #[test]
    fn interfaces_flag_is_required() {
        assert!(Cli::try_parse_from(["arpwatch", "--port", "8001"]).is_err());
    }

    #[test]
    fn port_enables_reporting_on_bind_address() {
        let config = config(&["-i", "eth0", "-p", "8001", "--bind", "0.0.0.0"]).unwrap();
        assert_eq!(config.report_addr, Some("0.0.0.0:8001".parse().unwrap()));
    }

    #[test]
    fn capture_options() {
        let config = config(&[
            "-i",
            "eth0",
            "--no-promisc",
            "--snaplen",
            "128",
            "--filter",
            "",
            "--read-timeout-ms",
            "50",
        ])
        .unwrap();
        assert!(!config.promiscuous);
        assert_eq!(config.capture.snaplen, 128);
        assert_eq!(config.capture.timeout_ms, 50);
        assert_eq!(config.capture.filter, None);
    }

    #[test]
    fn non_positive_read_timeout_is_rejected() {
        assert!(matches!(
            config(&["-i", "eth0", "--read-timeout-ms", "0"]),
            Err(ConfigError::InvalidReadTimeout(0))
        ));
    }

    #[test]
    fn non_positive_snaplen_is_rejected() {
        assert!(matches!(
            config(&["-i", "eth0", "--snaplen", "0"]),
            Err(ConfigError::InvalidSnaplen(0))
        ));
    }

    #[test]
    fn verbosity_maps_to_log_level() {
        assert_eq!(log_level(0), "info");
        assert_eq!(log_level(1), "debug");
        assert_eq!(log_level(2), "trace");
        assert_eq!(log_level(7), "trace");
    }
}

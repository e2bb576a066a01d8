use crate::cli::{Args, Protocol};
use crate::error::CaptureError;
use std::path::PathBuf;

/// Fallback values applied when a flag is not given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub interface: String,
    pub packet_count: u64,
    pub snapshot_length: u32,
    pub tool: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            interface: "any".to_string(),
            packet_count: 100,
            snapshot_length: 262_144,
            tool: "tcpdump".to_string(),
        }
    }
}

/// Validated options for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub interface: String,
    pub ports: Vec<u16>,
    pub host: Option<String>,
    pub protocol: Option<Protocol>,
    pub custom_filter: Option<String>,
    /// 0 means unlimited.
    pub packet_count: u64,
    pub snapshot_length: u32,
    pub verbose: bool,
    pub resolve_names: bool,
    pub output_file: Option<PathBuf>,
    pub read_file: Option<PathBuf>,
    pub list_interfaces: bool,
    pub tool: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    Read(PathBuf),
    LiveCapture,
}

impl CaptureConfig {
    pub fn from_args(args: Args, defaults: &Defaults) -> Result<Self, CaptureError> {
        let ports = match args.ports.as_deref() {
            Some(list) => parse_ports(list)?,
            None => Vec::new(),
        };

        let interface = args.interface.unwrap_or_else(|| defaults.interface.clone());
        if interface.trim().is_empty() {
            return Err(CaptureError::Argument("interface name must not be empty".to_string()));
        }

        Ok(Self {
            interface,
            ports,
            host: args.host.filter(|h| !h.is_empty()),
            protocol: args.protocol,
            custom_filter: args.filter.filter(|f| !f.is_empty()),
            packet_count: args.count.unwrap_or(defaults.packet_count),
            snapshot_length: args.snaplen.unwrap_or(defaults.snapshot_length),
            verbose: args.verbose,
            resolve_names: !args.no_dns,
            output_file: args.write,
            read_file: args.read,
            list_interfaces: args.list,
            tool: args.tool.unwrap_or_else(|| defaults.tool.clone()),
        })
    }

    /// `--list` wins over `--read`; neither means live capture.
    pub fn mode(&self) -> Mode {
        if self.list_interfaces {
            Mode::List
        } else if let Some(path) = &self.read_file {
            Mode::Read(path.clone())
        } else {
            Mode::LiveCapture
        }
    }
}

/// Parses `80,443` style port lists, keeping the given order.
pub fn parse_ports(list: &str) -> Result<Vec<u16>, CaptureError> {
    list.split(',')
        .map(str::trim)
        .map(|item| match item.parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(CaptureError::Argument(format!("invalid port '{item}' in '{list}'"))),
        })
        .collect()
}

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "netcap", version, about = "Local packet capture helper built on tcpdump")]
pub struct Args {
    // 留空时由 Defaults 决定。
    #[arg(short, long, value_name = "NAME")]
    pub interface: Option<String>,

    /// Comma-separated port list, e.g. 80,443
    #[arg(short, long = "port", value_name = "LIST")]
    pub ports: Option<String>,

    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    #[arg(short = 'P', long, value_enum, value_name = "NAME")]
    pub protocol: Option<Protocol>,

    /// Packet limit, 0 = unlimited
    #[arg(short, long, value_name = "N")]
    pub count: Option<u64>,

    #[arg(short, long = "write", value_name = "PATH")]
    pub write: Option<PathBuf>,

    #[arg(short, long = "read", value_name = "PATH")]
    pub read: Option<PathBuf>,

    /// Raw filter expression; overrides --port, --host and --protocol
    #[arg(short, long, value_name = "EXPR", allow_hyphen_values = true)]
    pub filter: Option<String>,

    #[arg(short, long)]
    pub verbose: bool,

    /// Bytes captured per packet
    #[arg(short, long = "snaplen", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub snaplen: Option<u32>,

    #[arg(short = 'n', long = "no-dns")]
    pub no_dns: bool,

    /// List capture interfaces and exit
    #[arg(short, long = "list")]
    pub list: bool,

    // 便于在非标准路径下使用 tcpdump。
    #[arg(long, env = "NETCAP_TCPDUMP", value_name = "PATH")]
    pub tool: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Arp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Arp => "arp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There is a single command: probe the onion links on one page. Proxy
// settings and the timeout can also come from environment variables, so a
// Tor setup only has to be described once:
//
//   ONION_PROBE_PROXY_ADDR, ONION_PROBE_PROXY_PORT,
//   ONION_PROBE_TIMEOUT, ONION_PROBE_CONCURRENCY
// =============================================================================

use clap::{Parser, ValueEnum};
use onion_probe::session::DEFAULT_CONCURRENCY;
use onion_probe::ProbeMethod;

#[derive(Parser, Debug)]
#[command(
    name = "onion-probe",
    version,
    about = "Find the .onion links on a page and check which ones are alive",
    long_about = "onion-probe fetches a page through a SOCKS5 proxy (normally Tor), \
                  extracts every link to a .onion address and probes each one concurrently. \
                  A link is reachable when it answers with a status below 400."
)]
pub struct Cli {
    /// Page to extract links from (e.g., http://example.onion/)
    pub seed: String,

    /// Address of the SOCKS5 proxy
    #[arg(long, env = "ONION_PROBE_PROXY_ADDR", default_value = "127.0.0.1")]
    pub proxy_addr: String,

    /// Port of the SOCKS5 proxy
    #[arg(long, env = "ONION_PROBE_PROXY_PORT", default_value = "9050")]
    pub proxy_port: String,

    /// Timeout for every single request, in seconds
    #[arg(long, env = "ONION_PROBE_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Maximum number of links probed at the same time
    #[arg(long, env = "ONION_PROBE_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Request used to probe each link
    #[arg(long, value_enum, default_value_t = MethodArg::Head)]
    pub method: MethodArg,

    /// Also accept links under this suffix (repeatable, e.g. -e com -e org)
    #[arg(short = 'e', long = "extension")]
    pub extensions: Vec<String>,

    /// Connect directly instead of through the proxy
    #[arg(long)]
    pub direct: bool,

    /// User agent to send (default: a random browser one)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Output one JSON document instead of lines
    #[arg(long)]
    pub json: bool,

    /// Don't color unreachable links
    #[arg(long)]
    pub no_color: bool,

    /// Log debug details to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodArg {
    /// HEAD, falling back to GET when the server refuses HEAD
    Head,
    /// Always GET
    Get,
}

impl From<MethodArg> for ProbeMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Head => ProbeMethod::Head,
            MethodArg::Get => ProbeMethod::Get,
        }
    }
}

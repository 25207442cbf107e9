// src/lib.rs
// =============================================================================
// onion-probe as a library.
//
// Given a seed page reachable only through a SOCKS5 proxy (normally Tor),
// fetch it, pull out every link to a .onion address, and probe each one
// concurrently for reachability.
//
// Quick start:
//
//   let cancel = CancellationToken::new();
//   let summary = onion_probe::get_links("http://seed.onion/", "127.0.0.1", 9050, 10, cancel).await?;
//
// For programmatic use, `session::discover` returns the candidate links and
// a `ProbeStream` of typed outcomes instead of printing anything.
// =============================================================================

pub mod checker;
pub mod error;
pub mod report;
pub mod session;
pub mod transport;

pub use checker::{is_valid_onion_link, LinkFilter, ProbeFailure, ProbeMethod, ProbeOutcome};
pub use error::{ProbeError, Result};
pub use report::{LineStyle, OutputFormat, Reporter, Summary};
pub use session::{discover, get_links, run, Discovery, Phase, ProbeConfig, ProbeRequest, ProbeStream};
pub use transport::{build_client, ProxyEndpoint, TransportConfig};

// src/session/mod.rs
// =============================================================================
// One probe session: seed page in, per-link reachability out.
//
// Phases, in order:
//
//   Idle -> Fetching -> Extracting -> Probing -> Draining -> Done | Cancelled
//
// Fetching and Extracting are sequential (fetch.rs). Probing fans out one
// task per valid candidate (dispatch.rs). Draining is the caller consuming
// the ProbeStream, see report.rs.
//
// Each session builds its own client, semaphore and barrier, so several
// sessions can run side by side in one process.
// =============================================================================

mod dispatch;
mod fetch;

pub use dispatch::{spawn_probes, ProbeConfig, ProbeStream, DEFAULT_CONCURRENCY};
pub use fetch::fetch_links;

use crate::checker::LinkFilter;
use crate::error::{ProbeError, Result};
use crate::report::{drain, LineStyle, OutputFormat, Reporter, Summary};
use crate::transport::{build_client, TransportConfig};
use serde::Serialize;
use std::fmt::{self, Display};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching,
    Extracting,
    Probing,
    Draining,
    Done,
    Cancelled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Fetching => "fetching",
            Phase::Extracting => "extracting",
            Phase::Probing => "probing",
            Phase::Draining => "draining",
            Phase::Done => "done",
            Phase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Everything one session needs, created once per run
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// The page whose links are probed
    pub seed: String,
    pub transport: TransportConfig,
    pub filter: LinkFilter,
    pub probe: ProbeConfig,
}

impl ProbeRequest {
    /// A request through the SOCKS5 proxy at `proxy_address:proxy_port`
    pub fn new(
        seed: impl Into<String>,
        proxy_address: impl Into<String>,
        proxy_port: impl Display,
        timeout_secs: u64,
    ) -> Self {
        Self {
            seed: seed.into(),
            transport: TransportConfig::socks5(proxy_address, proxy_port, timeout_secs),
            filter: LinkFilter::onion(),
            probe: ProbeConfig::default(),
        }
    }
}

/// The seed's candidate links, and the probes running on them
pub struct Discovery {
    /// Every candidate that passed the filter, before the URL check
    pub links: Vec<String>,
    pub outcomes: ProbeStream,
}

impl Discovery {
    /// Candidates found on the seed page
    pub fn found(&self) -> usize {
        self.links.len()
    }
}

// Runs Fetching -> Extracting and starts Probing
//
// Errors are the fatal ones: bad proxy configuration, bad seed address,
// seed page unreachable. The returned stream is already running.
pub async fn discover(request: &ProbeRequest, cancel: CancellationToken) -> Result<Discovery> {
    let client = build_client(&request.transport)?;

    let seed = Url::parse(&request.seed).map_err(|source| ProbeError::InvalidSeed {
        address: request.seed.clone(),
        source,
    })?;

    debug!(phase = %Phase::Fetching, url = %seed);
    let links = fetch_links(&client, &seed, &request.filter).await?;
    info!(url = %seed, found = links.len(), "candidate links extracted");

    debug!(phase = %Phase::Probing, candidates = links.len());
    let outcomes = spawn_probes(client, links.clone(), &request.probe, cancel);

    Ok(Discovery { links, outcomes })
}

// Runs a whole session and renders it through `reporter`
//
// When nothing was found, only the count line is written and no probe is
// started.
pub async fn run<W: std::io::Write>(
    request: &ProbeRequest,
    cancel: CancellationToken,
    reporter: &mut Reporter<W>,
) -> Result<Summary> {
    let discovery = discover(request, cancel.clone()).await?;
    reporter.found(discovery.found())?;

    if discovery.links.is_empty() {
        let summary = Summary::empty();
        reporter.finish(&summary)?;
        return Ok(summary);
    }

    debug!(phase = %Phase::Draining);
    let summary = drain(discovery, &cancel, reporter).await?;
    debug!(phase = %summary.phase, dispatched = summary.dispatched);
    Ok(summary)
}

/// Probes every onion link on `seed_address` and prints one line per link
///
/// Lines go to stdout in the classic format:
///
/// ```text
/// Number of URLs found: <N>
/// _____________________________
/// <link> is reachable.
/// <link> is not reachable.
/// ```
///
/// Cancelling `cancel` stops dispatch and consumption; the returned summary
/// then ends in `Phase::Cancelled`. Signal handling is left to the caller,
/// e.g. a task that cancels the token on `tokio::signal::ctrl_c()`.
pub async fn get_links(
    seed_address: &str,
    proxy_address: &str,
    proxy_port: impl Display,
    timeout_secs: u64,
    cancel: CancellationToken,
) -> Result<Summary> {
    let request = ProbeRequest::new(seed_address, proxy_address, proxy_port, timeout_secs);
    let mut reporter = Reporter::new(std::io::stdout(), OutputFormat::Lines(LineStyle::plain()));
    run(&request, cancel, &mut reporter).await
}

// src/transport.rs
// =============================================================================
// Builds the HTTP client every request of a session goes through.
//
// The client is routed through a SOCKS5 proxy (normally the local Tor
// daemon on 127.0.0.1:9050) and carries one overall timeout per request.
// It is built once and then shared read-only by the fetcher and every probe
// task; reqwest::Client is a reference-counted handle, so cloning it is cheap
// and needs no locking.
// =============================================================================

use crate::error::{ProbeError, Result};
use rand::seq::SliceRandom;
use reqwest::{redirect, Client, Proxy};
use std::fmt::Display;
use std::net::Ipv6Addr;
use std::time::Duration;
use url::Url;

/// Redirect hops followed before a probe counts as unreachable
pub const MAX_REDIRECTS: usize = 10;

// Browser user agents, one is picked per session.
// Tor Browser reports itself as Firefox ESR, so most of these are Firefox.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; rv:115.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:115.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

/// Where the SOCKS5 proxy listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub address: String,
    /// Kept as text, it is validated when the proxy URL is built
    pub port: String,
}

impl ProxyEndpoint {
    pub fn new(address: impl Into<String>, port: impl Display) -> Self {
        Self {
            address: address.into(),
            port: port.to_string(),
        }
    }

    // socks5h (not socks5) so hostnames are resolved by the proxy.
    // .onion names only exist inside Tor, a local resolver can't find them.
    pub fn proxy_url(&self) -> Result<Url> {
        // A bare IPv6 literal needs brackets to be a URL host
        let host = match self.address.parse::<Ipv6Addr>() {
            Ok(ip) => format!("[{ip}]"),
            Err(_) => self.address.clone(),
        };
        let endpoint = format!("socks5h://{}:{}", host, self.port);
        let url = Url::parse(&endpoint).map_err(|e| ProbeError::InvalidProxy {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        // Url::parse accepts "socks5h://host:" and "socks5h://:9050" in
        // some forms, so check host and port explicitly
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ProbeError::InvalidProxy {
                endpoint,
                reason: "missing host".to_string(),
            });
        }
        if url.port().is_none() {
            return Err(ProbeError::InvalidProxy {
                endpoint,
                reason: "missing port".to_string(),
            });
        }

        Ok(url)
    }
}

/// Everything needed to build the session's client
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// None = connect directly, without a proxy
    pub proxy: Option<ProxyEndpoint>,
    /// Overall deadline of a single request (connect + headers + body).
    /// None = wait as long as it takes
    pub timeout: Option<Duration>,
    /// None = pick one of USER_AGENTS at random
    pub user_agent: Option<String>,
}

// 0 seconds means no deadline at all
fn request_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl TransportConfig {
    pub fn socks5(address: impl Into<String>, port: impl Display, timeout_secs: u64) -> Self {
        Self {
            proxy: Some(ProxyEndpoint::new(address, port)),
            timeout: request_timeout(timeout_secs),
            user_agent: None,
        }
    }

    pub fn direct(timeout_secs: u64) -> Self {
        Self {
            proxy: None,
            timeout: request_timeout(timeout_secs),
            user_agent: None,
        }
    }
}

/// Returns a random browser user agent
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

// Builds the shared client
//
// Fails with InvalidProxy when the endpoint can't be parsed. That is a
// configuration error: the caller should abort, not retry.
pub fn build_client(config: &TransportConfig) -> Result<Client> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_string());

    let mut builder = Client::builder()
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(user_agent);
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(endpoint) = &config.proxy {
        let proxy_url = endpoint.proxy_url()?;
        let proxy = Proxy::all(proxy_url.as_str()).map_err(|e| ProbeError::InvalidProxy {
            endpoint: proxy_url.to_string(),
            reason: e.to_string(),
        })?;
        builder = builder.proxy(proxy);
    } else {
        // Ignore HTTP(S)_PROXY from the environment as well
        builder = builder.no_proxy();
    }

    builder.build().map_err(ProbeError::ClientBuild)
}

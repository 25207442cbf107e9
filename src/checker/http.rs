// src/checker/http.rs
// =============================================================================
// This module checks if one link is alive by making an HTTP request.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Falls back to GET when the server says HEAD is not supported
// - Classifies the result: reachable means "answered with a status < 400"
// - Records why a link was not reachable (timeout, connect failure, ...)
//
// A failed probe is never an error of the whole run. Whatever happens, the
// caller gets back exactly one ProbeOutcome.
// =============================================================================

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Which request a probe sends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// HEAD, retried as GET on 405/501
    #[default]
    Head,
    /// GET only
    Get,
}

/// Why a link was classified as not reachable
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeFailure {
    /// The server answered with a status >= 400
    #[error("HTTP {code}")]
    Status { code: u16 },
    /// The request hit the transport timeout
    #[error("request timed out")]
    Timeout,
    /// Connecting (to the proxy, or through it) failed
    #[error("connection failed: {message}")]
    Connect { message: String },
    /// Too many redirects
    #[error("too many redirects")]
    Redirect,
    /// Any other transport failure
    #[error("{message}")]
    Request { message: String },
}

/// The result of probing a single link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// The link exactly as it appeared in the page
    pub link: String,
    pub reachable: bool,
    /// Final status code, when the server answered at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Set whenever `reachable` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<ProbeFailure>,
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }
}

// The only rule for reachability: any status strictly below 400.
// 3xx counts, 400 itself does not.
pub fn is_reachable_status(status: StatusCode) -> bool {
    status.as_u16() < 400
}

// Probes one link
//
// Parameters:
//   client: the shared session client (already bound to the proxy)
//   link: the candidate as extracted, reported back unchanged
//   url: the same candidate, already parsed as an absolute URL
//   method: HEAD (with GET fallback) or GET
pub async fn probe_link(client: &Client, link: String, url: Url, method: ProbeMethod) -> ProbeOutcome {
    match send(client, url, method).await {
        Ok(response) => analyze_response(link, response.status()),
        Err(e) => categorize_error(link, e),
    }
}

async fn send(client: &Client, url: Url, method: ProbeMethod) -> Result<Response, reqwest::Error> {
    if method == ProbeMethod::Get {
        return client.get(url).send().await;
    }

    let response = client.head(url.clone()).send().await?;
    if matches!(
        response.status(),
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
    ) {
        debug!(%url, status = %response.status(), "HEAD not supported, retrying with GET");
        // Only the status line matters, the body is dropped unread
        return client.get(url).send().await;
    }
    Ok(response)
}

fn analyze_response(link: String, status: StatusCode) -> ProbeOutcome {
    let code = status.as_u16();
    if is_reachable_status(status) {
        ProbeOutcome {
            link,
            reachable: true,
            status: Some(code),
            cause: None,
        }
    } else {
        ProbeOutcome {
            link,
            reachable: false,
            status: Some(code),
            cause: Some(ProbeFailure::Status { code }),
        }
    }
}

// Sorts reqwest errors into the failure kinds we report
fn categorize_error(link: String, error: reqwest::Error) -> ProbeOutcome {
    let cause = if error.is_timeout() {
        ProbeFailure::Timeout
    } else if error.is_redirect() {
        ProbeFailure::Redirect
    } else if error.is_connect() {
        ProbeFailure::Connect {
            message: error_chain(&error),
        }
    } else {
        ProbeFailure::Request {
            message: error_chain(&error),
        }
    };

    ProbeOutcome {
        link,
        reachable: false,
        status: error.status().map(|s| s.as_u16()),
        cause: Some(cause),
    }
}

// reqwest's Display only shows the outermost layer ("error sending
// request"), the useful part (e.g. the SOCKS reply) is further down
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        Client::builder()
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()
            .unwrap()
    }

    async fn probe(server: &MockServer, route: &str, method: ProbeMethod) -> ProbeOutcome {
        let link = format!("{}{}", server.uri(), route);
        let url = Url::parse(&link).unwrap();
        probe_link(&client(), link, url, method).await
    }

    #[tokio::test]
    async fn test_status_boundary_at_400() {
        let server = MockServer::start().await;
        for code in [200u16, 399, 400, 401, 500] {
            Mock::given(path(format!("/{code}")))
                .respond_with(ResponseTemplate::new(code))
                .mount(&server)
                .await;
        }

        for (code, expected) in [(200, true), (399, true), (400, false), (401, false), (500, false)] {
            let outcome = probe(&server, &format!("/{code}"), ProbeMethod::Head).await;
            assert_eq!(outcome.reachable, expected, "HTTP {code}");
            assert_eq!(outcome.status, Some(code));
            if expected {
                assert_eq!(outcome.cause, None);
            } else {
                assert_eq!(outcome.cause, Some(ProbeFailure::Status { code }));
            }
        }
    }

    #[tokio::test]
    async fn test_head_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/no-head"))
            .respond_with(ResponseTemplate::new(405))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/no-head"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = probe(&server, "/no-head", ProbeMethod::Head).await;
        assert!(outcome.is_reachable());
        assert_eq!(outcome.status, Some(200));
    }

    #[tokio::test]
    async fn test_get_method_skips_head() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = probe(&server, "/page", ProbeMethod::Get).await;
        assert!(outcome.is_reachable());
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .no_proxy()
            .build()
            .unwrap();
        let link = format!("{}/slow", server.uri());
        let outcome = probe_link(&client, link.clone(), Url::parse(&link).unwrap(), ProbeMethod::Head).await;

        assert!(!outcome.reachable);
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.cause, Some(ProbeFailure::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind and drop a listener to get a port nobody listens on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let link = format!("http://{addr}/gone");
        let outcome = probe_link(&client(), link.clone(), Url::parse(&link).unwrap(), ProbeMethod::Head).await;

        assert!(!outcome.reachable);
        assert!(matches!(outcome.cause, Some(ProbeFailure::Connect { .. })));
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = ProbeOutcome {
            link: "http://abc.onion/".to_string(),
            reachable: false,
            status: Some(404),
            cause: Some(ProbeFailure::Status { code: 404 }),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["link"], "http://abc.onion/");
        assert_eq!(json["reachable"], false);
        assert_eq!(json["cause"]["kind"], "status");
        assert_eq!(json["cause"]["code"], 404);
    }
}

// src/session/fetch.rs
// =============================================================================
// Fetches the seed page and extracts its candidate links.
//
// How it works:
// 1. One GET through the session client
// 2. The body is read as a stream of chunks (never buffered whole)
// 3. Chunks go through a small bounded channel to a blocking worker thread
// 4. The worker feeds them to the LinkExtractor and returns the links
//
// The tokenizer is not Send, so it lives on its own thread instead of
// inside this future. The channel bound gives us backpressure: if the
// tokenizer falls behind, we stop reading from the network.
//
// Any transport error here is fatal for the session. There is no retry.
// =============================================================================

use crate::checker::{LinkExtractor, LinkFilter};
use crate::error::{ProbeError, Result};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

// Chunks in flight between the network and the tokenizer
const CHUNK_BUFFER: usize = 8;

// Fetches `seed` and returns every candidate link in document order
pub async fn fetch_links(client: &Client, seed: &Url, filter: &LinkFilter) -> Result<Vec<String>> {
    let response = client
        .get(seed.clone())
        .send()
        .await
        .map_err(|source| ProbeError::Fetch {
            url: seed.to_string(),
            source,
        })?;

    // Error pages can still link somewhere, so keep going
    if !response.status().is_success() {
        warn!(url = %seed, status = %response.status(), "seed page returned a non-success status");
    }
    debug!(url = %seed, status = %response.status(), "seed page headers received");

    let (tx, mut rx) = mpsc::channel::<Bytes>(CHUNK_BUFFER);
    let filter = filter.clone();
    let extractor = tokio::task::spawn_blocking(move || {
        let mut extractor = LinkExtractor::new(filter);
        while let Some(chunk) = rx.blocking_recv() {
            extractor.feed(&chunk);
        }
        extractor.finish()
    });

    let mut body = response.bytes_stream();
    let mut read_error = None;
    let mut received = 0usize;
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                received += bytes.len();
                if tx.send(bytes).await.is_err() {
                    // The worker is gone, its JoinError is reported below
                    break;
                }
            }
            Err(source) => {
                read_error = Some(source);
                break;
            }
        }
    }
    // Closing the channel lets the worker finish
    drop(tx);

    let links = extractor.await?;
    if let Some(source) = read_error {
        return Err(ProbeError::Fetch {
            url: seed.to_string(),
            source,
        });
    }

    debug!(url = %seed, bytes = received, links = links.len(), "seed page tokenized");
    Ok(links)
}

// src/checker/mod.rs
// =============================================================================
// This module contains the per-link logic.
//
// Submodules:
// - onion: decides whether a string is an onion link
// - html: pulls candidate links out of HTML, chunk by chunk
// - http: probes one link and classifies the answer
//
// Nothing in here spawns tasks; fan-out lives in session/dispatch.rs.
// =============================================================================

mod html;
mod http;
mod onion;

pub use html::LinkExtractor;
pub use http::{is_reachable_status, probe_link, ProbeFailure, ProbeMethod, ProbeOutcome};
pub use onion::{is_valid_onion_link, LinkFilter, ONION_SUFFIX};

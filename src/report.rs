// src/report.rs
// =============================================================================
// Consumes probe outcomes and renders them for humans or machines.
//
// Line format (kept byte-for-byte compatible with the original tool):
//
//   Number of URLs found: <N>
//   _____________________________
//   <link> is reachable.
//   <link> is not reachable.
//
// <N> counts every extracted candidate, including those later dropped
// because they are not absolute URLs. Lines appear in completion order,
// not page order.
//
// Coloring the failure lines is a rendering choice made by the caller
// (LineStyle); the library never decides it on its own.
// =============================================================================

use crate::checker::ProbeOutcome;
use crate::error::Result;
use crate::session::{Discovery, Phase};
use crossterm::style::Stylize;
use serde::Serialize;
use std::io::{self, Write};
use tokio_util::sync::CancellationToken;

/// Printed between the count line and the first outcome
pub const SEPARATOR: &str = "_____________________________";

/// How outcome lines look
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStyle {
    /// Paint "is not reachable." lines red
    pub color: bool,
}

impl LineStyle {
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn colored() -> Self {
        Self { color: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per outcome, as they complete
    Lines(LineStyle),
    /// A single JSON document once everything is drained
    Json,
}

/// Totals of one session, plus every outcome in completion order
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub found: usize,
    pub dispatched: usize,
    pub reachable: usize,
    pub unreachable: usize,
    /// Done or Cancelled
    pub phase: Phase,
    pub outcomes: Vec<ProbeOutcome>,
}

impl Summary {
    fn new(found: usize) -> Self {
        Self {
            found,
            dispatched: 0,
            reachable: 0,
            unreachable: 0,
            phase: Phase::Draining,
            outcomes: Vec::new(),
        }
    }

    /// A session whose seed page had no candidates
    pub fn empty() -> Self {
        Self {
            phase: Phase::Done,
            ..Self::new(0)
        }
    }

    fn record(&mut self, outcome: ProbeOutcome) {
        if outcome.reachable {
            self.reachable += 1;
        } else {
            self.unreachable += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase == Phase::Cancelled
    }
}

// Formats one outcome line (without the trailing newline)
pub fn format_outcome(outcome: &ProbeOutcome, style: LineStyle) -> String {
    if outcome.reachable {
        format!("{} is reachable.", outcome.link)
    } else {
        let line = format!("{} is not reachable.", outcome.link);
        if style.color {
            line.red().to_string()
        } else {
            line
        }
    }
}

/// Writes a session's report to any `Write`
pub struct Reporter<W> {
    out: W,
    format: OutputFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    /// The count line; the separator follows only when there is something to probe
    pub fn found(&mut self, count: usize) -> io::Result<()> {
        if let OutputFormat::Lines(_) = self.format {
            writeln!(self.out, "Number of URLs found: {count}")?;
            if count > 0 {
                writeln!(self.out, "{SEPARATOR}")?;
            }
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn outcome(&mut self, outcome: &ProbeOutcome) -> io::Result<()> {
        if let OutputFormat::Lines(style) = self.format {
            writeln!(self.out, "{}", format_outcome(outcome, style))?;
            // Lines should show up as probes complete, not at exit
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn finish(&mut self, summary: &Summary) -> io::Result<()> {
        if self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.out, summary)?;
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Drains a discovery's outcome stream into `reporter`
//
// Cancellation is checked before every outcome is taken. Once it fires,
// the stream is dropped, which aborts whatever is still in flight, and the
// summary comes back with phase Cancelled.
pub async fn drain<W: Write>(
    discovery: Discovery,
    cancel: &CancellationToken,
    reporter: &mut Reporter<W>,
) -> Result<Summary> {
    let Discovery { links, mut outcomes } = discovery;
    let mut summary = Summary::new(links.len());

    loop {
        if cancel.is_cancelled() {
            summary.phase = Phase::Cancelled;
            break;
        }

        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                summary.phase = Phase::Cancelled;
                break;
            }
            next = outcomes.next_outcome() => next,
        };

        match next {
            Some(outcome) => {
                reporter.outcome(&outcome)?;
                summary.record(outcome);
            }
            None => {
                summary.phase = Phase::Done;
                break;
            }
        }
    }

    summary.dispatched = outcomes.dispatched();
    drop(outcomes);

    reporter.finish(&summary)?;
    Ok(summary)
}

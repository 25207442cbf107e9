// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and the Ctrl-C handler
// 3. Run one probe session and print its report
// 4. Exit with proper code:
//      0   = every probed link is reachable
//      1   = at least one link is not reachable
//      2   = fatal error (bad proxy, seed page unreachable, ...)
//      130 = interrupted with Ctrl-C
// =============================================================================

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use onion_probe::{
    run, LineStyle, LinkFilter, OutputFormat, ProbeConfig, ProbeRequest, Reporter, TransportConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const EXIT_OK: i32 = 0;
const EXIT_UNREACHABLE: i32 = 1;
const EXIT_ERROR: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    // Ctrl-C flips the token; dispatch and draining both watch it
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping");
                cancel.cancel();
            }
        });
    }

    let exit_code = tokio::select! {
        // Fetching can't be interrupted from inside the session, so
        // also race the whole run against the token
        _ = cancel.cancelled() => EXIT_INTERRUPTED,
        result = run_cli(cli, cancel.clone()) => match result {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                EXIT_ERROR
            }
        },
    };

    // Leaves any probe still in flight behind
    std::process::exit(exit_code);
}

async fn run_cli(cli: Cli, cancel: CancellationToken) -> Result<i32> {
    let request = build_request(&cli)?;
    debug!(?request, "starting session");

    let format = if cli.json {
        OutputFormat::Json
    } else if cli.no_color {
        OutputFormat::Lines(LineStyle::plain())
    } else {
        OutputFormat::Lines(LineStyle::colored())
    };
    let mut reporter = Reporter::new(std::io::stdout(), format);

    let summary = run(&request, cancel, &mut reporter)
        .await
        .with_context(|| format!("probing links on {}", cli.seed))?;

    info!(
        found = summary.found,
        dispatched = summary.dispatched,
        reachable = summary.reachable,
        unreachable = summary.unreachable,
        "session finished"
    );

    if summary.is_cancelled() {
        Ok(EXIT_INTERRUPTED)
    } else if summary.unreachable > 0 {
        Ok(EXIT_UNREACHABLE)
    } else {
        Ok(EXIT_OK)
    }
}

fn build_request(cli: &Cli) -> Result<ProbeRequest> {
    let mut transport = if cli.direct {
        TransportConfig::direct(cli.timeout)
    } else {
        TransportConfig::socks5(cli.proxy_addr.clone(), &cli.proxy_port, cli.timeout)
    };
    transport.user_agent = cli.user_agent.clone();

    let filter = LinkFilter::with_suffixes(&cli.extensions).context("building the link filter")?;

    Ok(ProbeRequest {
        seed: cli.seed.clone(),
        transport,
        filter,
        probe: ProbeConfig {
            concurrency: cli.concurrency,
            method: cli.method.into(),
        },
    })
}

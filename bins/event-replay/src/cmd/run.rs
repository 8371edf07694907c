use tokio_util::sync::CancellationToken;

use publisher_tcp::TcpConnector;
use replay::{ReplayController, ReplaySummary, TerminationReason};

use super::config::Effective;

// ═══════════════════════════════════════════════════════════════
//  Main dispatch
// ═══════════════════════════════════════════════════════════════

pub async fn run(eff: Effective) -> ReplaySummary {
    let token = CancellationToken::new();

    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, draining");
            signal_token.cancel();
        }
    });

    let connector = TcpConnector::new(eff.publisher);
    ReplayController::new(eff.replay, eff.connection, connector)
        .run(token)
        .await
}

/// Print the outcome. Termination messages go to stdout when verbose;
/// an abort is always reported on stderr.
pub fn report(summary: &ReplaySummary, max_count: u64, verbose: bool) {
    match summary.reason {
        TerminationReason::Aborted => eprintln!("{}", termination_message(summary, max_count)),
        _ if verbose => println!("{}", termination_message(summary, max_count)),
        _ => {}
    }

    if verbose {
        if summary.skipped > 0 {
            println!("  skipped {} malformed lines", summary.skipped);
        }
        println!(
            "  {} sent in {:.1}s ({:.1} msg/s)",
            summary.published,
            summary.elapsed.as_secs_f64(),
            summary.rate()
        );
    }
}

pub fn termination_message(summary: &ReplaySummary, max_count: u64) -> String {
    match summary.reason {
        TerminationReason::MaxCountReached => {
            format!("Max number of {max_count} events processed, exiting.")
        }
        TerminationReason::SourceExhausted => {
            format!("Processed {} events. Reached end of file, exiting.", summary.published)
        }
        TerminationReason::Aborted => match &summary.error {
            Some(e) => format!("Aborted after {} events: {e}", summary.published),
            None => format!("Aborted after {} events", summary.published),
        },
    }
}

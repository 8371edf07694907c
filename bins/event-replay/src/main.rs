mod cmd;

use clap::Parser;
use cmd::config::{Effective, ReplayArgs};

#[derive(Parser)]
#[command(
    name = "event-replay",
    about = "Read events from a JSONL file and publish them to a streaming endpoint with a definable interval"
)]
struct Cli {
    #[command(flatten)]
    args: ReplayArgs,
}

/// Без `-v` только предупреждения и ошибки.
fn default_filter(verbose: bool) -> &'static str {
    if verbose { "info" } else { "warn" }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.args.verbose).into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let summary = cmd::run::run(eff).await;
    cmd::run::report(&summary, cli.args.count, cli.args.verbose);
    std::process::exit(summary.exit_code());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from(["event-replay", "events.jsonl", "-v", "-i", "250", "-c", "5"]).unwrap();
        assert_eq!(cli.args.event_file, std::path::PathBuf::from("events.jsonl"));
        assert!(cli.args.verbose);
        assert_eq!(cli.args.interval, Some(250));
        assert_eq!(cli.args.count, 5);
        assert!(!cli.args.skip_malformed);
    }

    #[test]
    fn defaults_without_flags() {
        let cli = Cli::try_parse_from(["event-replay", "events.jsonl"]).unwrap();
        assert!(!cli.args.verbose);
        assert_eq!(cli.args.interval, None);
        assert_eq!(cli.args.count, 1000);
    }

    #[test]
    fn log_filter_follows_verbose() {
        assert_eq!(default_filter(false), "warn");
        assert_eq!(default_filter(true), "info");
    }

    #[test]
    fn event_file_is_required() {
        assert!(Cli::try_parse_from(["event-replay"]).is_err());
    }

    #[test]
    fn rejects_non_numeric_interval() {
        assert!(Cli::try_parse_from(["event-replay", "e.jsonl", "--interval", "fast"]).is_err());
    }
}

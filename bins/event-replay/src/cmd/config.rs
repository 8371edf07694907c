use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use serde::Deserialize;

use publisher_tcp::{ConnectionString, TcpPublisherConfig};
use replay::{ConnectionInfo, DEFAULT_MAX_COUNT, MalformedPolicy, ReplayConfig, RetryPolicy};

use super::error::EventReplayError;

// ═══════════════════════════════════════════════════════════════
//  Settings file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub connection_string: Option<String>,
    pub stream: Option<String>,
    pub malformed: Option<MalformedPolicy>,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub publisher: TcpPublisherConfig,
}

#[derive(Debug, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    RetryPolicy::DEFAULT_MAX_ATTEMPTS
}
fn default_backoff_ms() -> u64 {
    RetryPolicy::DEFAULT_BACKOFF.as_millis() as u64
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

pub fn load_settings(path: &str) -> Result<Settings, EventReplayError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| EventReplayError::Config(format!("cannot read settings {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| EventReplayError::Config(format!("bad settings {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// File to read events from (one JSON document per line)
    pub event_file: PathBuf,

    /// Print progress and termination messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Interval between events in milliseconds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Maximal number of events to send
    #[arg(short, long, default_value_t = DEFAULT_MAX_COUNT)]
    pub count: u64,

    /// Path to the settings file
    #[arg(long, default_value = "event-replay.toml", env = "EVENT_REPLAY_CONFIG")]
    pub config: String,

    /// Skip lines that are not valid JSON instead of aborting
    #[arg(long)]
    pub skip_malformed: bool,

    /// Endpoint connection string (overrides the settings file)
    #[arg(long, env = "EVENT_REPLAY_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Target stream name (overrides the settings file)
    #[arg(long, env = "EVENT_REPLAY_STREAM")]
    pub stream: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Итоговая конфигурация после мержа: settings file < env/CLI
pub struct Effective {
    pub replay: ReplayConfig,
    pub connection: ConnectionInfo,
    pub publisher: TcpPublisherConfig,
}

impl Effective {
    pub fn new(args: &ReplayArgs) -> Result<Self, EventReplayError> {
        let settings = match load_settings(&args.config) {
            Ok(s) => s,
            Err(e) => {
                if Path::new(&args.config).exists() {
                    return Err(e);
                }
                Settings::default()
            }
        };

        let connection_string = required(
            args.connection_string.clone().or(settings.connection_string),
            "connection_string",
            "EVENT_REPLAY_CONNECTION_STRING",
            &args.config,
        )?;
        let stream = required(
            args.stream.clone().or(settings.stream),
            "stream",
            "EVENT_REPLAY_STREAM",
            &args.config,
        )?;

        // fail before any connection attempt
        ConnectionString::parse(&connection_string).map_err(|e| EventReplayError::Config(e.to_string()))?;

        let retry = RetryPolicy::new(
            settings.retry.max_attempts,
            Duration::from_millis(settings.retry.backoff_ms),
        )?;
        let malformed = if args.skip_malformed {
            MalformedPolicy::Skip
        } else {
            settings.malformed.unwrap_or_default()
        };

        let mut replay = ReplayConfig::new(&args.event_file)
            .with_max_count(args.count)
            .with_verbose(args.verbose)
            .with_malformed(malformed)
            .with_retry(retry);
        if let Some(ms) = args.interval {
            replay = replay.with_interval(Duration::from_millis(ms));
        }
        replay.validate()?;

        Ok(Self {
            replay,
            connection: ConnectionInfo::new(connection_string, stream),
            publisher: settings.publisher,
        })
    }
}

fn required(value: Option<String>, key: &str, env: &str, config: &str) -> Result<String, EventReplayError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EventReplayError::Config(format!("missing {key}: set it in {config} or via {env}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONN: &str = "Endpoint=tcp://127.0.0.1:5672;SharedAccessKeyName=send;SharedAccessKey=k";

    fn args(config: &str) -> ReplayArgs {
        ReplayArgs {
            event_file: PathBuf::from("events.jsonl"),
            verbose: false,
            interval: None,
            count: DEFAULT_MAX_COUNT,
            config: config.to_string(),
            skip_malformed: false,
            connection_string: None,
            stream: None,
        }
    }

    fn settings_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn settings_file_provides_connection() {
        let file = settings_file(&format!(
            "connection_string = \"{CONN}\"\nstream = \"events\"\n\n[retry]\nmax_attempts = 5\nbackoff_ms = 10\n\n[publisher]\nack_timeout_ms = 250\n"
        ));
        let eff = Effective::new(&args(file.path().to_str().unwrap())).unwrap();

        assert_eq!(eff.connection, ConnectionInfo::new(CONN, "events"));
        assert_eq!(eff.replay.retry, RetryPolicy::new(5, Duration::from_millis(10)).unwrap());
        assert_eq!(eff.publisher.ack_timeout_ms, 250);
        assert_eq!(eff.publisher.connect_timeout_ms, 10_000);
        assert_eq!(eff.replay.max_count, 1000);
        assert_eq!(eff.replay.interval, None);
    }

    #[test]
    fn args_override_settings_file() {
        let file = settings_file(&format!("connection_string = \"{CONN}\"\nstream = \"from-file\"\nmalformed = \"abort\"\n"));
        let mut a = args(file.path().to_str().unwrap());
        a.stream = Some("from-env".into());
        a.interval = Some(250);
        a.count = 7;
        a.verbose = true;
        a.skip_malformed = true;

        let eff = Effective::new(&a).unwrap();
        assert_eq!(eff.connection.stream, "from-env");
        assert_eq!(eff.replay.interval, Some(Duration::from_millis(250)));
        assert_eq!(eff.replay.max_count, 7);
        assert!(eff.replay.verbose);
        assert_eq!(eff.replay.malformed, MalformedPolicy::Skip);
    }

    #[test]
    fn missing_settings_file_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path().join("absent.toml").to_str().unwrap());
        a.connection_string = Some(CONN.into());
        a.stream = Some("events".into());

        assert!(Effective::new(&a).is_ok());
    }

    #[test]
    fn missing_stream_is_config_error() {
        let file = settings_file(&format!("connection_string = \"{CONN}\"\n"));
        let err = Effective::new(&args(file.path().to_str().unwrap())).err().unwrap();

        assert!(matches!(err, EventReplayError::Config(_)));
        assert!(err.to_string().contains("EVENT_REPLAY_STREAM"));
    }

    #[test]
    fn blank_connection_string_is_config_error() {
        let file = settings_file("connection_string = \"  \"\nstream = \"events\"\n");
        let err = Effective::new(&args(file.path().to_str().unwrap())).err().unwrap();

        assert!(err.to_string().contains("connection_string"));
    }

    #[test]
    fn unparsable_settings_file_is_config_error() {
        let file = settings_file("stream = [not toml");
        assert!(matches!(
            Effective::new(&args(file.path().to_str().unwrap())),
            Err(EventReplayError::Config(_))
        ));
    }

    #[test]
    fn invalid_connection_string_fails_preflight() {
        let file = settings_file("connection_string = \"Endpoint=sb://hub/\"\nstream = \"events\"\n");
        assert!(matches!(
            Effective::new(&args(file.path().to_str().unwrap())),
            Err(EventReplayError::Config(_))
        ));
    }

    #[test]
    fn zero_retry_attempts_rejected() {
        let file = settings_file(&format!("connection_string = \"{CONN}\"\nstream = \"e\"\n[retry]\nmax_attempts = 0\n"));
        assert!(matches!(
            Effective::new(&args(file.path().to_str().unwrap())),
            Err(EventReplayError::Replay(_))
        ));
    }
}

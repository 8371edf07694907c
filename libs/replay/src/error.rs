use std::path::PathBuf;

use replay_api::PublishError;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("config: {0}")]
    Config(String),

    #[error("cannot open {}: {source}", path.display())]
    SourceOpen { path: PathBuf, source: std::io::Error },

    #[error("read error at line {line}: {source}")]
    SourceRead { line: u64, source: std::io::Error },

    #[error("malformed record at line {line}: {source}")]
    MalformedRecord { line: u64, source: serde_json::Error },

    #[error("serialize record: {0}")]
    Serialize(serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(PublishError),

    #[error("connect failed: {0}")]
    Connect(PublishError),

    #[error("publish failed after {attempts} attempts: {source}")]
    RetriesExhausted { attempts: u32, source: PublishError },

    #[error("publish failed: {0}")]
    FatalPublish(PublishError),

    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum EventReplayError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Replay(#[from] replay::ReplayError),
}

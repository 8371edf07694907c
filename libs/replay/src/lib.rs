pub mod config;
pub mod controller;
pub mod error;
pub mod pacer;
pub mod record;
pub mod retry;
pub mod source;
pub mod summary;
pub mod test_utils;

pub use config::{DEFAULT_MAX_COUNT, MalformedPolicy, ReplayConfig};
pub use controller::{ReplayController, ReplayState};
pub use error::ReplayError;
pub use pacer::Pacer;
pub use record::Record;
pub use retry::RetryPolicy;
pub use source::RecordSource;
pub use summary::{ReplaySummary, TerminationReason};

pub use replay_api::{ConnectionInfo, Connector, PublishError, PublishHandle};

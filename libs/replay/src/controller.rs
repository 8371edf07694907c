use std::time::Instant;

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use replay_api::{ConnectionInfo, Connector, ErrorKind, PublishError, PublishHandle};

use crate::{
    MalformedPolicy, RecordSource, ReplayConfig, ReplayError, ReplaySummary, TerminationReason,
};

const PROGRESS_EVERY: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    Connecting,
    Streaming,
    Draining,
    Terminated,
}

#[derive(Debug, Default)]
struct Tally {
    published: u64,
    skipped: u64,
}

// ═══════════════════════════════════════════════════════════════
//  Replay controller
// ═══════════════════════════════════════════════════════════════

/// Drives one replay run: source → serialize → pace → publish.
///
/// Records are published strictly in file order, one at a time. The
/// publish handle is closed exactly once on every path that opened it,
/// including aborts and cancellation. `run` consumes the controller, so a
/// terminated run cannot be restarted.
pub struct ReplayController<C> {
    config: ReplayConfig,
    connection: ConnectionInfo,
    connector: C,
    state: ReplayState,
}

impl<C: Connector> ReplayController<C> {
    pub fn new(config: ReplayConfig, connection: ConnectionInfo, connector: C) -> Self {
        Self {
            config,
            connection,
            connector,
            state: ReplayState::Idle,
        }
    }

    /// Run to completion. Never fails: errors end up in
    /// `ReplaySummary::error` with reason `Aborted`.
    pub async fn run(mut self, token: CancellationToken) -> ReplaySummary {
        let started = Instant::now();
        let mut tally = Tally::default();

        let result = self.drive(&mut tally, &token).await;
        self.transition(ReplayState::Terminated);

        let (reason, error) = match result {
            Ok(reason) => (reason, None),
            Err(e) => (TerminationReason::Aborted, Some(e)),
        };

        match &error {
            Some(e) => tracing::error!(published = tally.published, error = %e, "replay aborted"),
            None => tracing::info!(published = tally.published, skipped = tally.skipped, %reason, "replay finished"),
        }

        ReplaySummary {
            published: tally.published,
            skipped: tally.skipped,
            reason,
            error,
            elapsed: started.elapsed(),
        }
    }

    async fn drive(
        &mut self,
        tally: &mut Tally,
        token: &CancellationToken,
    ) -> Result<TerminationReason, ReplayError> {
        self.config.validate()?;
        let mut source = RecordSource::open(&self.config.path).await?;
        tracing::info!(source = %source.name(), max_count = self.config.max_count, "source opened");

        self.transition(ReplayState::Connecting);
        let connected = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ReplayError::Cancelled),
            result = self.connector.connect(&self.connection) => result,
        };
        let mut handle = connected.map_err(connect_error)?;
        tracing::info!(peer = %handle.peer_info(), stream = %self.connection.stream, "connected");

        self.transition(ReplayState::Streaming);
        let result = self.stream(&mut source, handle.as_mut(), tally, token).await;

        self.transition(ReplayState::Draining);
        if let Err(e) = handle.close().await {
            tracing::warn!(error = ?e, "close error");
        }
        result
    }

    async fn stream<R: AsyncRead + Unpin>(
        &self,
        source: &mut RecordSource<R>,
        handle: &mut dyn PublishHandle,
        tally: &mut Tally,
        token: &CancellationToken,
    ) -> Result<TerminationReason, ReplayError> {
        let pacer = self.config.pacer();
        let mut attempted = false;

        loop {
            if tally.published >= self.config.max_count {
                return Ok(TerminationReason::MaxCountReached);
            }

            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ReplayError::Cancelled),
                next = source.next_record() => next,
            };

            let record = match next {
                Ok(Some(record)) => record,
                Ok(None) => return Ok(TerminationReason::SourceExhausted),
                Err(ReplayError::MalformedRecord { line, source: cause })
                    if self.config.malformed == MalformedPolicy::Skip =>
                {
                    tracing::warn!(line, error = %cause, "malformed record, skipping");
                    tally.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let payload = record.to_payload()?;

            if attempted && pacer.is_paced() {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(ReplayError::Cancelled),
                    _ = pacer.wait() => {}
                }
            }
            attempted = true;

            self.publish(handle, &payload, token).await?;
            tally.published += 1;
            tracing::debug!(record = tally.published, line = source.line(), bytes = payload.len(), "published");

            if self.config.verbose && tally.published % PROGRESS_EVERY == 0 {
                tracing::info!(published = tally.published, "progress");
            }
        }
    }

    /// One record, retried on transient failures up to the policy cap.
    async fn publish(
        &self,
        handle: &mut dyn PublishHandle,
        payload: &[u8],
        token: &CancellationToken,
    ) -> Result<(), ReplayError> {
        let retry = self.config.retry;
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ReplayError::Cancelled),
                result = handle.publish(payload) => result,
            };

            let err = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(ReplayError::FatalPublish(err));
            }
            if !retry.allows_retry_after(attempt) {
                return Err(ReplayError::RetriesExhausted { attempts: attempt, source: err });
            }

            tracing::warn!(attempt, max_attempts = retry.max_attempts, error = %err, "transient publish error, retrying");
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ReplayError::Cancelled),
                _ = tokio::time::sleep(retry.backoff) => {}
            }
            attempt += 1;
        }
    }

    fn transition(&mut self, next: ReplayState) {
        tracing::debug!(from = ?self.state, to = ?next, "state");
        self.state = next;
    }
}

fn connect_error(e: PublishError) -> ReplayError {
    match e.kind() {
        ErrorKind::Auth => ReplayError::Auth(e),
        ErrorKind::Config => ReplayError::Config(e.to_string()),
        _ => ReplayError::Connect(e),
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use replay_api::{BoxFuture, ConnectionInfo, Connector, PublishError, PublishHandle};

#[derive(Default)]
struct Shared {
    payloads: Vec<Vec<u8>>,
    call_started: Vec<Instant>,
    publish_calls: u64,
    connect_calls: u64,
    close_calls: u64,
    failures: HashMap<u64, PublishError>,
    connect_error: Option<PublishError>,
    latency: Duration,
    hang_at: Option<u64>,
}

/// In-memory publish client that records every confirmed payload.
///
/// Failures are scripted per publish call (1-based, retries included), so
/// `fail_at(3, ..)` fails the third call to `publish` whichever record it
/// carries. Clones share state: keep one clone for assertions and hand the
/// other to the controller.
#[derive(Clone, Default)]
pub struct CollectorConnector {
    shared: Arc<Mutex<Shared>>,
}

impl CollectorConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `call`-th publish call with `err`.
    pub fn fail_at(self, call: u64, err: PublishError) -> Self {
        self.shared.lock().unwrap().failures.insert(call, err);
        self
    }

    pub fn fail_connect(self, err: PublishError) -> Self {
        self.shared.lock().unwrap().connect_error = Some(err);
        self
    }

    /// Simulated publish latency.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.shared.lock().unwrap().latency = latency;
        self
    }

    /// The `call`-th publish call never completes.
    pub fn hang_at(self, call: u64) -> Self {
        self.shared.lock().unwrap().hang_at = Some(call);
        self
    }

    /// Confirmed payloads in publish order.
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.shared.lock().unwrap().payloads.clone()
    }

    /// Confirmed payloads decoded back into JSON.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.payloads()
            .iter()
            .map(|p| serde_json::from_slice(p).unwrap_or(serde_json::Value::Null))
            .collect()
    }

    /// Start instants of every publish call, failed ones included.
    pub fn call_started(&self) -> Vec<Instant> {
        self.shared.lock().unwrap().call_started.clone()
    }

    pub fn publish_calls(&self) -> u64 {
        self.shared.lock().unwrap().publish_calls
    }

    pub fn connect_count(&self) -> u64 {
        self.shared.lock().unwrap().connect_calls
    }

    pub fn close_count(&self) -> u64 {
        self.shared.lock().unwrap().close_calls
    }
}

impl Connector for CollectorConnector {
    fn connect<'a>(
        &'a self,
        _info: &'a ConnectionInfo,
    ) -> BoxFuture<'a, Result<Box<dyn PublishHandle>, PublishError>> {
        let result = {
            let mut shared = self.shared.lock().unwrap();
            shared.connect_calls += 1;
            match shared.connect_error.clone() {
                Some(e) => Err(e),
                None => Ok(Box::new(CollectorHandle { shared: self.shared.clone() }) as Box<dyn PublishHandle>),
            }
        };
        Box::pin(async move { result })
    }
}

struct CollectorHandle {
    shared: Arc<Mutex<Shared>>,
}

impl PublishHandle for CollectorHandle {
    fn publish<'a>(&'a mut self, payload: &'a [u8]) -> BoxFuture<'a, Result<(), PublishError>> {
        Box::pin(async move {
            let (latency, failure, hang) = {
                let mut shared = self.shared.lock().unwrap();
                shared.publish_calls += 1;
                let call = shared.publish_calls;
                shared.call_started.push(Instant::now());
                (shared.latency, shared.failures.remove(&call), shared.hang_at == Some(call))
            };

            if hang {
                std::future::pending::<()>().await;
            }
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if let Some(e) = failure {
                return Err(e);
            }

            self.shared.lock().unwrap().payloads.push(payload.to_vec());
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), PublishError>> {
        self.shared.lock().unwrap().close_calls += 1;
        Box::pin(async { Ok(()) })
    }

    fn peer_info(&self) -> String {
        "memory://collector".into()
    }
}

/// Temporary JSONL file with one record per line.
#[cfg(test)]
pub fn write_jsonl(records: &[serde_json::Value]) -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    for record in records {
        writeln!(file, "{record}").unwrap();
    }
    file.flush().unwrap();
    file
}

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use replay_api::PublishError;

// ═══════════════════════════════════════════════════════════════
//  Frames — one JSON document per line, '\n'-terminated
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub(crate) struct AttachFrame<'a> {
    pub op: &'static str,
    pub stream: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<&'a str>,
}

impl<'a> AttachFrame<'a> {
    pub fn new(stream: &'a str, key_name: Option<&'a str>, key: Option<&'a str>) -> Self {
        Self { op: "attach", stream, key_name, key }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Status {
    Ok,
    Busy,
    Throttled,
    Unauthorized,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Reply {
    pub status: Status,
    #[serde(default)]
    pub message: Option<String>,
}

impl Reply {
    fn detail(&self) -> String {
        match &self.message {
            Some(m) => format!("{:?}: {m}", self.status),
            None => format!("{:?}", self.status),
        }
    }

    /// Ack → publish outcome.
    pub fn into_publish_result(self) -> Result<(), PublishError> {
        match self.status {
            Status::Ok => Ok(()),
            Status::Busy | Status::Throttled => Err(PublishError::transient(self.detail())),
            _ => Err(PublishError::fatal(self.detail())),
        }
    }

    /// Attach reply → session outcome.
    pub fn into_attach_result(self) -> Result<(), PublishError> {
        match self.status {
            Status::Ok => Ok(()),
            Status::Unauthorized => Err(PublishError::auth(self.detail())),
            _ => Err(PublishError::connect(format!("attach refused: {}", self.detail()))),
        }
    }
}

/// Lines framing: payload + '\n'.
pub(crate) fn encode_line(data: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(data);
    buf.push(b'\n');
}

/// Write one frame and wait for one reply line.
///
/// I/O failures, EOF, and timeout are `Transient`; an unparsable reply is
/// `Fatal` (the peer does not speak the protocol).
pub(crate) async fn exchange<S>(
    conn: &mut BufReader<S>,
    frame: &[u8],
    timeout: Duration,
) -> Result<Reply, PublishError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.write_all(frame).await?;
    conn.flush().await?;

    let mut line = String::new();
    let n = tokio::time::timeout(timeout, conn.read_line(&mut line))
        .await
        .map_err(|_| PublishError::transient(format!("no reply within {}ms", timeout.as_millis())))??;
    if n == 0 {
        return Err(PublishError::transient("connection closed by peer"));
    }

    serde_json::from_str(line.trim_end())
        .map_err(|e| PublishError::fatal(format!("bad reply '{}': {e}", line.trim_end())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_api::ErrorKind;

    fn reply(s: &str) -> Reply {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn ack_mapping() {
        assert!(reply(r#"{"status":"ok"}"#).into_publish_result().is_ok());
        assert_eq!(
            reply(r#"{"status":"busy"}"#).into_publish_result().unwrap_err().kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            reply(r#"{"status":"throttled","message":"slow down"}"#)
                .into_publish_result()
                .unwrap_err()
                .kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            reply(r#"{"status":"rejected","message":"too big"}"#)
                .into_publish_result()
                .unwrap_err()
                .kind(),
            ErrorKind::Fatal
        );
        assert_eq!(
            reply(r#"{"status":"weird"}"#).into_publish_result().unwrap_err().kind(),
            ErrorKind::Fatal
        );
    }

    #[test]
    fn attach_mapping() {
        assert!(reply(r#"{"status":"ok"}"#).into_attach_result().is_ok());
        assert_eq!(
            reply(r#"{"status":"unauthorized"}"#).into_attach_result().unwrap_err().kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            reply(r#"{"status":"busy"}"#).into_attach_result().unwrap_err().kind(),
            ErrorKind::Connect
        );
    }

    #[test]
    fn attach_frame_omits_missing_credentials() {
        let frame = serde_json::to_string(&AttachFrame::new("events", None, None)).unwrap();
        assert_eq!(frame, r#"{"op":"attach","stream":"events"}"#);
    }
}

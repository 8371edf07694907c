use std::future::Future;
use std::pin::Pin;

/// Boxed future, возвращаемый методами publish-клиента.
///
/// Трейты ниже должны оставаться object-safe (`Box<dyn PublishHandle>`),
/// поэтому async fn в трейтах не используются.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ════════════════════════════════════════════════════════════════
//  Connection Info
// ════════════════════════════════════════════════════════════════

/// Параметры подключения к streaming endpoint.
///
/// Резолвятся один раз при старте (settings file + env) и передаются
/// в контроллер по значению. Connection string содержит секрет, поэтому
/// `Debug` его не печатает.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub connection_string: String,
    pub stream: String,
}

impl ConnectionInfo {
    pub fn new(connection_string: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            stream: stream.into(),
        }
    }
}

impl std::fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("connection_string", &"<redacted>")
            .field("stream", &self.stream)
            .finish()
    }
}

// ════════════════════════════════════════════════════════════════
//  Publish Client Traits
// ════════════════════════════════════════════════════════════════

/// Фабрика сессий с streaming endpoint.
///
/// Реализации: TCP line publisher, in-memory fakes в тестах.
pub trait Connector: Send + Sync {
    /// Установить сессию. Ошибки: `Auth`, `Connect`, `Config`.
    fn connect<'a>(
        &'a self,
        info: &'a ConnectionInfo,
    ) -> BoxFuture<'a, Result<Box<dyn PublishHandle>, PublishError>>;
}

/// Открытая сессия с endpoint. Владелец — ровно один вызывающий,
/// конкурентных publish не бывает.
pub trait PublishHandle: Send {
    /// Доставить один сериализованный record. Возвращает Ok только после
    /// подтверждения от endpoint. Ошибки: `Transient`, `Fatal`.
    fn publish<'a>(&'a mut self, payload: &'a [u8]) -> BoxFuture<'a, Result<(), PublishError>>;

    /// Flush + закрытие. Повторный вызов — no-op.
    fn close(&mut self) -> BoxFuture<'_, Result<(), PublishError>>;

    /// Описание удалённой стороны (для логирования).
    fn peer_info(&self) -> String {
        "unknown".into()
    }
}

// ════════════════════════════════════════════════════════════════
//  Publish Error
// ════════════════════════════════════════════════════════════════

/// Category of a publish error. Lets the controller decide between
/// retry, abort, and fail-fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid connection string or client settings — permanent.
    Config,
    /// Endpoint rejected the credentials.
    Auth,
    /// Endpoint unreachable or handshake failed.
    Connect,
    /// Throttling, dropped connection, ack timeout — may retry.
    Transient,
    /// Rejected payload or broken session — never retried.
    Fatal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Auth => f.write_str("auth"),
            ErrorKind::Connect => f.write_str("connect"),
            ErrorKind::Transient => f.write_str("transient"),
            ErrorKind::Fatal => f.write_str("fatal"),
        }
    }
}

/// Unified error type for all publish-client operations.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
/// `From` impls assign the kind automatically so implementations can use `?`.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishError {
    kind: ErrorKind,
    message: String,
}

impl PublishError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, msg)
    }

    pub fn connect(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connect, msg)
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, msg)
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Только `Transient` подлежит повтору.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

impl std::fmt::Debug for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PublishError {}

impl From<std::io::Error> for PublishError {
    fn from(e: std::io::Error) -> Self {
        Self::transient(e.to_string())
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self {
        Self::fatal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(PublishError::transient("busy").is_retryable());
        assert!(!PublishError::fatal("rejected").is_retryable());
        assert!(!PublishError::auth("denied").is_retryable());
        assert!(!PublishError::connect("refused").is_retryable());
        assert!(!PublishError::config("bad").is_retryable());
    }

    #[test]
    fn io_errors_are_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: PublishError = io.into();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.message(), "pipe closed");
        assert_eq!(format!("{err:?}"), "[transient] pipe closed");
    }

    #[test]
    fn connection_info_debug_hides_secret() {
        let info = ConnectionInfo::new("Endpoint=tcp://h:1;SharedAccessKey=topsecret", "events");
        let dbg = format!("{info:?}");
        assert!(!dbg.contains("topsecret"));
        assert!(dbg.contains("events"));
    }
}

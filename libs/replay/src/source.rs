use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::{Record, ReplayError};

// ═══════════════════════════════════════════════════════════════
//  Record source — line-delimited JSON, read lazily
// ═══════════════════════════════════════════════════════════════

/// Lazy, finite, non-restartable sequence of records.
///
/// Each non-blank line is parsed as one independent JSON value. Line numbers
/// are 1-based and count blank lines, so error messages point at the file
/// as the user sees it.
pub struct RecordSource<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    line: u64,
    name: String,
    done: bool,
}

impl RecordSource<File> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|e| ReplayError::SourceOpen {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_reader(file, path.display().to_string()))
    }
}

impl<R: AsyncRead + Unpin> RecordSource<R> {
    pub fn from_reader(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::with_capacity(8192),
            line: 0,
            name: name.into(),
            done: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of lines consumed so far.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Next record, or `None` at end of file. Fused: once `None` is
    /// returned (or a read error), every further call returns `None`.
    ///
    /// A malformed line does not poison the source; the caller decides
    /// whether to continue past it.
    pub async fn next_record(&mut self) -> Result<Option<Record>, ReplayError> {
        loop {
            if self.done {
                return Ok(None);
            }

            self.buf.clear();
            let n = match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Err(ReplayError::SourceRead { line: self.line + 1, source: e });
                }
            };
            if n == 0 {
                self.done = true;
                return Ok(None);
            }
            self.line += 1;

            let frame = trim_line(&self.buf);
            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return serde_json::from_slice(frame)
                .map(|value| Some(Record::new(value)))
                .map_err(|e| ReplayError::MalformedRecord { line: self.line, source: e });
        }
    }
}

/// Strip the line terminator (`\n` or `\r\n`).
fn trim_line(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}

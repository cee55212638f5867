//! I/O primitives for communicating with the ExifTool subprocess.

use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::config::Charset;
use crate::handler::OutputHandler;
use crate::{Error, Result};

/// Reads decoded lines from the subprocess stdout.
///
/// Lines are split on `\n`; a trailing `\r` is dropped. Bytes are decoded
/// with the session charset, and undecodable bytes are replaced rather than
/// treated as errors.
pub struct LineReader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
    charset: Charset,
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    pub fn new(reader: R, charset: Charset) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(4096),
            charset,
        }
    }

    /// Read the next line.
    ///
    /// Returns `Ok(None)` when EOF is reached.
    ///
    /// Cancel safe: bytes of a partly read line stay buffered and the next
    /// call continues from them, so this can race in `tokio::select!`.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        let bytes_read = self
            .reader
            .read_until(b'\n', &mut self.buffer)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to read process output");
                Error::io(e)
            })?;

        if bytes_read == 0 && self.buffer.is_empty() {
            return Ok(None);
        }

        let mut line = self.buffer.as_slice();
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped;
        }
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }

        let decoded = self.charset.decode(line).into_owned();
        self.buffer.clear();
        Ok(Some(decoded))
    }

    /// Push lines into `handler` until it asks to stop or the stream ends.
    ///
    /// At EOF the handler receives `None`. Returns `true` if EOF was reached.
    pub async fn read_into(&mut self, handler: &mut dyn OutputHandler) -> Result<bool> {
        loop {
            match self.read_line().await? {
                Some(line) => {
                    if !handler.consume(Some(&line)) {
                        return Ok(false);
                    }
                }
                None => {
                    handler.consume(None);
                    return Ok(true);
                }
            }
        }
    }
}

/// Writes encoded text to the subprocess stdin.
///
/// Writes are buffered until [`flush`](Self::flush).
pub struct LineWriter<W> {
    writer: BufWriter<W>,
    charset: Charset,
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    pub fn new(writer: W, charset: Charset) -> Self {
        Self {
            writer: BufWriter::new(writer),
            charset,
        }
    }

    /// Write `input` verbatim; no line terminator is added.
    pub async fn write(&mut self, input: &str) -> Result<()> {
        self.write_all(std::slice::from_ref(&input)).await
    }

    /// Write every input in order.
    ///
    /// All inputs are encoded before the first byte is buffered, so an input
    /// the charset cannot represent leaves the stream untouched.
    pub async fn write_all<S: AsRef<str>>(&mut self, inputs: &[S]) -> Result<()> {
        let encoded = inputs
            .iter()
            .map(|input| self.charset.encode(input.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        for (input, bytes) in inputs.iter().zip(&encoded) {
            tracing::debug!(charset = %self.charset, input = input.as_ref(), "send command input");
            self.writer.write_all(bytes).await.map_err(|e| {
                tracing::error!(error = %e, "failed to write process input");
                Error::io(e)
            })?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.map_err(|e| {
            tracing::error!(error = %e, "failed to flush process input");
            Error::io(e)
        })
    }

    /// Flush pending input and close the stream.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.writer.shutdown().await
    }
}

/// Most recent stderr lines of a process, for error reports.
#[derive(Debug, Clone)]
pub struct StderrTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl StderrTail {
    /// Lines kept by [`StderrTail::default`].
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Log `line` and keep it, evicting the oldest line when full.
    pub fn record(&mut self, line: String) {
        tracing::warn!(stderr = %line, "exiftool wrote to stderr");
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for StderrTail {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

//! A live process reached through its three standard streams.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Child;

use super::io::{LineReader, LineWriter, StderrTail};
use crate::config::Charset;
use crate::handler::{CompositeHandler, OutputHandler, ResultHandler};
use crate::{Error, Result};

/// Read/write access to a running ExifTool process.
///
/// The lifecycle is one-way: open, then closed. Once closed, every read and
/// write fails with [`Error::ProcessClosed`].
///
/// Implementations are not meant for concurrent use; the owner serializes
/// access (methods take `&mut self`).
#[async_trait]
pub trait CommandProcess: Send {
    /// Write every input verbatim, in order. No framing is added.
    async fn write(&mut self, inputs: &[String]) -> Result<()>;

    /// Push buffered input through to the process.
    async fn flush(&mut self) -> Result<()>;

    /// Read one response: output lines up to `{ready}` or the end of stream.
    ///
    /// Lines go to an internal [`ResultHandler`] and, when given, to
    /// `handler` as well. Once `handler` asks to stop it sees no more lines,
    /// but the rest of the response is still consumed so the next read starts
    /// on a fresh one. Returns the internal handler's text.
    async fn read(&mut self, handler: Option<&mut dyn OutputHandler>) -> Result<String>;

    /// Close input, output and error streams, in that order.
    ///
    /// Every stream is closed even if an earlier one fails, the process is
    /// marked closed regardless, and the first failure is returned.
    async fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Whether the process can still serve requests.
    fn is_running(&self) -> bool {
        !self.is_closed()
    }

    /// Latest lines the process wrote to stderr, oldest first.
    fn recent_stderr(&self) -> Vec<String> {
        Vec::new()
    }
}

enum Next {
    Output(Option<String>),
    Error(Result<Option<String>>),
}

/// Feed stdout lines to `handler` while draining stderr.
///
/// Stdout is polled first. Stderr lines go to `tail`; a stderr stream that
/// ends or fails is dropped and no longer polled. Returns `true` at the end
/// of stdout.
async fn pump<R, E>(
    output: &mut LineReader<R>,
    error: &mut Option<LineReader<E>>,
    tail: &mut StderrTail,
    handler: &mut dyn OutputHandler,
) -> Result<bool>
where
    R: AsyncRead + Unpin + Send,
    E: AsyncRead + Unpin + Send,
{
    loop {
        let next = match error.as_mut() {
            Some(stderr) => tokio::select! {
                biased;
                line = output.read_line() => Next::Output(line?),
                line = stderr.read_line() => Next::Error(line),
            },
            None => Next::Output(output.read_line().await?),
        };

        match next {
            Next::Output(Some(line)) => {
                if !handler.consume(Some(&line)) {
                    return Ok(false);
                }
            }
            Next::Output(None) => {
                handler.consume(None);
                return Ok(true);
            }
            Next::Error(Ok(Some(line))) => tail.record(line),
            Next::Error(Ok(None)) => {
                tracing::debug!("process stderr reached end of stream");
                *error = None;
            }
            Next::Error(Err(e)) => {
                tracing::warn!(error = %e, "stopped reading process stderr");
                *error = None;
            }
        }
    }
}

/// [`CommandProcess`] over arbitrary async streams.
///
/// Built by [`DefaultExecutor`](super::DefaultExecutor) from a child's pipes,
/// or directly from in-memory streams.
pub struct PipedProcess<W, R, E> {
    input: Option<LineWriter<W>>,
    output: Option<LineReader<R>>,
    error: Option<LineReader<E>>,
    stderr: StderrTail,
    child: Option<Child>,
    close_timeout: Duration,
    closed: bool,
    eof: bool,
}

impl<W, R, E> PipedProcess<W, R, E>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
    E: AsyncRead + Unpin + Send,
{
    pub fn new(input: W, output: R, error: E, charset: Charset) -> Self {
        Self {
            input: Some(LineWriter::new(input, charset)),
            output: Some(LineReader::new(output, charset)),
            error: Some(LineReader::new(error, charset)),
            stderr: StderrTail::default(),
            child: None,
            close_timeout: crate::config::DEFAULT_CLOSE_TIMEOUT,
            closed: false,
            eof: false,
        }
    }

    /// Attach the child so that close waits for it to exit.
    pub fn with_child(mut self, child: Child, close_timeout: Duration) -> Self {
        self.child = Some(child);
        self.close_timeout = close_timeout;
        self
    }

    /// OS process id, if a child is attached and still running.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn input(&mut self) -> Result<&mut LineWriter<W>> {
        if self.closed {
            return Err(Error::ProcessClosed {
                operation: "write to",
            });
        }
        self.input.as_mut().ok_or(Error::ProcessClosed {
            operation: "write to",
        })
    }

    /// Wait for the child to exit, killing it after the close timeout.
    async fn reap_child(&mut self) -> std::io::Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        match tokio::time::timeout(self.close_timeout, child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!(%status, "exiftool process exited");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.close_timeout,
                    "exiftool process did not exit after close, killing it"
                );
                child.kill().await
            }
        }
    }
}

#[async_trait]
impl<W, R, E> CommandProcess for PipedProcess<W, R, E>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
    E: AsyncRead + Unpin + Send,
{
    async fn write(&mut self, inputs: &[String]) -> Result<()> {
        if inputs.is_empty() {
            return Err(Error::InvalidArgument(
                "write inputs should not be empty".into(),
            ));
        }
        self.input()?.write_all(inputs).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.input()?.flush().await
    }

    async fn read(&mut self, handler: Option<&mut dyn OutputHandler>) -> Result<String> {
        let closed = Error::ProcessClosed {
            operation: "read from",
        };
        if self.closed {
            return Err(closed);
        }
        let Self {
            output,
            error,
            stderr,
            ..
        } = self;
        let reader = output.as_mut().ok_or(closed)?;

        tracing::debug!("read command output");

        let mut result = ResultHandler::new();
        let mut reached_eof = match handler {
            Some(external) => {
                let mut composite = CompositeHandler::new().with(&mut result).with(external);
                pump(reader, error, stderr, &mut composite).await?
            }
            None => pump(reader, error, stderr, &mut result).await?,
        };

        if !reached_eof && !result.is_complete() {
            tracing::debug!("output handler stopped early, consuming rest of response");
            reached_eof = pump(reader, error, stderr, &mut result).await?;
        }

        if reached_eof {
            tracing::debug!("process output reached end of stream");
            self.eof = true;
        }

        Ok(result.output())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let mut first_error: Option<std::io::Error> = None;

        if let Some(mut input) = self.input.take() {
            if let Err(e) = input.shutdown().await {
                tracing::error!(error = %e, "failed to close process input");
                first_error.get_or_insert(e);
            }
        }

        // Readers release their pipe on drop; there is no fallible close.
        drop(self.output.take());
        drop(self.error.take());

        self.closed = true;

        if let Err(e) = self.reap_child().await {
            tracing::error!(error = %e, "failed to stop exiftool process");
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(Error::io(e)),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn is_running(&self) -> bool {
        !self.closed && !self.eof
    }

    fn recent_stderr(&self) -> Vec<String> {
        self.stderr.lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{RawOutputHandler, READY};
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    type DuplexProcess = PipedProcess<DuplexStream, DuplexStream, DuplexStream>;

    /// Process plus the far ends of its stdin and stdout.
    fn duplex_process() -> (DuplexProcess, DuplexStream, DuplexStream) {
        let (stdin, stdin_far) = tokio::io::duplex(4096);
        let (stdout, stdout_far) = tokio::io::duplex(4096);
        let (stderr, _stderr_far) = tokio::io::duplex(64);
        (
            PipedProcess::new(stdin, stdout, stderr, Charset::Utf8),
            stdin_far,
            stdout_far,
        )
    }

    /// Writer that accepts data but fails to shut down.
    struct FailingShutdown;

    impl AsyncWrite for FailingShutdown {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin already gone",
            )))
        }
    }

    #[tokio::test]
    async fn write_flush_reaches_process() {
        let (mut process, mut stdin_far, _stdout_far) = duplex_process();

        process
            .write(&["-ver\n".to_string(), "-execute\n".to_string()])
            .await
            .unwrap();
        process.flush().await.unwrap();
        process.close().await.unwrap();

        let mut received = String::new();
        stdin_far.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "-ver\n-execute\n");
    }

    #[tokio::test]
    async fn write_rejects_empty_inputs() {
        let (mut process, _stdin_far, _stdout_far) = duplex_process();
        let err = process.write(&[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn read_returns_block_before_sentinel() {
        let (mut process, _stdin_far, mut stdout_far) = duplex_process();
        stdout_far
            .write_all(b"Artist: Jane\nComment: test\n{ready}\n12.76\n{ready}\n")
            .await
            .unwrap();

        assert_eq!(process.read(None).await.unwrap(), "Artist: Jane\nComment: test");
        assert_eq!(process.read(None).await.unwrap(), "12.76");
        assert!(process.is_running());
    }

    #[tokio::test]
    async fn read_feeds_external_handler() {
        let (mut process, _stdin_far, mut stdout_far) = duplex_process();
        stdout_far.write_all(b"[{\n\"Make\": \"HTC\"\n}]\n{ready}\n").await.unwrap();

        let mut raw = RawOutputHandler::new();
        let text = process.read(Some(&mut raw)).await.unwrap();
        assert_eq!(text, "[{\n\"Make\": \"HTC\"\n}]");
        assert_eq!(raw.output(), text);
        assert!(!raw.output().contains(READY));
    }

    #[tokio::test]
    async fn early_stopping_handler_leaves_next_response_intact() {
        let (mut process, _stdin_far, mut stdout_far) = duplex_process();
        stdout_far
            .write_all(b"A1\nA2\nA3\n{ready}\nB1\n{ready}\n")
            .await
            .unwrap();

        let mut seen = Vec::new();
        let mut first_only = |line: Option<&str>| {
            seen.extend(line.map(str::to_string));
            false
        };
        let text = process.read(Some(&mut first_only)).await.unwrap();
        assert_eq!(seen, ["A1"]);
        assert_eq!(text, "A1\nA2\nA3");

        assert_eq!(process.read(None).await.unwrap(), "B1");
        assert!(process.is_running());
    }

    #[tokio::test]
    async fn stderr_is_drained_while_reading_output() {
        let (stdin, _stdin_far) = tokio::io::duplex(64);
        let (stdout, mut stdout_far) = tokio::io::duplex(64);
        let (stderr, mut stderr_far) = tokio::io::duplex(64);
        let mut process = PipedProcess::new(stdin, stdout, stderr, Charset::Utf8);

        // Far more than the stderr pipe holds; the writer blocks unless drained.
        let writer = tokio::spawn(async move {
            for i in 0..2000 {
                let line = format!("Warning: minor error {i}\n");
                stderr_far.write_all(line.as_bytes()).await.unwrap();
            }
            stdout_far.write_all(b"done\n{ready}\n").await.unwrap();
            (stdout_far, stderr_far)
        });

        let text = tokio::time::timeout(std::time::Duration::from_secs(5), process.read(None))
            .await
            .expect("read blocked on a full stderr pipe")
            .unwrap();
        assert_eq!(text, "done");

        let _streams = writer.await.unwrap();
        let tail = process.recent_stderr();
        assert_eq!(tail.len(), StderrTail::DEFAULT_CAPACITY);
        assert!(tail.iter().all(|l| l.starts_with("Warning: minor error")));
    }

    #[tokio::test]
    async fn closed_stderr_does_not_end_read() {
        let (stdin, _stdin_far) = tokio::io::duplex(64);
        let (stdout, mut stdout_far) = tokio::io::duplex(64);
        let (stderr, stderr_far) = tokio::io::duplex(64);
        let mut process = PipedProcess::new(stdin, stdout, stderr, Charset::Utf8);
        drop(stderr_far);

        stdout_far.write_all(b"9.36\n{ready}\n").await.unwrap();
        assert_eq!(process.read(None).await.unwrap(), "9.36");
        assert!(process.is_running());
        assert!(process.recent_stderr().is_empty());
    }

    #[tokio::test]
    async fn unencodable_input_is_rejected_before_writing() {
        let (stdin, mut stdin_far) = tokio::io::duplex(64);
        let (stdout, _stdout_far) = tokio::io::duplex(64);
        let (stderr, _stderr_far) = tokio::io::duplex(64);
        let mut process = PipedProcess::new(stdin, stdout, stderr, Charset::Latin1);

        let err = process
            .write(&["-Title=ok\n".to_string(), "-Title=☕\n".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        process.write(&["-ver\n".to_string()]).await.unwrap();
        process.close().await.unwrap();
        let mut received = String::new();
        stdin_far.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "-ver\n");
    }

    #[tokio::test]
    async fn read_at_eof_marks_process_not_running() {
        let (mut process, _stdin_far, stdout_far) = duplex_process();
        drop(stdout_far);

        assert_eq!(process.read(None).await.unwrap(), "");
        assert!(!process.is_running());
        assert!(!process.is_closed());
    }

    #[tokio::test]
    async fn operations_fail_after_close() {
        let (mut process, _stdin_far, _stdout_far) = duplex_process();
        process.write(&["-ver\n".to_string()]).await.unwrap();
        process.close().await.unwrap();

        assert!(process.is_closed());
        assert!(!process.is_running());
        assert!(matches!(
            process.write(&["-ver\n".to_string()]).await,
            Err(Error::ProcessClosed { .. })
        ));
        assert!(matches!(process.flush().await, Err(Error::ProcessClosed { .. })));
        assert!(matches!(
            process.read(None).await,
            Err(Error::ProcessClosed { .. })
        ));
    }

    #[tokio::test]
    async fn close_reports_first_error_and_still_closes() {
        let (stdout, _stdout_far) = tokio::io::duplex(64);
        let (stderr, _stderr_far) = tokio::io::duplex(64);
        let mut process = PipedProcess::new(FailingShutdown, stdout, stderr, Charset::Utf8);

        let err = process.close().await.unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert!(process.is_closed());
        assert!(matches!(
            process.read(None).await,
            Err(Error::ProcessClosed { .. })
        ));
    }

    #[tokio::test]
    async fn close_twice_is_harmless() {
        let (mut process, _stdin_far, _stdout_far) = duplex_process();
        process.close().await.unwrap();
        process.close().await.unwrap();
    }

    #[test]
    fn piped_process_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<DuplexProcess>();
    }
}

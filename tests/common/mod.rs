//! Test utilities for libexiftool integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use libexiftool::handler::{CompositeHandler, OutputHandler, ResultHandler, READY};
use libexiftool::process::{Command, CommandExecutor, CommandProcess, CommandResult};
use libexiftool::{Error, Result};

/// Something a mock executor or process was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Execute(Vec<String>),
    Start(Vec<String>),
    Write(Vec<String>),
    Flush,
    Read,
    Close,
}

/// Shared, ordered record of events.
pub type Log = Arc<Mutex<Vec<Event>>>;

/// Scripted outcome of one [`MockProcess::read`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// Lines followed by `{ready}`.
    Response(Vec<String>),
    /// Lines followed by end of stream.
    Eof(Vec<String>),
    /// Read fails with an I/O error.
    Fail(std::io::ErrorKind),
    /// Read never completes.
    Hang,
}

impl Reply {
    pub fn response(lines: &[&str]) -> Self {
        Reply::Response(lines.iter().map(|s| s.to_string()).collect())
    }
}

/// A [`CommandProcess`] that replays scripted replies.
pub struct MockProcess {
    log: Log,
    replies: VecDeque<Reply>,
    close_error: Option<std::io::ErrorKind>,
    closed: bool,
    eof: bool,
}

impl MockProcess {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            log: Log::default(),
            replies: replies.into(),
            close_error: None,
            closed: false,
            eof: false,
        }
    }

    /// Make `close` fail with `kind`.
    pub fn failing_close(mut self, kind: std::io::ErrorKind) -> Self {
        self.close_error = Some(kind);
        self
    }

    fn record(&self, event: Event) {
        self.log.lock().unwrap().push(event);
    }

    fn check_open(&self, operation: &'static str) -> Result<()> {
        if self.closed {
            Err(Error::ProcessClosed { operation })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CommandProcess for MockProcess {
    async fn write(&mut self, inputs: &[String]) -> Result<()> {
        self.check_open("write to")?;
        self.record(Event::Write(inputs.to_vec()));
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.check_open("write to")?;
        self.record(Event::Flush);
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn read(&mut self, handler: Option<&mut dyn OutputHandler>) -> Result<String> {
        self.check_open("read from")?;
        self.record(Event::Read);
        tokio::task::yield_now().await;

        let mut result = ResultHandler::new();
        let mut composite = CompositeHandler::new().with(&mut result);
        if let Some(handler) = handler {
            composite.push(handler);
        }

        // Like a real process, a handler that stops early does not leave the
        // rest of the response behind: the remaining lines go to `result`.
        let (lines, eof) = match self.replies.pop_front().unwrap_or(Reply::Eof(Vec::new())) {
            Reply::Response(lines) => (lines, false),
            Reply::Eof(lines) => (lines, true),
            Reply::Fail(kind) => return Err(Error::Io(std::io::Error::from(kind))),
            Reply::Hang => std::future::pending().await,
        };
        let terminator = if eof { None } else { Some(READY) };
        let mut remaining = lines
            .iter()
            .map(|line| Some(line.as_str()))
            .chain([terminator]);

        for line in remaining.by_ref() {
            if !composite.consume(line) {
                break;
            }
        }
        drop(composite);
        for line in remaining {
            if !result.consume(line) {
                break;
            }
        }

        self.eof = eof;
        Ok(result.output())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.record(Event::Close);
        self.closed = true;
        match self.close_error {
            Some(kind) => Err(Error::Io(std::io::Error::from(kind))),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn is_running(&self) -> bool {
        !self.closed && !self.eof
    }
}

/// A [`CommandExecutor`] that records every spawn.
///
/// One-shot calls pop queued results (an empty success once the queue runs
/// dry); persistent starts pop queued processes and fail when none is left.
#[derive(Default)]
pub struct MockExecutor {
    log: Log,
    results: Mutex<VecDeque<Result<CommandResult>>>,
    processes: Mutex<VecDeque<MockProcess>>,
}

impl MockExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Executor whose first one-shot call reports `version`.
    pub fn with_version(version: &str) -> Arc<Self> {
        let executor = Self::new();
        executor.push_result(Ok(CommandResult::success(format!("{version}\n"))));
        executor
    }

    pub fn push_result(&self, result: Result<CommandResult>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn push_stdout(&self, stdout: &str) {
        self.push_result(Ok(CommandResult::success(stdout)));
    }

    pub fn push_process(&self, mut process: MockProcess) {
        process.log = Arc::clone(&self.log);
        self.processes.lock().unwrap().push_back(process);
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    /// Events recorded after the version probe.
    pub fn events_after_probe(&self) -> Vec<Event> {
        self.events().into_iter().skip(1).collect()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn executions(&self) -> usize {
        self.count(|e| matches!(e, Event::Execute(_)))
    }

    pub fn starts(&self) -> usize {
        self.count(|e| matches!(e, Event::Start(_)))
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.log.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(&self, command: &Command) -> Result<CommandResult> {
        self.log.lock().unwrap().push(Event::Execute(command.to_vec()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CommandResult::success("")))
    }

    async fn start(&self, command: &Command) -> Result<Box<dyn CommandProcess>> {
        self.log.lock().unwrap().push(Event::Start(command.to_vec()));
        match self.processes.lock().unwrap().pop_front() {
            Some(process) => Ok(Box::new(process)),
            None => Err(Error::ExecutableNotFound {
                path: command.program().to_string(),
            }),
        }
    }
}

/// Owned argument list from string literals.
pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Lines terminated with `\n`, as written to a stay-open process.
pub fn lines(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| format!("{s}\n")).collect()
}

//! ExifTool sessions.
//!
//! A [`Session`] owns the execution strategy chosen for one ExifTool install
//! and presents the same `run` call whichever mode it runs in.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use libexiftool::process::DefaultExecutor;
//! use libexiftool::strategy::ExecutionStrategy;
//! use libexiftool::Session;
//!
//! let session = Session::new(
//!     Arc::new(DefaultExecutor::new()),
//!     "exiftool",
//!     ExecutionStrategy::stay_open(),
//! );
//!
//! let args = vec!["-S".to_string(), "-Make".to_string(), "photo.jpg".to_string()];
//! let output = session.run(&args).await?;
//! session.close().await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::handler::OutputHandler;
use crate::process::CommandExecutor;
use crate::strategy::ExecutionStrategy;
use crate::{Error, Result};

/// A running ExifTool session.
///
/// # Thread Safety
///
/// `Session` is `Send + Sync` and can be shared across tasks. In stay-open
/// mode calls are serialized on the single process; in one-shot mode they
/// run concurrently.
pub struct Session {
    executor: Arc<dyn CommandExecutor>,
    program: String,
    strategy: ExecutionStrategy,
    closed: AtomicBool,
}

impl Session {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        program: impl Into<String>,
        strategy: ExecutionStrategy,
    ) -> Self {
        Self {
            executor,
            program: program.into(),
            strategy,
            closed: AtomicBool::new(false),
        }
    }

    /// Run one batch of arguments and return ExifTool's output.
    ///
    /// The stay-open process is started on the first call.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionClosed`] after [`close`](Self::close)
    /// - [`Error::InvalidArgument`] for empty `args`
    /// - [`Error::Io`] or [`Error::StreamClosed`] when the pipes fail
    pub async fn run(&self, args: &[String]) -> Result<String> {
        self.dispatch(args, None).await
    }

    /// Like [`run`](Self::run), also feeding every line to `handler`.
    pub async fn run_with_handler(
        &self,
        args: &[String],
        handler: &mut dyn OutputHandler,
    ) -> Result<String> {
        self.dispatch(args, Some(handler)).await
    }

    async fn dispatch(
        &self,
        args: &[String],
        handler: Option<&mut dyn OutputHandler>,
    ) -> Result<String> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        tracing::debug!(args = ?args, stay_open = self.is_stay_open(), "run exiftool");

        self.strategy
            .execute(self.executor.as_ref(), &self.program, args, handler)
            .await
    }

    /// Close the session and any process it holds.
    ///
    /// The first call shuts the strategy down and returns its error, if any.
    /// Later calls return `Ok(())`.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(program = %self.program, "close exiftool session");
        self.strategy.shutdown().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether a stay-open process is currently alive.
    pub fn is_running(&self) -> bool {
        !self.is_closed() && self.strategy.is_running()
    }

    pub fn is_stay_open(&self) -> bool {
        self.strategy.is_stay_open()
    }

    /// Executable this session runs.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("program", &self.program)
            .field("strategy", &self.strategy)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

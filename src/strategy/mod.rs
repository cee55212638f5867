//! Execution strategies: one-shot or stay-open.
//!
//! A session picks its strategy once, from the ExifTool version discovered at
//! startup, and keeps it for its whole lifetime:
//!
//! - [`SimpleStrategy`] spawns `exiftool <args>` for every call.
//! - [`StayOpenStrategy`] keeps one `exiftool -stay_open True -@ -` process
//!   alive and pipes each batch of arguments to it.

mod simple;
mod stay_open;

pub use simple::SimpleStrategy;
pub use stay_open::{format_batch, StayOpenStrategy};

use crate::config::Feature;
use crate::handler::{CompositeHandler, OutputHandler, ResultHandler};
use crate::process::CommandExecutor;
use crate::version::Version;
use crate::Result;

/// The strategy a session runs its calls through.
#[derive(Debug)]
pub enum ExecutionStrategy {
    Simple(SimpleStrategy),
    StayOpen(StayOpenStrategy),
}

impl ExecutionStrategy {
    pub fn simple() -> Self {
        ExecutionStrategy::Simple(SimpleStrategy)
    }

    pub fn stay_open() -> Self {
        ExecutionStrategy::StayOpen(StayOpenStrategy::new())
    }

    /// Choose the strategy for a session.
    ///
    /// Stay-open is used only when it was requested and the discovered
    /// version supports it. An unknown version never supports it.
    pub fn select(stay_open_requested: bool, version: Option<&Version>) -> Self {
        match version {
            Some(version) if stay_open_requested && StayOpenStrategy::supports(version) => {
                tracing::debug!(%version, "using stay-open execution");
                Self::stay_open()
            }
            Some(version) if stay_open_requested => {
                tracing::warn!(
                    %version,
                    min_version = %Feature::StayOpen.min_version(),
                    "exiftool does not support stay_open, falling back to one-shot execution"
                );
                Self::simple()
            }
            None if stay_open_requested => {
                tracing::warn!("exiftool version unknown, falling back to one-shot execution");
                Self::simple()
            }
            _ => Self::simple(),
        }
    }

    /// Check whether this strategy can run against `version`.
    pub fn is_supported(&self, version: &Version) -> bool {
        match self {
            ExecutionStrategy::Simple(_) => SimpleStrategy::supports(version),
            ExecutionStrategy::StayOpen(_) => StayOpenStrategy::supports(version),
        }
    }

    pub fn is_stay_open(&self) -> bool {
        matches!(self, ExecutionStrategy::StayOpen(_))
    }

    /// Run one batch of arguments and return the collected output.
    pub async fn execute(
        &self,
        executor: &dyn CommandExecutor,
        program: &str,
        args: &[String],
        handler: Option<&mut dyn OutputHandler>,
    ) -> Result<String> {
        match self {
            ExecutionStrategy::Simple(strategy) => {
                strategy.execute(executor, program, args, handler).await
            }
            ExecutionStrategy::StayOpen(strategy) => {
                strategy.execute(executor, program, args, handler).await
            }
        }
    }

    /// Release any process held by the strategy.
    pub async fn shutdown(&self) -> Result<()> {
        match self {
            ExecutionStrategy::Simple(_) => Ok(()),
            ExecutionStrategy::StayOpen(strategy) => strategy.shutdown().await,
        }
    }

    /// Whether a persistent process is currently alive.
    pub fn is_running(&self) -> bool {
        match self {
            ExecutionStrategy::Simple(_) => false,
            ExecutionStrategy::StayOpen(strategy) => strategy.is_running(),
        }
    }
}

/// Push `lines` through the internal accumulator and an optional handler.
///
/// Returns the accumulator's text.
pub(crate) fn collect_lines<'a, I>(lines: I, handler: Option<&mut dyn OutputHandler>) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut result = ResultHandler::new();
    match handler {
        Some(external) => {
            let mut composite = CompositeHandler::new().with(&mut result).with(external);
            crate::handler::feed_lines(&mut composite, lines);
        }
        None => {
            crate::handler::feed_lines(&mut result, lines);
        }
    }
    result.output()
}

use std::fmt;

use tokio::sync::Mutex;

use crate::config::Feature;
use crate::handler::OutputHandler;
use crate::process::{
    Command, CommandExecutor, CommandProcess, EXECUTE, STAY_OPEN_START, STAY_OPEN_STOP,
};
use crate::version::Version;
use crate::{Error, Result};

/// Frame a batch for a stay-open process.
///
/// Every argument goes on its own line and the batch ends with `-execute`.
/// An argument holding a line break would split into several arguments on
/// the process side, so it is rejected with [`Error::InvalidArgument`].
pub fn format_batch(args: &[String]) -> Result<Vec<String>> {
    if let Some(arg) = args.iter().find(|arg| arg.contains(['\n', '\r'])) {
        return Err(Error::InvalidArgument(format!(
            "stay-open arguments cannot contain line breaks: {arg:?}"
        )));
    }

    Ok(args
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(EXECUTE))
        .map(|arg| format!("{arg}\n"))
        .collect())
}

/// Keeps one ExifTool process alive and pipes every call through it.
///
/// The process is started on the first call. One write, flush and read cycle
/// runs at a time; concurrent callers queue on an internal lock in arrival
/// order.
pub struct StayOpenStrategy {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    process: Option<Box<dyn CommandProcess>>,
    /// Set while a cycle is running. Still set on entry means the previous
    /// caller was cancelled mid-cycle and the output framing is lost.
    in_flight: bool,
    shut_down: bool,
}

impl State {
    /// Close and forget the current process.
    async fn discard(&mut self) {
        self.in_flight = false;
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.close().await {
                tracing::debug!(error = %e, "error closing discarded exiftool process");
            }
        }
    }
}

impl StayOpenStrategy {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub fn supports(version: &Version) -> bool {
        Feature::StayOpen.is_supported(version)
    }

    /// Send one batch and read its response.
    ///
    /// Starts the process if none is running. An I/O failure discards the
    /// process so the next call starts a new one. Fails with
    /// [`Error::SessionClosed`] after [`shutdown`](Self::shutdown).
    pub async fn execute(
        &self,
        executor: &dyn CommandExecutor,
        program: &str,
        args: &[String],
        handler: Option<&mut dyn OutputHandler>,
    ) -> Result<String> {
        if args.is_empty() {
            return Err(Error::InvalidArgument("arguments should not be empty".into()));
        }
        let batch = format_batch(args)?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.shut_down {
            return Err(Error::SessionClosed);
        }

        if state.in_flight {
            tracing::warn!("previous stay-open call was interrupted, restarting exiftool");
            state.discard().await;
        }

        let process = match state.process {
            Some(ref mut process) => process,
            None => {
                let command = Command::new(program).args(STAY_OPEN_START);
                tracing::debug!(command = %command, "starting stay-open exiftool");
                state.process.insert(executor.start(&command).await?)
            }
        };

        state.in_flight = true;
        let result = exchange(&mut **process, &batch, handler).await;
        state.in_flight = false;

        if let Err(ref e) = result {
            if e.is_poisoning() {
                tracing::error!(error = %e, "stay-open exiftool failed, discarding process");
                state.discard().await;
            }
        }
        result
    }

    /// Ask the process to exit and close it.
    ///
    /// Every step is attempted; the first error is returned. Later calls
    /// return `Ok(())`.
    pub async fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return Ok(());
        }
        state.shut_down = true;

        let Some(mut process) = state.process.take() else {
            return Ok(());
        };

        tracing::debug!("stopping stay-open exiftool");

        let mut first_error = None;
        if !process.is_closed() {
            let stop: Vec<String> = STAY_OPEN_STOP.iter().map(|arg| format!("{arg}\n")).collect();
            let sent = match process.write(&stop).await {
                Ok(()) => process.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                first_error = Some(e);
            }
        }

        if let Err(e) = process.close().await {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => {
                tracing::error!(error = %e, "failed to stop stay-open exiftool cleanly");
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Whether a live process is held.
    ///
    /// Reports `true` while a call holds the lock.
    pub fn is_running(&self) -> bool {
        match self.state.try_lock() {
            Ok(state) => state.process.as_ref().is_some_and(|p| p.is_running()),
            Err(_) => true,
        }
    }
}

/// One write, flush and read cycle over a framed batch.
async fn exchange(
    process: &mut dyn CommandProcess,
    batch: &[String],
    handler: Option<&mut dyn OutputHandler>,
) -> Result<String> {
    process.write(batch).await?;
    process.flush().await?;
    let output = process.read(handler).await?;

    // EOF before {ready}: the process went away mid-response.
    if !process.is_running() {
        let stderr = process.recent_stderr();
        if !stderr.is_empty() {
            tracing::error!(stderr = %stderr.join("\n"), "exiftool stderr before exit");
        }
        return Err(Error::StreamClosed);
    }
    Ok(output)
}

impl Default for StayOpenStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StayOpenStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StayOpenStrategy")
            .field("running", &self.is_running())
            .finish()
    }
}

use crate::handler::OutputHandler;
use crate::process::{Command, CommandExecutor};
use crate::version::Version;
use crate::{Error, Result};

/// Spawns a fresh ExifTool process for every call.
///
/// Nothing is carried over between calls, so concurrent calls are fine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleStrategy;

impl SimpleStrategy {
    /// One-shot execution works with every version.
    pub fn supports(_version: &Version) -> bool {
        true
    }

    /// Run `program args...` to completion.
    ///
    /// ExifTool exits non-zero for per-file problems while still printing
    /// results, so stdout is returned whatever the exit status and the
    /// failure is logged. Only an unsuccessful exit with nothing on stdout
    /// fails, with [`Error::ToolFailed`].
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

        let command = Command::new(program).args(args.iter().cloned());
        let result = executor.execute(&command).await?;

        if !result.is_success() {
            let stderr = result.stderr.trim_end();
            if result.stdout.trim().is_empty() {
                tracing::debug!(exit_code = ?result.exit_code, stderr, "exiftool failed");
                return Err(Error::ToolFailed {
                    exit_code: result.exit_code,
                    stderr: stderr.to_string(),
                });
            }
            tracing::warn!(
                exit_code = ?result.exit_code,
                stderr,
                "exiftool exited unsuccessfully, returning its output"
            );
        }

        Ok(super::collect_lines(result.stdout.lines(), handler))
    }
}

//! High-level ExifTool handle.
//!
//! This module provides [`ExifTool`], the main entry point of the crate.
//!
//! # Example
//!
//! ```ignore
//! use libexiftool::{ExifTool, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let exiftool = ExifTool::builder().stay_open(true).build().await?;
//!     println!("exiftool {:?}", exiftool.version());
//!
//!     let tags: serde_json::Value = exiftool.read_json("photo.jpg", &[]).await?;
//!     println!("{tags:#}");
//!
//!     exiftool.close().await
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::{Charset, ExifToolConfig, ExifToolConfigBuilder, Feature};
use crate::handler::{OutputHandler, RawOutputHandler};
use crate::process::{CommandExecutor, DefaultExecutor, VERSION_ARG};
use crate::session::Session;
use crate::strategy::{ExecutionStrategy, SimpleStrategy};
use crate::version::Version;
use crate::{Error, ErrorKind, Result};

/// A handle to an ExifTool install.
///
/// Building an `ExifTool` runs `exiftool -ver` once. The reported version
/// decides, for the lifetime of the handle, whether calls go through a
/// stay-open process or spawn ExifTool each time.
///
/// # Thread Safety
///
/// `ExifTool` is `Send + Sync`; share it behind an `Arc` to use it from
/// several tasks.
pub struct ExifTool {
    config: Arc<ExifToolConfig>,
    version: Option<Version>,
    session: Session,
}

impl ExifTool {
    /// Create a handle with default configuration.
    ///
    /// Uses `$EXIFTOOL_PATH` or `exiftool` from `PATH`, one-shot execution.
    pub async fn new() -> Result<Self> {
        Self::builder().build().await
    }

    pub fn builder() -> ExifToolBuilder {
        ExifToolBuilder::new()
    }

    /// Create a handle that spawns ExifTool with the given configuration.
    pub async fn with_config(config: ExifToolConfig) -> Result<Self> {
        let executor = Arc::new(DefaultExecutor::from_config(&config));
        Self::with_executor(config, executor).await
    }

    /// Create a handle that runs every command through `executor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExecutableNotFound`] if the version probe cannot
    /// start ExifTool. Other probe failures only disable stay-open mode.
    pub async fn with_executor(
        config: ExifToolConfig,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self> {
        let version = probe_version(executor.as_ref(), config.path()).await?;
        let strategy =
            ExecutionStrategy::select(config.has_feature(Feature::StayOpen), version.as_ref());
        let session = Session::new(executor, config.path(), strategy);

        Ok(Self {
            config: Arc::new(config),
            version,
            session,
        })
    }

    /// Version reported by `exiftool -ver`, if it could be parsed.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Whether calls go through a stay-open process.
    pub fn is_stay_open(&self) -> bool {
        self.session.is_stay_open()
    }

    pub fn config(&self) -> &ExifToolConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run ExifTool with `args` and return its output.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let args = vec!["-S".to_string(), "-Make".to_string(), "a.jpg".to_string()];
    /// let output = exiftool.run(&args).await?;
    /// ```
    pub async fn run(&self, args: &[String]) -> Result<String> {
        self.session.run(args).await
    }

    /// Run ExifTool with `args`, also feeding every output line to `handler`.
    pub async fn run_with_handler(
        &self,
        args: &[String],
        handler: &mut dyn OutputHandler,
    ) -> Result<String> {
        self.session.run_with_handler(args, handler).await
    }

    /// Run ExifTool and return its output exactly as collected line by line.
    pub async fn raw_output(&self, args: &[String]) -> Result<String> {
        let mut raw = RawOutputHandler::new();
        self.session.run_with_handler(args, &mut raw).await?;
        Ok(raw.into_output())
    }

    /// Run ExifTool with `args` against one file.
    ///
    /// The file is checked before anything is sent to ExifTool; its absolute
    /// path is appended after `args`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnreadableFile`] if `file` is missing, not a regular
    /// file or cannot be opened.
    pub async fn read_file(&self, file: impl AsRef<Path>, args: &[String]) -> Result<String> {
        let path = check_readable(file.as_ref()).await?;

        let mut args = args.to_vec();
        args.push(path.to_string_lossy().into_owned());
        self.session.run(&args).await
    }

    /// Read one file's tags as JSON.
    ///
    /// Adds `-j` unless `args` already request JSON output.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let tags: Vec<serde_json::Value> = exiftool
    ///     .read_json("photo.jpg", &["-n".to_string()])
    ///     .await?;
    /// ```
    pub async fn read_json<T: DeserializeOwned>(
        &self,
        file: impl AsRef<Path>,
        args: &[String],
    ) -> Result<T> {
        let args = with_json_flag(args);
        let output = self.read_file(file, &args).await?;
        serde_json::from_str(&output).map_err(|e| Error::json_parse(e, &output))
    }

    /// Close the handle and any stay-open process.
    ///
    /// Idempotent: only the first call can fail.
    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }

    /// Whether a stay-open process is currently alive.
    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }
}

impl fmt::Debug for ExifTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExifTool")
            .field("config", &self.config)
            .field("version", &self.version)
            .field("session", &self.session)
            .finish()
    }
}

/// Ask ExifTool for its version with a one-shot `-ver`.
///
/// Only a missing or unstartable executable is an error; anything else yields
/// `None`, which rules out stay-open mode.
async fn probe_version(executor: &dyn CommandExecutor, program: &str) -> Result<Option<Version>> {
    let args = [VERSION_ARG.to_string()];
    match SimpleStrategy.execute(executor, program, &args, None).await {
        Ok(output) => match Version::parse(&output) {
            Some(version) => {
                tracing::debug!(%version, "detected exiftool version");
                Ok(Some(version))
            }
            None => {
                tracing::warn!(output = %output.trim(), "cannot parse exiftool version");
                Ok(None)
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "exiftool version probe failed");
            Ok(None)
        }
    }
}

/// Check that `path` is a regular file we can open, and make it absolute.
async fn check_readable(path: &Path) -> Result<PathBuf> {
    let unreadable = |source: std::io::Error| Error::UnreadableFile {
        path: path.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(unreadable)?;
    if !metadata.is_file() {
        return Err(unreadable(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    tokio::fs::File::open(path).await.map_err(unreadable)?;

    tokio::fs::canonicalize(path).await.map_err(unreadable)
}

/// `args` with `-j` prepended unless JSON output is already requested.
fn with_json_flag(args: &[String]) -> Vec<String> {
    let wants_json = args.iter().any(|arg| {
        matches!(arg.as_str(), "-j" | "-json") || arg.starts_with("-j=") || arg.starts_with("-json=")
    });
    if wants_json {
        return args.to_vec();
    }
    std::iter::once("-j".to_string())
        .chain(args.iter().cloned())
        .collect()
}

/// Builder for [`ExifTool`].
///
/// This wraps [`ExifToolConfigBuilder`] and builds directly into an
/// [`ExifTool`].
///
/// # Example
///
/// ```ignore
/// let exiftool = ExifTool::builder()
///     .path("/usr/local/bin/exiftool")
///     .stay_open(true)
///     .build()
///     .await?;
/// ```
#[derive(Clone, Default)]
pub struct ExifToolBuilder {
    inner: ExifToolConfigBuilder,
    executor: Option<Arc<dyn CommandExecutor>>,
}

impl ExifToolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the handle and probe the ExifTool version.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The executable cannot be started
    pub async fn build(self) -> Result<ExifTool> {
        let config = self.inner.build()?;
        match self.executor {
            Some(executor) => ExifTool::with_executor(config, executor).await,
            None => ExifTool::with_config(config).await,
        }
    }

    /// Path to the exiftool executable.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner = self.inner.path(path);
        self
    }

    /// Request an optional feature.
    pub fn feature(mut self, feature: Feature) -> Self {
        self.inner = self.inner.feature(feature);
        self
    }

    /// Keep one ExifTool process alive across calls when supported.
    pub fn stay_open(mut self, enabled: bool) -> Self {
        self.inner = self.inner.stay_open(enabled);
        self
    }

    /// Charset used on the subprocess pipes.
    pub fn charset(mut self, charset: Charset) -> Self {
        self.inner = self.inner.charset(charset);
        self
    }

    /// Working directory for the exiftool process.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner = self.inner.working_directory(path);
        self
    }

    /// Add/override environment variable for the subprocess.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner = self.inner.env(key, value);
        self
    }

    /// Don't inherit parent environment.
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inner = self.inner.inherit_env(inherit);
        self
    }

    /// Time to wait for exiftool to exit on close before killing it.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.close_timeout(timeout);
        self
    }

    /// Run commands through a custom executor instead of spawning processes.
    pub fn executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }
}

impl fmt::Debug for ExifToolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExifToolBuilder")
            .field("inner", &self.inner)
            .field("custom_executor", &self.executor.is_some())
            .finish()
    }
}

//! Session configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use libexiftool::config::{Charset, ExifToolConfig, Feature};
//!
//! let config = ExifToolConfig::builder()
//!     .path("/usr/local/bin/exiftool")
//!     .feature(Feature::StayOpen)
//!     .charset(Charset::Utf8)
//!     .build()?;
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use super::options::{Charset, Feature};
use crate::{Error, Result};

/// Environment variable consulted for the executable path when none is set.
pub const ENV_EXIFTOOL_PATH: &str = "EXIFTOOL_PATH";

/// Executable name used when neither the builder nor the environment set one.
pub const DEFAULT_EXIFTOOL: &str = "exiftool";

/// Default time to wait for the subprocess to exit after its pipes close.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for an ExifTool session.
///
/// Use [`ExifToolConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct ExifToolConfig {
    pub(crate) path: String,
    pub(crate) features: HashSet<Feature>,
    pub(crate) charset: Charset,
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,
    pub(crate) close_timeout: Duration,
}

impl ExifToolConfig {
    /// Create a new builder for ExifToolConfig.
    pub fn builder() -> ExifToolConfigBuilder {
        ExifToolConfigBuilder::default()
    }

    /// Path of the exiftool executable.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check whether a feature was requested.
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Charset used on the subprocess pipes.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Get the working directory if set.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_directory.as_ref()
    }

    /// Time to wait for the subprocess to exit on close before killing it.
    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }
}

/// Builder for [`ExifToolConfig`].
#[derive(Debug, Clone)]
pub struct ExifToolConfigBuilder {
    path: Option<String>,
    features: HashSet<Feature>,
    charset: Charset,
    working_directory: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    inherit_env: bool,
    close_timeout: Duration,
}

impl Default for ExifToolConfigBuilder {
    fn default() -> Self {
        Self {
            path: None,
            features: HashSet::new(),
            charset: Charset::default(),
            working_directory: None,
            env_vars: HashMap::new(),
            inherit_env: true,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl ExifToolConfigBuilder {
    /// Set the exiftool executable path.
    ///
    /// Defaults to `$EXIFTOOL_PATH`, then `exiftool` on `PATH`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Request an optional feature.
    ///
    /// Features are only enabled when the discovered version supports them.
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    /// Shorthand for requesting [`Feature::StayOpen`].
    pub fn stay_open(self, enabled: bool) -> Self {
        if enabled {
            self.feature(Feature::StayOpen)
        } else {
            let mut builder = self;
            builder.features.remove(&Feature::StayOpen);
            builder
        }
    }

    /// Set the charset used on the subprocess pipes.
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Set the working directory for the subprocess.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Add an environment variable for the subprocess.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Whether the subprocess inherits the parent environment (default true).
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Time to wait for the subprocess to exit after close before killing it.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Build the configuration.
    ///
    /// This validates:
    /// - The executable path is not empty
    /// - The working directory exists if set
    ///
    /// Note: executable existence is checked when the version is probed.
    pub fn build(self) -> Result<ExifToolConfig> {
        let path = match self.path {
            Some(path) => path,
            None => std::env::var(ENV_EXIFTOOL_PATH)
                .ok()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EXIFTOOL.to_string()),
        };

        if path.trim().is_empty() {
            return Err(Error::InvalidConfig("exiftool path must not be empty".into()));
        }

        if let Some(ref dir) = self.working_directory {
            if !dir.is_dir() {
                return Err(Error::InvalidConfig(format!(
                    "working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(ExifToolConfig {
            path,
            features: self.features,
            charset: self.charset,
            working_directory: self.working_directory,
            env_vars: self.env_vars,
            inherit_env: self.inherit_env,
            close_timeout: self.close_timeout,
        })
    }
}

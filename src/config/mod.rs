//! Configuration for ExifTool sessions.
//!
//! This module provides:
//!
//! - [`ExifToolConfig`] and [`ExifToolConfigBuilder`] for configuring a session
//! - Type-safe options like [`Charset`] and [`Feature`]
//!
//! # Example
//!
//! ```ignore
//! use libexiftool::config::{ExifToolConfig, Feature};
//!
//! let config = ExifToolConfig::builder()
//!     .feature(Feature::StayOpen)
//!     .build()?;
//! ```

pub mod builder;
pub mod options;

pub use builder::{
    ExifToolConfig, ExifToolConfigBuilder, DEFAULT_CLOSE_TIMEOUT, DEFAULT_EXIFTOOL,
    ENV_EXIFTOOL_PATH,
};
pub use options::{Charset, Feature};

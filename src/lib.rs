//! # libexiftool
//!
//! Async Rust driver for the ExifTool command-line program.
//!
//! This library runs ExifTool in one of two modes:
//! - One-shot: spawn `exiftool <args>` for every call
//! - Stay-open: keep one `exiftool -stay_open True -@ -` process alive and
//!   pipe each batch of arguments to it
//!
//! The mode is picked once, from the version ExifTool reports when the handle
//! is built. Stay-open needs ExifTool 8.36 or later.
//!
//! ## Quick Start
//!
//! ```ignore
//! use libexiftool::{ExifTool, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let exiftool = ExifTool::new().await?;
//!     let args = vec!["-S".to_string(), "-Make".to_string()];
//!     let output = exiftool.read_file("photo.jpg", &args).await?;
//!     println!("{}", output);
//!     Ok(())
//! }
//! ```
//!
//! ## Stay-open
//!
//! ```ignore
//! let exiftool = ExifTool::builder().stay_open(true).build().await?;
//! for file in files {
//!     let tags: serde_json::Value = exiftool.read_json(&file, &[]).await?;
//! }
//! exiftool.close().await?;
//! ```
//!
//! ## Output handlers
//!
//! Output is read line by line through [`handler::OutputHandler`]s, which can
//! be combined to inspect a response while it is collected:
//!
//! ```ignore
//! use libexiftool::handler::RawOutputHandler;
//!
//! let mut raw = RawOutputHandler::new();
//! exiftool.run_with_handler(&args, &mut raw).await?;
//! println!("{}", raw.output());
//! ```

mod client;
pub mod config;
mod error;
pub mod handler;
pub mod process;
mod session;
pub mod strategy;
pub mod version;

pub use error::{Error, ErrorKind, Result};

// Re-export the main handle types at crate root
pub use client::{ExifTool, ExifToolBuilder};
pub use session::Session;

// Re-export commonly used config types at crate root
pub use config::{Charset, ExifToolConfig, ExifToolConfigBuilder, Feature};

// Re-export commonly used handler types at crate root
pub use handler::{OutputHandler, RawOutputHandler};

pub use strategy::ExecutionStrategy;
pub use version::Version;

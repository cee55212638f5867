//! Process management for ExifTool.
//!
//! This module spawns ExifTool and talks to it over its standard streams.
//!
//! # Architecture
//!
//! ```text
//! libexiftool                             exiftool
//! ┌────────────────┐                    ┌──────────────┐
//! │ CommandProcess │──stdin (args)─────▶│              │
//! │                │◀─stdout (lines)────│ -stay_open   │
//! │                │◀─stderr────────────│  True -@ -   │
//! └────────────────┘                    └──────────────┘
//! ```
//!
//! # Modes
//!
//! - One-shot: [`CommandExecutor::execute`] runs `exiftool <args>` to
//!   completion and captures its output.
//! - Persistent: [`CommandExecutor::start`] spawns `exiftool -stay_open True
//!   -@ -` and returns a live [`CommandProcess`]. Arguments are then written
//!   one per line, each batch closed by `-execute`, and ExifTool answers with
//!   the batch output followed by a `{ready}` line.

mod command;
mod io;
mod pipe;
mod spawn;

pub use command::{Command, CommandResult};
pub use io::{LineReader, LineWriter, StderrTail};
pub use pipe::{CommandProcess, PipedProcess};
pub use spawn::{CommandExecutor, DefaultExecutor};

/// Argument that ends one batch in stay-open mode.
pub const EXECUTE: &str = "-execute";

/// Arguments that start ExifTool in stay-open mode reading from stdin.
pub const STAY_OPEN_START: [&str; 4] = ["-stay_open", "True", "-@", "-"];

/// Arguments that ask a stay-open ExifTool to exit.
pub const STAY_OPEN_STOP: [&str; 2] = ["-stay_open", "False"];

/// Argument that makes ExifTool print its version.
pub const VERSION_ARG: &str = "-ver";

//! Line-by-line output handlers.
//!
//! A read from an ExifTool process pulls lines from stdout and pushes each one
//! into an [`OutputHandler`]. The handler decides whether more lines are
//! wanted; `None` marks the end of the stream.
//!
//! Handlers never perform I/O, so several of them can share a single pass over
//! the stream through a [`CompositeHandler`]:
//!
//! ```text
//! stdout ──lines──▶ CompositeHandler ──▶ ResultHandler   (caller-visible text)
//!                                    └─▶ RawOutputHandler (side channel)
//! ```
//!
//! Every handler in the crate delegates "is this the end?" to
//! [`StopHandler`], which stops on end-of-stream or on the `{ready}` line that
//! ExifTool prints after each stay-open batch.
//!
//! Closures work as handlers too:
//!
//! ```ignore
//! let mut count = 0;
//! let mut counter = |line: Option<&str>| {
//!     count += 1;
//!     StopHandler.consume(line)
//! };
//! session.run_with_handler(&args, &mut counter).await?;
//! ```

mod collect;
mod composite;
mod stop;

pub use collect::{RawOutputHandler, ResultHandler};
pub use composite::CompositeHandler;
pub use stop::{StopHandler, READY};

/// Consumer of subprocess output lines.
///
/// `consume` receives each line without its line terminator, and `None` once
/// the stream has ended. Return `true` to keep reading, `false` to stop.
pub trait OutputHandler: Send {
    fn consume(&mut self, line: Option<&str>) -> bool;
}

impl<F> OutputHandler for F
where
    F: FnMut(Option<&str>) -> bool + Send,
{
    fn consume(&mut self, line: Option<&str>) -> bool {
        self(line)
    }
}

/// Feed `lines` into `handler`, followed by `None`, until it asks to stop.
///
/// Returns `true` if the handler stopped before the end of the input.
pub fn feed_lines<'a, I>(handler: &mut dyn OutputHandler, lines: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    for line in lines {
        if !handler.consume(Some(line)) {
            return true;
        }
    }
    handler.consume(None);
    false
}

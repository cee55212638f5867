use super::OutputHandler;

/// Line ExifTool prints after completing a batch in stay-open mode.
pub const READY: &str = "{ready}";

/// Stops on end-of-stream or on the [`READY`] line; accepts everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopHandler;

impl StopHandler {
    /// Check whether `line` terminates a response.
    pub fn is_end(line: Option<&str>) -> bool {
        match line {
            None => true,
            Some(line) => line == READY,
        }
    }
}

impl OutputHandler for StopHandler {
    fn consume(&mut self, line: Option<&str>) -> bool {
        !Self::is_end(line)
    }
}

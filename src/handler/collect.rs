use super::{OutputHandler, StopHandler};

/// Accumulates response lines until the end of the response.
///
/// This is the accumulator behind every process read: its text is what a read
/// returns to the caller.
#[derive(Debug, Clone, Default)]
pub struct ResultHandler {
    lines: Vec<String>,
    complete: bool,
}

impl ResultHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines received so far, terminator excluded.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines received so far joined with `\n`.
    pub fn output(&self) -> String {
        self.lines.join("\n")
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Whether the `{ready}` sentinel or the end of stream has been seen.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl OutputHandler for ResultHandler {
    fn consume(&mut self, line: Option<&str>) -> bool {
        match line {
            Some(line) if !StopHandler::is_end(Some(line)) => {
                self.lines.push(line.to_string());
                true
            }
            _ => {
                self.complete = true;
                false
            }
        }
    }
}

/// Collects the raw text of a response.
///
/// Lines are appended as they arrive, separated by the configured separator,
/// until [`StopHandler`] sees the end of the response. The terminator itself is
/// never part of the output.
#[derive(Debug, Clone)]
pub struct RawOutputHandler {
    output: String,
    separator: String,
    started: bool,
}

impl RawOutputHandler {
    /// Create a collector joining lines with `\n`.
    pub fn new() -> Self {
        Self::with_separator("\n")
    }

    /// Create a collector joining lines with `separator`.
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            output: String::new(),
            separator: separator.into(),
            started: false,
        }
    }

    /// Text collected so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

impl Default for RawOutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputHandler for RawOutputHandler {
    fn consume(&mut self, line: Option<&str>) -> bool {
        if !StopHandler.consume(line) {
            return false;
        }
        let Some(line) = line else {
            return false;
        };

        // An empty first line still counts, so track it separately from the buffer.
        if self.started {
            self.output.push_str(&self.separator);
        }
        self.output.push_str(line);
        self.started = true;
        true
    }
}

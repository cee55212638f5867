use super::OutputHandler;

/// Fans each line out to several handlers.
///
/// Every child sees every line, including the line on which some child asks
/// to stop; there is no short-circuit. The composite keeps reading only while
/// all children want more. Composites can be nested.
#[derive(Default)]
pub struct CompositeHandler<'a> {
    handlers: Vec<&'a mut dyn OutputHandler>,
}

impl<'a> CompositeHandler<'a> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler; lines are delivered in insertion order.
    pub fn with(mut self, handler: &'a mut dyn OutputHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn push(&mut self, handler: &'a mut dyn OutputHandler) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl OutputHandler for CompositeHandler<'_> {
    fn consume(&mut self, line: Option<&str>) -> bool {
        let mut more = true;
        for handler in self.handlers.iter_mut() {
            more &= handler.consume(line);
        }
        more
    }
}

impl std::fmt::Debug for CompositeHandler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeHandler")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

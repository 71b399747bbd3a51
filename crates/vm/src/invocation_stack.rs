use crate::errors::{VmError, VmResult};
use crate::execution_context::ExecutionContext;
use crate::stack_item::ItemCounter;

/// Call stack of frames. The last frame is the one executing.
#[derive(Debug)]
pub struct InvocationStack {
    frames: Vec<ExecutionContext>,
    max_depth: usize,
}

impl InvocationStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Pushes a frame, refusing to grow past the configured depth.
    pub fn push(&mut self, context: ExecutionContext) -> VmResult<()> {
        if self.frames.len() >= self.max_depth {
            return Err(VmError::InvocationDepthExceeded {
                limit: self.max_depth,
            });
        }
        self.frames.push(context);
        Ok(())
    }

    pub fn pop(&mut self) -> VmResult<ExecutionContext> {
        self.frames.pop().ok_or(VmError::NoContext)
    }

    pub fn current(&self) -> VmResult<&ExecutionContext> {
        self.frames.last().ok_or(VmError::NoContext)
    }

    pub fn current_mut(&mut self) -> VmResult<&mut ExecutionContext> {
        self.frames.last_mut().ok_or(VmError::NoContext)
    }

    /// The frame that invoked the current one, if any.
    pub fn calling(&self) -> Option<&ExecutionContext> {
        let len = self.frames.len();
        if len < 2 {
            return None;
        }
        self.frames.get(len - 2)
    }

    /// The outermost frame.
    pub fn entry(&self) -> Option<&ExecutionContext> {
        self.frames.first()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Items reachable from every frame.
    pub fn count_items(&self, counter: &mut ItemCounter) {
        for frame in &self.frames {
            frame.count_items(counter);
        }
    }
}

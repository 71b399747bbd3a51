use std::cell::RefCell;
use std::rc::Rc;

use types::UInt160;

use crate::errors::{VmError, VmResult};
use crate::script::Script;
use crate::stack_item::{ItemCounter, StackItem};

/// Fixed-size variable slot (locals, arguments or statics).
#[derive(Debug, Clone)]
pub struct Slot {
    items: Vec<StackItem>,
}

impl Slot {
    /// Every variable starts out as `false`, the VM's null value.
    pub fn new(count: usize) -> Self {
        Self {
            items: vec![StackItem::Boolean(false); count],
        }
    }

    pub fn from_items(items: Vec<StackItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> VmResult<StackItem> {
        self.items
            .get(index)
            .cloned()
            .ok_or(VmError::SlotOutOfRange { index, len: self.items.len() })
    }

    pub fn set(&mut self, index: usize, item: StackItem) -> VmResult<()> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(VmError::SlotOutOfRange { index, len })?;
        *slot = item;
        Ok(())
    }
}

/// One invocation frame.
///
/// EDUCATIONAL PURPOSE: A frame is everything one level of a call needs:
/// the code it runs, where it is in that code, and the stacks and slots it
/// works on. `CALL` within a script creates a new frame over the same code
/// (sharing the static slot); `APPCALL` creates one over another contract's
/// code with fresh statics.
///
/// STACKS:
/// - The evaluation stack is where opcodes take operands from and put results.
/// - The alt stack is a side stack for `TOALTSTACK`/`FROMALTSTACK` shuffling.
///
/// Every stack access is checked; reaching below the bottom is a
/// [`VmError::StackUnderflow`] that FAULTs the engine.
#[derive(Debug)]
pub struct ExecutionContext {
    script: Script,
    instruction_pointer: usize,
    evaluation_stack: Vec<StackItem>,
    alt_stack: Vec<StackItem>,
    locals: Option<Slot>,
    arguments: Option<Slot>,
    statics: Rc<RefCell<Option<Slot>>>,
    pending_exception: bool,
}

impl ExecutionContext {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            instruction_pointer: 0,
            evaluation_stack: Vec::new(),
            alt_stack: Vec::new(),
            locals: None,
            arguments: None,
            statics: Rc::new(RefCell::new(None)),
            pending_exception: false,
        }
    }

    /// Frame for an intra-script `CALL`: same code, same statics, fresh
    /// stacks, starting at `target`.
    pub fn new_call(&self, target: usize) -> Self {
        Self {
            script: self.script.clone(),
            instruction_pointer: target,
            evaluation_stack: Vec::new(),
            alt_stack: Vec::new(),
            locals: None,
            arguments: None,
            statics: Rc::clone(&self.statics),
            pending_exception: false,
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn script_hash(&self) -> UInt160 {
        self.script.hash()
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    pub fn set_instruction_pointer(&mut self, ip: usize) {
        self.instruction_pointer = ip;
    }

    /// Moves the instruction pointer to `target`. The end of the script is a
    /// valid target (it decodes as `RET`); anything past it or below zero
    /// is [`VmError::InvalidJump`].
    pub fn jump(&mut self, target: i64) -> VmResult<()> {
        let len = self.script.len();
        if target < 0 || target > len as i64 {
            return Err(VmError::InvalidJump { target, len });
        }
        self.instruction_pointer = target as usize;
        Ok(())
    }

    // ===== Evaluation stack =====

    pub fn push(&mut self, item: StackItem) {
        self.evaluation_stack.push(item);
    }

    pub fn pop(&mut self) -> VmResult<StackItem> {
        self.evaluation_stack.pop().ok_or(VmError::StackUnderflow)
    }

    /// Item `n` positions below the top (0 = top).
    pub fn peek(&self, n: usize) -> VmResult<&StackItem> {
        let len = self.evaluation_stack.len();
        if n >= len {
            return Err(VmError::StackUnderflow);
        }
        Ok(&self.evaluation_stack[len - 1 - n])
    }

    pub fn remove(&mut self, n: usize) -> VmResult<StackItem> {
        let len = self.evaluation_stack.len();
        if n >= len {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.evaluation_stack.remove(len - 1 - n))
    }

    /// Inserts so that `item` ends up `n` positions below the top.
    pub fn insert(&mut self, n: usize, item: StackItem) -> VmResult<()> {
        let len = self.evaluation_stack.len();
        if n > len {
            return Err(VmError::StackUnderflow);
        }
        self.evaluation_stack.insert(len - n, item);
        Ok(())
    }

    /// Swaps the top item with the one `n` positions below it.
    pub fn swap(&mut self, n: usize) -> VmResult<()> {
        let len = self.evaluation_stack.len();
        if n >= len {
            return Err(VmError::StackUnderflow);
        }
        self.evaluation_stack.swap(len - 1, len - 1 - n);
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.evaluation_stack.len()
    }

    pub fn evaluation_stack(&self) -> &[StackItem] {
        &self.evaluation_stack
    }

    /// Drains the evaluation stack bottom-first, for hand-over on call and return.
    pub fn take_evaluation_stack(&mut self) -> Vec<StackItem> {
        std::mem::take(&mut self.evaluation_stack)
    }

    pub fn extend_evaluation_stack(&mut self, items: Vec<StackItem>) {
        self.evaluation_stack.extend(items);
    }

    // ===== Alt stack =====

    pub fn alt_push(&mut self, item: StackItem) {
        self.alt_stack.push(item);
    }

    pub fn alt_pop(&mut self) -> VmResult<StackItem> {
        self.alt_stack.pop().ok_or(VmError::StackUnderflow)
    }

    pub fn alt_peek(&self) -> VmResult<&StackItem> {
        self.alt_stack.last().ok_or(VmError::StackUnderflow)
    }

    /// Adds everything this frame holds: both stacks, its slots and, on the
    /// first frame sharing them, the statics.
    pub fn count_items(&self, counter: &mut ItemCounter) {
        counter.add_all(self.evaluation_stack.iter().chain(self.alt_stack.iter()));
        for slot in [&self.locals, &self.arguments].into_iter().flatten() {
            counter.add_all(slot.items.iter());
        }
        if counter.first_visit(Rc::as_ptr(&self.statics)) {
            if let Some(statics) = self.statics.borrow().as_ref() {
                counter.add_all(statics.items.iter());
            }
        }
    }

    // ===== Slots =====

    pub fn init_static_slot(&mut self, count: usize) -> VmResult<()> {
        let mut statics = self.statics.borrow_mut();
        if statics.is_some() {
            return Err(VmError::InvalidOperation("static slot already initialized"));
        }
        *statics = Some(Slot::new(count));
        Ok(())
    }

    /// Creates the local slot and moves the top `args` items into the argument
    /// slot, top item first.
    pub fn init_slots(&mut self, locals: usize, args: usize) -> VmResult<()> {
        if self.locals.is_some() || self.arguments.is_some() {
            return Err(VmError::InvalidOperation("slots already initialized"));
        }
        if locals > 0 {
            self.locals = Some(Slot::new(locals));
        }
        if args > 0 {
            let mut items = Vec::with_capacity(args);
            for _ in 0..args {
                items.push(self.pop()?);
            }
            self.arguments = Some(Slot::from_items(items));
        }
        Ok(())
    }

    pub fn load_static(&self, index: usize) -> VmResult<StackItem> {
        self.statics
            .borrow()
            .as_ref()
            .ok_or(VmError::SlotNotInitialized)?
            .get(index)
    }

    pub fn store_static(&mut self, index: usize, item: StackItem) -> VmResult<()> {
        self.statics
            .borrow_mut()
            .as_mut()
            .ok_or(VmError::SlotNotInitialized)?
            .set(index, item)
    }

    pub fn load_local(&self, index: usize) -> VmResult<StackItem> {
        self.locals.as_ref().ok_or(VmError::SlotNotInitialized)?.get(index)
    }

    pub fn store_local(&mut self, index: usize, item: StackItem) -> VmResult<()> {
        self.locals
            .as_mut()
            .ok_or(VmError::SlotNotInitialized)?
            .set(index, item)
    }

    pub fn load_argument(&self, index: usize) -> VmResult<StackItem> {
        self.arguments.as_ref().ok_or(VmError::SlotNotInitialized)?.get(index)
    }

    pub fn store_argument(&mut self, index: usize, item: StackItem) -> VmResult<()> {
        self.arguments
            .as_mut()
            .ok_or(VmError::SlotNotInitialized)?
            .set(index, item)
    }

    // ===== Exceptions =====

    pub fn set_pending_exception(&mut self) {
        self.pending_exception = true;
    }

    pub fn has_pending_exception(&self) -> bool {
        self.pending_exception
    }
}

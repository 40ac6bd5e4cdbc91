use std::collections::HashMap;

use crate::error::RuntimeError;
use crate::instruction::Value;

/// Evaluation stack and sparse heap of one run.
///
/// Every fallible operation checks first and mutates second, so an `Err`
/// leaves the stack exactly as it was. Picking a fallback value (0 for a
/// failed pop) is the runner's job, because it depends on the error policy.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    stack: Vec<Value>,
    heap: HashMap<Value, Value>,
}

impl Memory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(stack_size: usize) -> Self {
        Self {
            stack: Vec::with_capacity(stack_size),
            heap: HashMap::new(),
        }
    }

    /// Returns the active stack, bottom first.
    #[must_use]
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Top of the stack without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<Value> {
        self.stack.last().copied()
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn duplicate(&mut self) -> Result<(), RuntimeError> {
        let top = self.peek().ok_or(RuntimeError::StackUnderflow)?;
        self.stack.push(top);
        Ok(())
    }

    /// Push a copy of the n-th item from the top (0-indexed).
    pub fn copy(&mut self, n: Value) -> Result<(), RuntimeError> {
        let len = self.stack.len();
        let value = usize::try_from(n)
            .ok()
            .filter(|&n| n < len)
            .map(|n| self.stack[len - 1 - n])
            .ok_or(RuntimeError::InvalidCopy { n, len })?;
        self.stack.push(value);
        Ok(())
    }

    pub fn swap(&mut self) -> Result<(), RuntimeError> {
        let len = self.stack.len();
        if len < 2 {
            return Err(RuntimeError::SwapUnderflow { len });
        }
        self.stack.swap(len - 1, len - 2);
        Ok(())
    }

    pub fn discard(&mut self) -> Result<(), RuntimeError> {
        self.pop().map(drop)
    }

    /// Keep the top item and drop the `n` items beneath it.
    pub fn slide(&mut self, n: Value) -> Result<(), RuntimeError> {
        let len = self.stack.len();
        let count = usize::try_from(n)
            .ok()
            .filter(|&n| len > 0 && n < len)
            .ok_or(RuntimeError::InvalidSlide { n, len })?;
        let top = len - 1;
        self.stack.drain(top - count..top);
        Ok(())
    }

    pub fn heap_store(&mut self, address: Value, value: Value) {
        self.heap.insert(address, value);
    }

    /// Value stored at `address`, or 0 if it was never written.
    #[must_use]
    pub fn heap_retrieve(&self, address: Value) -> Value {
        self.heap.get(&address).copied().unwrap_or(0)
    }

    /// Number of heap cells that have been written.
    #[must_use]
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }
}

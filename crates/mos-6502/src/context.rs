//! Per-instruction execution state.

use log::warn;

/// Maximum nesting of live instruction contexts.
///
/// Interrupts are only accepted between instructions, so hardware never
/// nests deeper than one. The extra slots keep a stray push from
/// overwriting the live context.
pub const CONTEXT_CAPACITY: usize = 4;

/// State for one instruction (or interrupt sequence) while it executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionContext {
    /// Opcode being executed. Values above $FF are interrupt pseudo-ops.
    pub opcode: u16,
    /// Effective address (or its low byte while it is being assembled).
    pub address: u16,
    /// Secondary address: page-corrected target, branch target or vector.
    pub target: u16,
    /// Data latch for read-modify-write and indirect jumps.
    pub operand: u8,
    /// Zero-page pointer for indexed-indirect modes.
    pub pointer: u8,
    /// Cycle within the instruction. The opcode fetch is cycle 1.
    pub cycle: u8,
    /// Index of the next micro-op to run.
    pub step: u8,
    /// Indexing carried into the high byte.
    pub page_crossed: bool,
}

impl ExecutionContext {
    /// Context for an instruction whose opcode fetch has just happened.
    #[must_use]
    pub const fn new(opcode: u16) -> Self {
        Self {
            opcode,
            address: 0,
            target: 0,
            operand: 0,
            pointer: 0,
            cycle: 1,
            step: 0,
            page_crossed: false,
        }
    }
}

/// Fixed-capacity stack of execution contexts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextStack {
    slots: [ExecutionContext; CONTEXT_CAPACITY],
    depth: usize,
}

impl ContextStack {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [ExecutionContext::new(0); CONTEXT_CAPACITY],
            depth: 0,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Push a context. When the stack is full the newest slot is replaced.
    pub fn push(&mut self, context: ExecutionContext) {
        if self.depth == CONTEXT_CAPACITY {
            warn!(
                "context stack full, replacing opcode ${:03X}",
                self.slots[CONTEXT_CAPACITY - 1].opcode
            );
            self.slots[CONTEXT_CAPACITY - 1] = context;
            return;
        }
        self.slots[self.depth] = context;
        self.depth += 1;
    }

    /// Remove the innermost context.
    pub fn pop(&mut self) -> Option<ExecutionContext> {
        if self.depth == 0 {
            return None;
        }
        self.depth -= 1;
        Some(self.slots[self.depth])
    }

    #[must_use]
    pub fn top(&self) -> Option<&ExecutionContext> {
        self.depth.checked_sub(1).map(|i| &self.slots[i])
    }

    /// The innermost context. On an empty stack this is the bottom slot,
    /// which holds no live instruction, so micro-ops never need to unwrap.
    pub fn top_mut(&mut self) -> &mut ExecutionContext {
        &mut self.slots[self.depth.saturating_sub(1)]
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

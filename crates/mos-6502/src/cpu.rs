//! The execution engine.
//!
//! Each `tick()` performs exactly one bus access. The engine keeps a small
//! stack of execution contexts: an empty stack means the next tick fetches
//! an opcode (or starts an interrupt sequence), otherwise it runs the next
//! micro-op of the innermost context.

use std::fmt;

use emu_core::{Bus, Cpu, Observable, Value};
use log::{debug, warn};

use crate::context::{ContextStack, ExecutionContext};
use crate::flags::{C, D, I, N, V, Z};
use crate::instructions::{IRQ_OPCODE, Instruction, NMI_OPCODE, TABLE_SIZE, instruction_table};
use crate::ops::RESET_VECTOR;
use crate::Registers;

/// Address read on every cycle once the CPU has jammed.
const JAM_BUS_ADDRESS: u16 = 0xFFFF;

/// The 2A03 CPU core.
pub struct Mos6502 {
    /// CPU registers.
    pub regs: Registers,

    pub(crate) contexts: ContextStack,

    /// Latched NMI edge, serviced at the next instruction boundary.
    pub(crate) nmi_pending: bool,

    /// The last two samples of the NMI input, oldest first.
    nmi_history: [bool; 2],

    nmi_line: bool,
    irq_line: bool,
    jammed: bool,
    total_cycles: u64,
    table: &'static [Instruction; TABLE_SIZE],
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mos6502 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mos6502")
            .field("regs", &self.regs)
            .field("contexts", &self.contexts)
            .field("nmi_pending", &self.nmi_pending)
            .field("nmi_line", &self.nmi_line)
            .field("irq_line", &self.irq_line)
            .field("jammed", &self.jammed)
            .field("total_cycles", &self.total_cycles)
            .finish_non_exhaustive()
    }
}

impl Mos6502 {
    /// A CPU with power-on registers. PC is zero until a reset loads the
    /// vector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            contexts: ContextStack::new(),
            nmi_pending: false,
            nmi_history: [false; 2],
            nmi_line: false,
            irq_line: false,
            jammed: false,
            total_cycles: 0,
            table: instruction_table(),
        }
    }

    /// True between instructions: the next tick fetches an opcode or
    /// starts an interrupt sequence.
    #[must_use]
    pub fn is_instruction_complete(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Cycles executed since the last cold reset.
    #[must_use]
    pub const fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Opcode of the instruction in flight. Interrupt sequences report
    /// $100 (NMI) and $101 (IRQ).
    #[must_use]
    pub fn current_opcode(&self) -> Option<u16> {
        self.contexts.top().map(|ctx| ctx.opcode)
    }

    #[must_use]
    pub fn context_depth(&self) -> usize {
        self.contexts.len()
    }

    /// An NMI edge has been seen but not yet serviced.
    #[must_use]
    pub const fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    pub(crate) fn enter_jam(&mut self) {
        self.jammed = true;
        warn!(
            "CPU jammed at ${:04X} (opcode ${:03X})",
            self.regs.pc.wrapping_sub(1),
            self.current_opcode().unwrap_or_default()
        );
    }

    /// Execute one CPU cycle.
    fn execute_cycle(&mut self, bus: &mut dyn Bus) {
        self.total_cycles += 1;
        self.sample_nmi();

        if self.jammed {
            let _ = bus.read(JAM_BUS_ADDRESS);
            return;
        }

        if self.contexts.is_empty() {
            self.begin_instruction(bus);
            return;
        }

        let depth = self.contexts.len();
        let table = self.table;
        let ctx = self.contexts.top_mut();
        let entry = &table[usize::from(ctx.opcode)];
        let step = ctx.step;
        if step >= entry.len {
            // Every path that exhausts a sequence pops it below.
            warn!("context for ${:03X} ran past its sequence", ctx.opcode);
            self.contexts.pop();
            return;
        }
        ctx.step += 1;
        ctx.cycle += 1;

        (entry.micro_ops[usize::from(step)])(self, bus);

        if self.jammed || self.contexts.len() != depth {
            return;
        }
        if let Some(top) = self.contexts.top() {
            if top.step >= table[usize::from(top.opcode)].len {
                self.contexts.pop();
            }
        }
    }

    /// Instruction boundary: service a pending NMI, then a level IRQ,
    /// otherwise fetch the next opcode.
    fn begin_instruction(&mut self, bus: &mut dyn Bus) {
        if self.nmi_pending {
            self.nmi_pending = false;
            let _ = bus.read(self.regs.pc);
            self.contexts.push(ExecutionContext::new(NMI_OPCODE));
            return;
        }
        if self.irq_line && !self.regs.p.is_set(I) {
            let _ = bus.read(self.regs.pc);
            self.contexts.push(ExecutionContext::new(IRQ_OPCODE));
            return;
        }
        let opcode = self.regs.fetch(bus);
        self.contexts.push(ExecutionContext::new(u16::from(opcode)));
    }

    /// The NMI input is edge-triggered: only a change from released to
    /// asserted latches a request.
    fn sample_nmi(&mut self) {
        let previous = self.nmi_history[1];
        self.nmi_history = [previous, self.nmi_line];
        if !previous && self.nmi_line {
            self.nmi_pending = true;
        }
    }

    /// Drop any instruction in flight and the interrupt latches. The line
    /// history is primed with the current input so a held line does not
    /// count as a fresh edge.
    fn clear_execution(&mut self) {
        self.contexts.clear();
        self.jammed = false;
        self.nmi_pending = false;
        self.nmi_history = [self.nmi_line; 2];
    }

    fn load_reset_vector(&mut self, bus: &mut dyn Bus) {
        let lo = bus.read(RESET_VECTOR);
        let hi = bus.read(RESET_VECTOR.wrapping_add(1));
        self.regs.pc = u16::from_le_bytes([lo, hi]);
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl Cpu for Mos6502 {
    type Registers = Registers;

    fn tick<B: Bus>(&mut self, bus: &mut B) {
        self.execute_cycle(bus);
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.jammed
    }

    fn set_nmi_line(&mut self, asserted: bool) {
        self.nmi_line = asserted;
    }

    fn set_irq_line(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// Registers return to the power-on image and PC is loaded from
    /// $FFFC. The vector reads are not counted as cycles.
    fn reset_to_known<B: Bus>(&mut self, bus: &mut B) {
        self.regs = Registers::new();
        self.clear_execution();
        self.total_cycles = 0;
        self.load_reset_vector(bus);
        debug!("CPU cold reset, PC=${:04X}", self.regs.pc);
    }

    /// The reset line behaves like an interrupt whose pushes are turned
    /// into reads: S drops by three and I is set, everything else survives.
    fn reset_analog<B: Bus>(&mut self, bus: &mut B) {
        self.regs.s = self.regs.s.wrapping_sub(3);
        self.regs.p.set(I);
        self.clear_execution();
        self.load_reset_vector(bus);
        debug!("CPU warm reset, PC=${:04X}", self.regs.pc);
    }
}

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "s" | "sp" => Some(self.regs.s.into()),
            "p" | "status" => Some(self.regs.p.0.into()),
            "flags.c" | "c" => Some(self.regs.p.is_set(C).into()),
            "flags.z" | "z" => Some(self.regs.p.is_set(Z).into()),
            "flags.i" | "i" => Some(self.regs.p.is_set(I).into()),
            "flags.d" | "d" => Some(self.regs.p.is_set(D).into()),
            "flags.v" | "v" => Some(self.regs.p.is_set(V).into()),
            "flags.n" | "n" => Some(self.regs.p.is_set(N).into()),
            "cycle" => Some(Value::U64(self.total_cycles)),
            "halted" => Some(self.jammed.into()),
            "opcode" => Some(self.current_opcode().unwrap_or_default().into()),
            "depth" => Some(Value::U64(self.context_depth() as u64)),
            "nmi_pending" => Some(self.nmi_pending.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc",
            "a",
            "x",
            "y",
            "s",
            "p",
            "flags.c",
            "flags.z",
            "flags.i",
            "flags.d",
            "flags.v",
            "flags.n",
            "cycle",
            "halted",
            "opcode",
            "depth",
            "nmi_pending",
        ]
    }
}

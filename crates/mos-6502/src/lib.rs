//! Cycle-accurate Ricoh 2A03 CPU core.
//!
//! The 2A03 is an NMOS 6502 with the decimal adder disconnected. Every
//! opcode, documented or not, is decoded into a short list of per-cycle
//! handlers, and each `tick()` runs exactly one of them.

mod context;
mod cpu;
pub mod flags;
mod instructions;
mod micro_ops;
mod ops;
mod registers;

pub use context::{CONTEXT_CAPACITY, ExecutionContext};
pub use cpu::Mos6502;
pub use flags::Status;
pub use instructions::{
    AddressingMode, IRQ_OPCODE, Instruction, MAX_MICRO_OPS, Mnemonic, NMI_OPCODE, TABLE_SIZE,
    disassemble, instruction, instruction_table,
};
pub use micro_ops::MicroOp;
pub use ops::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR, UNSTABLE_MAGIC};
pub use registers::Registers;

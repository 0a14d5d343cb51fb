//! Per-cycle handlers.
//!
//! Each handler performs exactly one bus access. Handlers are specialised
//! by position and addressing mode when the instruction table is built, so
//! none of them inspect the addressing mode at run time. Optional cycles
//! are subtractive: a handler that finds no page crossing (or an untaken
//! branch) calls [`finish`] and the remaining slots never run.

use emu_core::Bus;
use log::trace;

use crate::Mos6502;
use crate::context::ExecutionContext;
use crate::ops::{
    ImpliedOp, Index, InterruptKind, ModifyOp, NMI_VECTOR, PullOp, ReadOp, StoreOp,
    UnstableStore,
};

/// One cycle of work.
pub type MicroOp = fn(&mut Mos6502, &mut dyn Bus);

/// End the current instruction early.
fn finish(cpu: &mut Mos6502) {
    cpu.contexts.pop();
}

fn ctx(cpu: &mut Mos6502) -> &mut ExecutionContext {
    cpu.contexts.top_mut()
}

/// Record `base + index` in the context: `address` gets the uncorrected
/// address the CPU puts on the bus first, `target` the real one.
fn index_address(ctx: &mut ExecutionContext, base: u16, index: u8) {
    let target = base.wrapping_add(u16::from(index));
    ctx.target = target;
    ctx.address = (base & 0xFF00) | (target & 0x00FF);
    ctx.page_crossed = (base ^ target) & 0xFF00 != 0;
}

// ---------------------------------------------------------------------------
// Single-cycle instructions
// ---------------------------------------------------------------------------

/// Dummy read of PC. Also fills unused table slots.
pub(crate) fn idle(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = bus.read(cpu.regs.pc);
}

/// Read and discard the byte at PC, advancing PC (BRK's padding byte).
pub(crate) fn skip_byte(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = cpu.regs.fetch(bus);
}

pub(crate) fn immediate<O: ReadOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let value = cpu.regs.fetch(bus);
    O::execute(&mut cpu.regs, value);
}

pub(crate) fn implied<O: ImpliedOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = bus.read(cpu.regs.pc);
    O::execute(&mut cpu.regs);
}

pub(crate) fn accumulator<O: ModifyOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = bus.read(cpu.regs.pc);
    let a = cpu.regs.a;
    cpu.regs.a = O::execute(&mut cpu.regs, a);
}

// ---------------------------------------------------------------------------
// Address formation
// ---------------------------------------------------------------------------

/// Fetch the zero-page address, or the low byte of an absolute address.
pub(crate) fn address_lo(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let lo = cpu.regs.fetch(bus);
    ctx(cpu).address = u16::from(lo);
}

pub(crate) fn address_hi(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let hi = cpu.regs.fetch(bus);
    ctx(cpu).address |= u16::from(hi) << 8;
}

/// Fetch the high byte and add the index register.
pub(crate) fn address_hi_indexed<I: Index>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let hi = cpu.regs.fetch(bus);
    let index = I::get(&cpu.regs);
    let ctx = cpu.contexts.top_mut();
    let base = (u16::from(hi) << 8) | ctx.address;
    index_address(ctx, base, index);
}

/// Zero-page indexing: dummy read of the base, then wrap within page 0.
pub(crate) fn zero_page_indexed<I: Index>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let index = I::get(&cpu.regs);
    let ctx = cpu.contexts.top_mut();
    let _ = bus.read(ctx.address);
    ctx.address = u16::from((ctx.address as u8).wrapping_add(index));
}

pub(crate) fn pointer_fetch(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let pointer = cpu.regs.fetch(bus);
    ctx(cpu).pointer = pointer;
}

/// (zp,X): dummy read of the pointer, then add X within page 0.
pub(crate) fn pointer_index_x(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let x = cpu.regs.x;
    let ctx = cpu.contexts.top_mut();
    let _ = bus.read(u16::from(ctx.pointer));
    ctx.pointer = ctx.pointer.wrapping_add(x);
}

pub(crate) fn pointer_lo(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    ctx.address = u16::from(bus.read(u16::from(ctx.pointer)));
}

pub(crate) fn pointer_hi(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    let hi = bus.read(u16::from(ctx.pointer.wrapping_add(1)));
    ctx.address |= u16::from(hi) << 8;
}

/// (zp),Y: fetch the pointer's high byte and add Y.
pub(crate) fn pointer_hi_indexed<I: Index>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let index = I::get(&cpu.regs);
    let ctx = cpu.contexts.top_mut();
    let hi = bus.read(u16::from(ctx.pointer.wrapping_add(1)));
    let base = (u16::from(hi) << 8) | ctx.address;
    index_address(ctx, base, index);
}

// ---------------------------------------------------------------------------
// Data access
// ---------------------------------------------------------------------------

pub(crate) fn read_effective<O: ReadOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let value = bus.read(ctx(cpu).address);
    O::execute(&mut cpu.regs, value);
}

/// Indexed read on the uncorrected address. Without a page crossing this
/// is the real read and the instruction ends here.
pub(crate) fn indexed_read<O: ReadOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    let value = bus.read(ctx.address);
    if ctx.page_crossed {
        ctx.address = ctx.target;
    } else {
        O::execute(&mut cpu.regs, value);
        finish(cpu);
    }
}

/// Stores and read-modify-writes always spend the fix-up cycle reading the
/// uncorrected address.
pub(crate) fn indexed_dummy_read(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    let _ = bus.read(ctx.address);
    ctx.address = ctx.target;
}

pub(crate) fn write_effective<S: StoreOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let value = S::value(&cpu.regs);
    bus.write(ctx(cpu).address, value);
}

pub(crate) fn modify_read(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    ctx.operand = bus.read(ctx.address);
}

/// The 6502 writes the unmodified value back while the ALU works.
pub(crate) fn modify_dummy_write<M: ModifyOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    bus.write(ctx.address, ctx.operand);
    ctx.operand = M::execute(&mut cpu.regs, ctx.operand);
}

pub(crate) fn modify_write(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    bus.write(ctx.address, ctx.operand);
}

/// Fix-up cycle of SHA/SHX/SHY/TAS. The address is left uncorrected so the
/// store can see the base high byte.
pub(crate) fn unstable_dummy_read(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = bus.read(ctx(cpu).address);
}

/// Store `value & (H + 1)`, where H is the high byte of the base address.
/// When indexing crossed a page the stored value also becomes the high
/// byte of the address written.
pub(crate) fn unstable_store<U: UnstableStore>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let register = U::value(&mut cpu.regs);
    let ctx = cpu.contexts.top_mut();
    let base_high = (ctx.address >> 8) as u8;
    let value = register & base_high.wrapping_add(1);
    let address = if ctx.page_crossed {
        (u16::from(value) << 8) | (ctx.target & 0x00FF)
    } else {
        ctx.target
    };
    bus.write(address, value);
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Fetch the offset and test the flag. Untaken branches end here.
pub(crate) fn branch<const FLAG: u8, const SET: bool>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let offset = cpu.regs.fetch(bus);
    if cpu.regs.p.is_set(FLAG) == SET {
        ctx(cpu).operand = offset;
    } else {
        finish(cpu);
    }
}

/// Taken branch: add the offset to PCL. Ends here unless PCH needs fixing.
pub(crate) fn branch_take(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let pc = cpu.regs.pc;
    let _ = bus.read(pc);
    let ctx = cpu.contexts.top_mut();
    let target = pc.wrapping_add_signed(i16::from(ctx.operand as i8));
    if (pc ^ target) & 0xFF00 == 0 {
        cpu.regs.pc = target;
        finish(cpu);
    } else {
        ctx.target = target;
        cpu.regs.pc = (pc & 0xFF00) | (target & 0x00FF);
    }
}

pub(crate) fn branch_fix(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = bus.read(cpu.regs.pc);
    cpu.regs.pc = ctx(cpu).target;
}

// ---------------------------------------------------------------------------
// Jumps
// ---------------------------------------------------------------------------

pub(crate) fn jump_absolute(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let hi = cpu.regs.fetch(bus);
    cpu.regs.pc = (u16::from(hi) << 8) | ctx(cpu).address;
}

pub(crate) fn indirect_lo(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    ctx.operand = bus.read(ctx.address);
}

/// The pointer's high byte is read without carrying into the page, so
/// `JMP ($10FF)` reads $10FF and $1000.
pub(crate) fn jump_indirect(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    let pointer = ctx.address;
    let hi_address = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
    let hi = bus.read(hi_address);
    cpu.regs.pc = (u16::from(hi) << 8) | u16::from(ctx.operand);
}

/// JSR cycle 6: the high byte is fetched after PC has been pushed.
pub(crate) fn jump_subroutine(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let hi = bus.read(cpu.regs.pc);
    cpu.regs.pc = (u16::from(hi) << 8) | ctx(cpu).address;
}

pub(crate) fn return_increment(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = bus.read(cpu.regs.pc);
    cpu.regs.pc = cpu.regs.pc.wrapping_add(1);
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

pub(crate) fn stack_dummy_read(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = bus.read(cpu.regs.stack_addr());
}

pub(crate) fn push<S: StoreOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let value = S::value(&cpu.regs);
    let address = cpu.regs.push();
    bus.write(address, value);
}

pub(crate) fn pull<P: PullOp>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let address = cpu.regs.pop();
    let value = bus.read(address);
    P::apply(&mut cpu.regs, value);
}

pub(crate) fn push_pch(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let address = cpu.regs.push();
    bus.write(address, (cpu.regs.pc >> 8) as u8);
}

pub(crate) fn push_pcl(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let address = cpu.regs.push();
    bus.write(address, cpu.regs.pc as u8);
}

pub(crate) fn pull_pcl(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let address = cpu.regs.pop();
    let lo = bus.read(address);
    cpu.regs.pc = (cpu.regs.pc & 0xFF00) | u16::from(lo);
}

pub(crate) fn pull_pch(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let address = cpu.regs.pop();
    let hi = bus.read(address);
    cpu.regs.pc = (cpu.regs.pc & 0x00FF) | (u16::from(hi) << 8);
}

// ---------------------------------------------------------------------------
// Interrupts
// ---------------------------------------------------------------------------

/// Push P and pick the vector. A pending NMI seen here hijacks a BRK or
/// IRQ sequence: B is pushed as that sequence dictates, but the NMI vector
/// is used and the NMI is consumed.
pub(crate) fn push_status<K: InterruptKind>(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let mut vector = K::VECTOR;
    if vector != NMI_VECTOR && cpu.nmi_pending {
        cpu.nmi_pending = false;
        vector = NMI_VECTOR;
        trace!("NMI hijacked interrupt sequence at PC ${:04X}", cpu.regs.pc);
    }
    let status = if K::BREAK {
        cpu.regs.p.to_byte_brk()
    } else {
        cpu.regs.p.to_byte_irq()
    };
    let address = cpu.regs.push();
    bus.write(address, status);
    ctx(cpu).target = vector;
}

pub(crate) fn vector_lo(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    ctx.address = u16::from(bus.read(ctx.target));
    cpu.regs.p.set(crate::flags::I);
}

pub(crate) fn vector_hi(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let ctx = cpu.contexts.top_mut();
    let hi = bus.read(ctx.target.wrapping_add(1));
    cpu.regs.pc = (u16::from(hi) << 8) | ctx.address;
    trace!("interrupt vector ${:04X} -> ${:04X}", ctx.target, cpu.regs.pc);
}

/// JAM: the operand read happens, then the CPU locks up.
pub(crate) fn jam(cpu: &mut Mos6502, bus: &mut dyn Bus) {
    let _ = bus.read(cpu.regs.pc);
    cpu.enter_jam();
}

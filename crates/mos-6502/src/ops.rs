//! Instruction semantics, independent of addressing.
//!
//! Each operation is an uninhabited marker type. Micro-op handlers are generic over
//! these, so `read_effective::<Lda>` and `read_effective::<Ora>` are
//! distinct function pointers and no handler branches on the opcode.

use crate::flags::{C, D, I, N, V, Z};
use crate::{Registers, Status};

/// Magic constant OR-ed into A by the unstable ANE and LXA opcodes on the
/// 2A03.
pub const UNSTABLE_MAGIC: u8 = 0xEE;

/// Consumes a byte read from the effective address.
pub(crate) trait ReadOp {
    fn execute(regs: &mut Registers, value: u8);
}

/// Transforms the byte at the effective address (read-modify-write).
pub(crate) trait ModifyOp {
    fn execute(regs: &mut Registers, value: u8) -> u8;
}

/// Produces the byte a store or push writes.
pub(crate) trait StoreOp {
    fn value(regs: &Registers) -> u8;
}

/// Register-only work done on the dummy-read cycle of a one-byte opcode.
pub(crate) trait ImpliedOp {
    fn execute(regs: &mut Registers);
}

/// Consumes a byte pulled from the stack.
pub(crate) trait PullOp {
    fn apply(regs: &mut Registers, value: u8);
}

/// SHA/SHX/SHY/TAS: a register value that gets AND-ed with the high byte
/// of the base address plus one.
pub(crate) trait UnstableStore {
    fn value(regs: &mut Registers) -> u8;
}

/// Index register used by an indexed addressing mode.
pub(crate) trait Index {
    fn get(regs: &Registers) -> u8;
}

/// Which interrupt sequence a BRK-style microcode run belongs to.
pub(crate) trait InterruptKind {
    const VECTOR: u16;
    /// Whether the pushed status has B set.
    const BREAK: bool;
}

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

// ---------------------------------------------------------------------------
// ALU
// ---------------------------------------------------------------------------

/// Binary add with carry. The decimal flag is ignored.
fn adc(regs: &mut Registers, value: u8) {
    let a = regs.a;
    let sum = u16::from(a) + u16::from(value) + u16::from(regs.p.is_set(C));
    let result = sum as u8;
    regs.p.set_if(C, sum > 0xFF);
    regs.p.set_if(V, (!(a ^ value) & (a ^ result) & 0x80) != 0);
    regs.a = result;
    regs.p.update_nz(result);
}

fn sbc(regs: &mut Registers, value: u8) {
    adc(regs, !value);
}

fn compare(p: &mut Status, register: u8, value: u8) {
    p.set_if(C, register >= value);
    p.update_nz(register.wrapping_sub(value));
}

fn asl(p: &mut Status, value: u8) -> u8 {
    p.set_if(C, value & 0x80 != 0);
    let result = value << 1;
    p.update_nz(result);
    result
}

fn lsr(p: &mut Status, value: u8) -> u8 {
    p.set_if(C, value & 0x01 != 0);
    let result = value >> 1;
    p.update_nz(result);
    result
}

fn rol(p: &mut Status, value: u8) -> u8 {
    let result = (value << 1) | u8::from(p.is_set(C));
    p.set_if(C, value & 0x80 != 0);
    p.update_nz(result);
    result
}

fn ror(p: &mut Status, value: u8) -> u8 {
    let result = (value >> 1) | (u8::from(p.is_set(C)) << 7);
    p.set_if(C, value & 0x01 != 0);
    p.update_nz(result);
    result
}

macro_rules! op {
    ($($name:ident),* $(,)?) => {
        $(
            pub(crate) enum $name {}
        )*
    };
}

op!(
    Lda, Ldx, Ldy, Lax, Ora, And, Eor, Adc, Sbc, Cmp, Cpx, Cpy, Bit, Nop, Anc, Alr, Arr, Ane,
    Lxa, Sbx, Las, Sta, Stx, Sty, Sax, Asl, Lsr, Rol, Ror, Inc, Dec, Slo, Rla, Sre, Rra, Dcp,
    Isc, Tax, Tay, Txa, Tya, Tsx, Txs, Inx, Iny, Dex, Dey, Accumulator, Flags, Sha, Shx, Shy,
    Tas, IndexX, IndexY, Brk, Irq, Nmi,
);

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

impl ReadOp for Lda {
    fn execute(regs: &mut Registers, value: u8) {
        regs.a = value;
        regs.p.update_nz(value);
    }
}

impl ReadOp for Ldx {
    fn execute(regs: &mut Registers, value: u8) {
        regs.x = value;
        regs.p.update_nz(value);
    }
}

impl ReadOp for Ldy {
    fn execute(regs: &mut Registers, value: u8) {
        regs.y = value;
        regs.p.update_nz(value);
    }
}

impl ReadOp for Lax {
    fn execute(regs: &mut Registers, value: u8) {
        regs.a = value;
        regs.x = value;
        regs.p.update_nz(value);
    }
}

impl ReadOp for Ora {
    fn execute(regs: &mut Registers, value: u8) {
        regs.a |= value;
        regs.p.update_nz(regs.a);
    }
}

impl ReadOp for And {
    fn execute(regs: &mut Registers, value: u8) {
        regs.a &= value;
        regs.p.update_nz(regs.a);
    }
}

impl ReadOp for Eor {
    fn execute(regs: &mut Registers, value: u8) {
        regs.a ^= value;
        regs.p.update_nz(regs.a);
    }
}

impl ReadOp for Adc {
    fn execute(regs: &mut Registers, value: u8) {
        adc(regs, value);
    }
}

impl ReadOp for Sbc {
    fn execute(regs: &mut Registers, value: u8) {
        sbc(regs, value);
    }
}

impl ReadOp for Cmp {
    fn execute(regs: &mut Registers, value: u8) {
        compare(&mut regs.p, regs.a, value);
    }
}

impl ReadOp for Cpx {
    fn execute(regs: &mut Registers, value: u8) {
        compare(&mut regs.p, regs.x, value);
    }
}

impl ReadOp for Cpy {
    fn execute(regs: &mut Registers, value: u8) {
        compare(&mut regs.p, regs.y, value);
    }
}

impl ReadOp for Bit {
    fn execute(regs: &mut Registers, value: u8) {
        regs.p.set_if(Z, regs.a & value == 0);
        regs.p.set_if(N, value & 0x80 != 0);
        regs.p.set_if(V, value & 0x40 != 0);
    }
}

impl ReadOp for Nop {
    fn execute(_: &mut Registers, _: u8) {}
}

impl ReadOp for Anc {
    fn execute(regs: &mut Registers, value: u8) {
        regs.a &= value;
        regs.p.update_nz(regs.a);
        regs.p.set_if(C, regs.a & 0x80 != 0);
    }
}

impl ReadOp for Alr {
    fn execute(regs: &mut Registers, value: u8) {
        let masked = regs.a & value;
        regs.a = lsr(&mut regs.p, masked);
    }
}

impl ReadOp for Arr {
    fn execute(regs: &mut Registers, value: u8) {
        let masked = regs.a & value;
        let result = (masked >> 1) | (u8::from(regs.p.is_set(C)) << 7);
        regs.a = result;
        regs.p.update_nz(result);
        let bit6 = result & 0x40 != 0;
        let bit5 = result & 0x20 != 0;
        regs.p.set_if(C, bit6);
        regs.p.set_if(V, bit6 ^ bit5);
    }
}

impl ReadOp for Ane {
    fn execute(regs: &mut Registers, value: u8) {
        regs.a = (regs.a | UNSTABLE_MAGIC) & regs.x & value;
        regs.p.update_nz(regs.a);
    }
}

impl ReadOp for Lxa {
    fn execute(regs: &mut Registers, value: u8) {
        let result = (regs.a | UNSTABLE_MAGIC) & value;
        regs.a = result;
        regs.x = result;
        regs.p.update_nz(result);
    }
}

impl ReadOp for Sbx {
    fn execute(regs: &mut Registers, value: u8) {
        let masked = regs.a & regs.x;
        regs.p.set_if(C, masked >= value);
        regs.x = masked.wrapping_sub(value);
        regs.p.update_nz(regs.x);
    }
}

impl ReadOp for Las {
    fn execute(regs: &mut Registers, value: u8) {
        let result = value & regs.s;
        regs.a = result;
        regs.x = result;
        regs.s = result;
        regs.p.update_nz(result);
    }
}

// ---------------------------------------------------------------------------
// Stores and pushes
// ---------------------------------------------------------------------------

impl StoreOp for Sta {
    fn value(regs: &Registers) -> u8 {
        regs.a
    }
}

impl StoreOp for Stx {
    fn value(regs: &Registers) -> u8 {
        regs.x
    }
}

impl StoreOp for Sty {
    fn value(regs: &Registers) -> u8 {
        regs.y
    }
}

impl StoreOp for Sax {
    fn value(regs: &Registers) -> u8 {
        regs.a & regs.x
    }
}

impl StoreOp for Accumulator {
    fn value(regs: &Registers) -> u8 {
        regs.a
    }
}

impl StoreOp for Flags {
    fn value(regs: &Registers) -> u8 {
        regs.p.to_byte_brk()
    }
}

// ---------------------------------------------------------------------------
// Pulls
// ---------------------------------------------------------------------------

impl PullOp for Accumulator {
    fn apply(regs: &mut Registers, value: u8) {
        regs.a = value;
        regs.p.update_nz(value);
    }
}

impl PullOp for Flags {
    fn apply(regs: &mut Registers, value: u8) {
        regs.p = Status::from_pulled(value);
    }
}

// ---------------------------------------------------------------------------
// Read-modify-write
// ---------------------------------------------------------------------------

impl ModifyOp for Asl {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        asl(&mut regs.p, value)
    }
}

impl ModifyOp for Lsr {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        lsr(&mut regs.p, value)
    }
}

impl ModifyOp for Rol {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        rol(&mut regs.p, value)
    }
}

impl ModifyOp for Ror {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        ror(&mut regs.p, value)
    }
}

impl ModifyOp for Inc {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        regs.p.update_nz(result);
        result
    }
}

impl ModifyOp for Dec {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        regs.p.update_nz(result);
        result
    }
}

impl ModifyOp for Slo {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        let result = asl(&mut regs.p, value);
        Ora::execute(regs, result);
        result
    }
}

impl ModifyOp for Rla {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        let result = rol(&mut regs.p, value);
        And::execute(regs, result);
        result
    }
}

impl ModifyOp for Sre {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        let result = lsr(&mut regs.p, value);
        Eor::execute(regs, result);
        result
    }
}

impl ModifyOp for Rra {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        let result = ror(&mut regs.p, value);
        adc(regs, result);
        result
    }
}

impl ModifyOp for Dcp {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        compare(&mut regs.p, regs.a, result);
        result
    }
}

impl ModifyOp for Isc {
    fn execute(regs: &mut Registers, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        sbc(regs, result);
        result
    }
}

// ---------------------------------------------------------------------------
// Implied
// ---------------------------------------------------------------------------

macro_rules! transfer {
    ($op:ident, $from:ident => $to:ident) => {
        impl ImpliedOp for $op {
            fn execute(regs: &mut Registers) {
                regs.$to = regs.$from;
                regs.p.update_nz(regs.$to);
            }
        }
    };
}

transfer!(Tax, a => x);
transfer!(Tay, a => y);
transfer!(Txa, x => a);
transfer!(Tya, y => a);
transfer!(Tsx, s => x);

impl ImpliedOp for Txs {
    fn execute(regs: &mut Registers) {
        regs.s = regs.x;
    }
}

macro_rules! step {
    ($op:ident, $reg:ident, $method:ident) => {
        impl ImpliedOp for $op {
            fn execute(regs: &mut Registers) {
                regs.$reg = regs.$reg.$method(1);
                regs.p.update_nz(regs.$reg);
            }
        }
    };
}

step!(Inx, x, wrapping_add);
step!(Iny, y, wrapping_add);
step!(Dex, x, wrapping_sub);
step!(Dey, y, wrapping_sub);

impl ImpliedOp for Nop {
    fn execute(_: &mut Registers) {}
}

/// Flag set/clear instructions, parameterised by flag and target state.
pub(crate) enum SetFlag<const FLAG: u8, const VALUE: bool> {}

impl<const FLAG: u8, const VALUE: bool> ImpliedOp for SetFlag<FLAG, VALUE> {
    fn execute(regs: &mut Registers) {
        regs.p.set_if(FLAG, VALUE);
    }
}

pub(crate) type Clc = SetFlag<C, false>;
pub(crate) type Sec = SetFlag<C, true>;
pub(crate) type Cli = SetFlag<I, false>;
pub(crate) type Sei = SetFlag<I, true>;
pub(crate) type Clv = SetFlag<V, false>;
pub(crate) type Cld = SetFlag<D, false>;
pub(crate) type Sed = SetFlag<D, true>;

// ---------------------------------------------------------------------------
// Unstable stores
// ---------------------------------------------------------------------------

impl UnstableStore for Sha {
    fn value(regs: &mut Registers) -> u8 {
        regs.a & regs.x
    }
}

impl UnstableStore for Shx {
    fn value(regs: &mut Registers) -> u8 {
        regs.x
    }
}

impl UnstableStore for Shy {
    fn value(regs: &mut Registers) -> u8 {
        regs.y
    }
}

impl UnstableStore for Tas {
    fn value(regs: &mut Registers) -> u8 {
        regs.s = regs.a & regs.x;
        regs.s
    }
}

// ---------------------------------------------------------------------------
// Indexing and interrupts
// ---------------------------------------------------------------------------

impl Index for IndexX {
    fn get(regs: &Registers) -> u8 {
        regs.x
    }
}

impl Index for IndexY {
    fn get(regs: &Registers) -> u8 {
        regs.y
    }
}

impl InterruptKind for Brk {
    const VECTOR: u16 = IRQ_VECTOR;
    const BREAK: bool = true;
}

impl InterruptKind for Irq {
    const VECTOR: u16 = IRQ_VECTOR;
    const BREAK: bool = false;
}

impl InterruptKind for Nmi {
    const VECTOR: u16 = NMI_VECTOR;
    const BREAK: bool = false;
}

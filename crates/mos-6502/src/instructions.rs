//! Opcode decode table.
//!
//! Every opcode, plus the two interrupt pseudo-ops, maps to a fixed list of
//! per-cycle handlers. The table is built once and shared by every CPU.

use std::fmt;
use std::sync::OnceLock;

use crate::flags::{C, N, V, Z};
use crate::micro_ops::{
    MicroOp, accumulator, address_hi, address_hi_indexed, address_lo, branch, branch_fix,
    branch_take, idle, immediate, implied, indexed_dummy_read, indexed_read, indirect_lo, jam,
    jump_absolute, jump_indirect, jump_subroutine, modify_dummy_write, modify_read, modify_write,
    pointer_fetch, pointer_hi, pointer_hi_indexed, pointer_index_x, pointer_lo, pull, pull_pch,
    pull_pcl, push, push_pch, push_pcl, push_status, read_effective, return_increment,
    skip_byte, stack_dummy_read, unstable_dummy_read, unstable_store, vector_hi, vector_lo,
    write_effective, zero_page_indexed,
};
use crate::ops::{
    Accumulator, Adc, Alr, Anc, And, Ane, Arr, Asl, Bit, Brk, Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy,
    Dcp, Dec, Dex, Dey, Eor, Flags, Inc, Index, IndexX, IndexY, Inx, Iny, Irq, Isc, Las, Lax, Lda,
    Ldx, Ldy, Lsr, Lxa, ModifyOp, Nmi, Nop, Ora, ReadOp, Rla, Rol, Ror, Rra, Sax, Sbc, Sbx, Sec,
    Sed, Sei, Sha, Shx, Shy, Slo, Sre, Sta, StoreOp, Stx, Sty, Tas, Tax, Tay, Tsx, Txa, Txs, Tya,
    UnstableStore,
};

/// Longest micro-op sequence (RMW through (zp,X) and (zp),Y).
pub const MAX_MICRO_OPS: usize = 7;

/// Table index of the NMI pseudo-op.
pub const NMI_OPCODE: u16 = 0x100;

/// Table index of the IRQ pseudo-op.
pub const IRQ_OPCODE: u16 = 0x101;

/// Number of table entries: 256 opcodes and two interrupt sequences.
pub const TABLE_SIZE: usize = 0x102;

/// Operand addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// Instruction length in bytes, opcode included.
    #[must_use]
    pub const fn size(self) -> u16 {
        match self {
            Self::Implied | Self::Accumulator => 1,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndirectX
            | Self::IndirectY
            | Self::Relative => 2,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 3,
        }
    }
}

/// Instruction names, including the undocumented ones and the two
/// interrupt sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    // Undocumented.
    Alr,
    Anc,
    Ane,
    Arr,
    Dcp,
    Isc,
    Jam,
    Las,
    Lax,
    Lxa,
    Rla,
    Rra,
    Sax,
    Sbx,
    Sha,
    Shx,
    Shy,
    Slo,
    Sre,
    Tas,
    Usbc,
    Dop,
    Top,
    // Interrupt sequences.
    Nmi,
    Irq,
}

impl Mnemonic {
    /// Assembler name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Adc => "ADC",
            Self::And => "AND",
            Self::Asl => "ASL",
            Self::Bcc => "BCC",
            Self::Bcs => "BCS",
            Self::Beq => "BEQ",
            Self::Bit => "BIT",
            Self::Bmi => "BMI",
            Self::Bne => "BNE",
            Self::Bpl => "BPL",
            Self::Brk => "BRK",
            Self::Bvc => "BVC",
            Self::Bvs => "BVS",
            Self::Clc => "CLC",
            Self::Cld => "CLD",
            Self::Cli => "CLI",
            Self::Clv => "CLV",
            Self::Cmp => "CMP",
            Self::Cpx => "CPX",
            Self::Cpy => "CPY",
            Self::Dec => "DEC",
            Self::Dex => "DEX",
            Self::Dey => "DEY",
            Self::Eor => "EOR",
            Self::Inc => "INC",
            Self::Inx => "INX",
            Self::Iny => "INY",
            Self::Jmp => "JMP",
            Self::Jsr => "JSR",
            Self::Lda => "LDA",
            Self::Ldx => "LDX",
            Self::Ldy => "LDY",
            Self::Lsr => "LSR",
            Self::Nop => "NOP",
            Self::Ora => "ORA",
            Self::Pha => "PHA",
            Self::Php => "PHP",
            Self::Pla => "PLA",
            Self::Plp => "PLP",
            Self::Rol => "ROL",
            Self::Ror => "ROR",
            Self::Rti => "RTI",
            Self::Rts => "RTS",
            Self::Sbc => "SBC",
            Self::Sec => "SEC",
            Self::Sed => "SED",
            Self::Sei => "SEI",
            Self::Sta => "STA",
            Self::Stx => "STX",
            Self::Sty => "STY",
            Self::Tax => "TAX",
            Self::Tay => "TAY",
            Self::Tsx => "TSX",
            Self::Txa => "TXA",
            Self::Txs => "TXS",
            Self::Tya => "TYA",
            Self::Alr => "ALR",
            Self::Anc => "ANC",
            Self::Ane => "ANE",
            Self::Arr => "ARR",
            Self::Dcp => "DCP",
            Self::Isc => "ISC",
            Self::Jam => "JAM",
            Self::Las => "LAS",
            Self::Lax => "LAX",
            Self::Lxa => "LXA",
            Self::Rla => "RLA",
            Self::Rra => "RRA",
            Self::Sax => "SAX",
            Self::Sbx => "SBX",
            Self::Sha => "SHA",
            Self::Shx => "SHX",
            Self::Shy => "SHY",
            Self::Slo => "SLO",
            Self::Sre => "SRE",
            Self::Tas => "TAS",
            Self::Usbc => "USBC",
            Self::Dop => "DOP",
            Self::Top => "TOP",
            Self::Nmi => "NMI",
            Self::Irq => "IRQ",
        }
    }

    /// One-line summary of what the instruction does.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Adc => "add with carry",
            Self::And => "AND with accumulator",
            Self::Asl => "arithmetic shift left",
            Self::Bcc => "branch if carry clear",
            Self::Bcs => "branch if carry set",
            Self::Beq => "branch if equal",
            Self::Bit => "test bits",
            Self::Bmi => "branch if minus",
            Self::Bne => "branch if not equal",
            Self::Bpl => "branch if plus",
            Self::Brk => "software interrupt",
            Self::Bvc => "branch if overflow clear",
            Self::Bvs => "branch if overflow set",
            Self::Clc => "clear carry",
            Self::Cld => "clear decimal",
            Self::Cli => "clear interrupt disable",
            Self::Clv => "clear overflow",
            Self::Cmp => "compare with accumulator",
            Self::Cpx => "compare with X",
            Self::Cpy => "compare with Y",
            Self::Dec => "decrement memory",
            Self::Dex => "decrement X",
            Self::Dey => "decrement Y",
            Self::Eor => "exclusive OR with accumulator",
            Self::Inc => "increment memory",
            Self::Inx => "increment X",
            Self::Iny => "increment Y",
            Self::Jmp => "jump",
            Self::Jsr => "jump to subroutine",
            Self::Lda => "load accumulator",
            Self::Ldx => "load X",
            Self::Ldy => "load Y",
            Self::Lsr => "logical shift right",
            Self::Nop => "no operation",
            Self::Ora => "OR with accumulator",
            Self::Pha => "push accumulator",
            Self::Php => "push processor status",
            Self::Pla => "pull accumulator",
            Self::Plp => "pull processor status",
            Self::Rol => "rotate left",
            Self::Ror => "rotate right",
            Self::Rti => "return from interrupt",
            Self::Rts => "return from subroutine",
            Self::Sbc => "subtract with carry",
            Self::Sec => "set carry",
            Self::Sed => "set decimal",
            Self::Sei => "set interrupt disable",
            Self::Sta => "store accumulator",
            Self::Stx => "store X",
            Self::Sty => "store Y",
            Self::Tax => "transfer A to X",
            Self::Tay => "transfer A to Y",
            Self::Tsx => "transfer S to X",
            Self::Txa => "transfer X to A",
            Self::Txs => "transfer X to S",
            Self::Tya => "transfer Y to A",
            Self::Alr => "AND then LSR accumulator",
            Self::Anc => "AND, copy N into C",
            Self::Ane => "unstable: (A | magic) & X & operand",
            Self::Arr => "AND then ROR accumulator with odd flags",
            Self::Dcp => "DEC memory then CMP",
            Self::Isc => "INC memory then SBC",
            Self::Jam => "lock the CPU",
            Self::Las => "memory AND S into A, X and S",
            Self::Lax => "load A and X",
            Self::Lxa => "unstable: (A | magic) & operand into A and X",
            Self::Rla => "ROL memory then AND",
            Self::Rra => "ROR memory then ADC",
            Self::Sax => "store A AND X",
            Self::Sbx => "(A AND X) minus operand into X",
            Self::Sha => "store A AND X AND (high + 1)",
            Self::Shx => "store X AND (high + 1)",
            Self::Shy => "store Y AND (high + 1)",
            Self::Slo => "ASL memory then ORA",
            Self::Sre => "LSR memory then EOR",
            Self::Tas => "S = A AND X, store S AND (high + 1)",
            Self::Usbc => "subtract with carry (duplicate opcode)",
            Self::Dop => "two-byte no operation",
            Self::Top => "three-byte no operation",
            Self::Nmi => "non-maskable interrupt sequence",
            Self::Irq => "interrupt request sequence",
        }
    }

    /// True for opcodes outside the documented instruction set.
    #[must_use]
    pub const fn is_illegal(self) -> bool {
        matches!(
            self,
            Self::Alr
                | Self::Anc
                | Self::Ane
                | Self::Arr
                | Self::Dcp
                | Self::Isc
                | Self::Jam
                | Self::Las
                | Self::Lax
                | Self::Lxa
                | Self::Rla
                | Self::Rra
                | Self::Sax
                | Self::Sbx
                | Self::Sha
                | Self::Shx
                | Self::Shy
                | Self::Slo
                | Self::Sre
                | Self::Tas
                | Self::Usbc
                | Self::Dop
                | Self::Top
        )
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded table entry.
#[derive(Clone, Copy)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Undocumented opcode. Also set for the one-byte NOP duplicates.
    pub illegal: bool,
    /// Cycles taken when no optional cycle is added. Zero for JAM, which
    /// never completes.
    pub cycles: u8,
    pub(crate) micro_ops: [MicroOp; MAX_MICRO_OPS],
    pub(crate) len: u8,
}

impl Instruction {
    /// Number of cycles after the opcode fetch, optional ones included.
    #[must_use]
    pub const fn micro_op_count(&self) -> u8 {
        self.len
    }

    /// Bytes taken from the instruction stream. BRK is one longer than its
    /// implied mode because it skips a padding byte.
    #[must_use]
    pub const fn size(&self) -> u16 {
        match self.mnemonic {
            Mnemonic::Brk => 2,
            _ => self.mode.size(),
        }
    }

    /// Upper bound of the cycle count, page crossings and taken branches
    /// included.
    #[must_use]
    pub const fn max_cycles(&self) -> u8 {
        self.len + 1
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("mnemonic", &self.mnemonic)
            .field("mode", &self.mode)
            .field("illegal", &self.illegal)
            .field("cycles", &self.cycles)
            .field("micro_ops", &self.len)
            .finish()
    }
}

/// The shared decode table.
pub fn instruction_table() -> &'static [Instruction; TABLE_SIZE] {
    static TABLE: OnceLock<[Instruction; TABLE_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| std::array::from_fn(|index| decode(index as u16)))
}

/// Look up one opcode.
#[must_use]
pub fn instruction(opcode: u8) -> &'static Instruction {
    &instruction_table()[usize::from(opcode)]
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

type Mn = Mnemonic;
type M = AddressingMode;

/// `optional` is how many trailing ops only run on a page crossing or a
/// taken branch.
fn build(mnemonic: Mnemonic, mode: AddressingMode, ops: &[MicroOp], optional: u8) -> Instruction {
    let mut micro_ops = [idle as MicroOp; MAX_MICRO_OPS];
    micro_ops[..ops.len()].copy_from_slice(ops);
    let len = ops.len() as u8;
    Instruction {
        mnemonic,
        mode,
        illegal: mnemonic.is_illegal(),
        cycles: len + 1 - optional,
        micro_ops,
        len,
    }
}

fn read<O: ReadOp>(mnemonic: Mnemonic, mode: AddressingMode) -> Instruction {
    match mode {
        M::Immediate => build(mnemonic, mode, &[immediate::<O>], 0),
        M::ZeroPage => build(mnemonic, mode, &[address_lo, read_effective::<O>], 0),
        M::ZeroPageX => zero_page_read::<O, IndexX>(mnemonic, mode),
        M::ZeroPageY => zero_page_read::<O, IndexY>(mnemonic, mode),
        M::Absolute => build(
            mnemonic,
            mode,
            &[address_lo, address_hi, read_effective::<O>],
            0,
        ),
        M::AbsoluteX => absolute_indexed_read::<O, IndexX>(mnemonic, mode),
        M::AbsoluteY => absolute_indexed_read::<O, IndexY>(mnemonic, mode),
        M::IndirectX => build(
            mnemonic,
            mode,
            &[
                pointer_fetch,
                pointer_index_x,
                pointer_lo,
                pointer_hi,
                read_effective::<O>,
            ],
            0,
        ),
        M::IndirectY => build(
            mnemonic,
            mode,
            &[
                pointer_fetch,
                pointer_lo,
                pointer_hi_indexed::<IndexY>,
                indexed_read::<O>,
                read_effective::<O>,
            ],
            1,
        ),
        M::Implied | M::Accumulator | M::Indirect | M::Relative => unreachable_mode(mnemonic, mode),
    }
}

fn zero_page_read<O: ReadOp, I: Index>(mnemonic: Mnemonic, mode: AddressingMode) -> Instruction {
    build(
        mnemonic,
        mode,
        &[address_lo, zero_page_indexed::<I>, read_effective::<O>],
        0,
    )
}

fn absolute_indexed_read<O: ReadOp, I: Index>(
    mnemonic: Mnemonic,
    mode: AddressingMode,
) -> Instruction {
    build(
        mnemonic,
        mode,
        &[
            address_lo,
            address_hi_indexed::<I>,
            indexed_read::<O>,
            read_effective::<O>,
        ],
        1,
    )
}

fn store<S: StoreOp>(mnemonic: Mnemonic, mode: AddressingMode) -> Instruction {
    match mode {
        M::ZeroPage => build(mnemonic, mode, &[address_lo, write_effective::<S>], 0),
        M::ZeroPageX => build(
            mnemonic,
            mode,
            &[address_lo, zero_page_indexed::<IndexX>, write_effective::<S>],
            0,
        ),
        M::ZeroPageY => build(
            mnemonic,
            mode,
            &[address_lo, zero_page_indexed::<IndexY>, write_effective::<S>],
            0,
        ),
        M::Absolute => build(
            mnemonic,
            mode,
            &[address_lo, address_hi, write_effective::<S>],
            0,
        ),
        M::AbsoluteX => absolute_indexed_store::<S, IndexX>(mnemonic, mode),
        M::AbsoluteY => absolute_indexed_store::<S, IndexY>(mnemonic, mode),
        M::IndirectX => build(
            mnemonic,
            mode,
            &[
                pointer_fetch,
                pointer_index_x,
                pointer_lo,
                pointer_hi,
                write_effective::<S>,
            ],
            0,
        ),
        M::IndirectY => build(
            mnemonic,
            mode,
            &[
                pointer_fetch,
                pointer_lo,
                pointer_hi_indexed::<IndexY>,
                indexed_dummy_read,
                write_effective::<S>,
            ],
            0,
        ),
        M::Implied | M::Accumulator | M::Immediate | M::Indirect | M::Relative => {
            unreachable_mode(mnemonic, mode)
        }
    }
}

fn absolute_indexed_store<S: StoreOp, I: Index>(
    mnemonic: Mnemonic,
    mode: AddressingMode,
) -> Instruction {
    build(
        mnemonic,
        mode,
        &[
            address_lo,
            address_hi_indexed::<I>,
            indexed_dummy_read,
            write_effective::<S>,
        ],
        0,
    )
}

fn modify<O: ModifyOp>(mnemonic: Mnemonic, mode: AddressingMode) -> Instruction {
    let with_tail = |prefix: &[MicroOp]| {
        let tail: [MicroOp; 3] = [modify_read, modify_dummy_write::<O>, modify_write];
        let mut ops = [idle as MicroOp; MAX_MICRO_OPS];
        ops[..prefix.len()].copy_from_slice(prefix);
        ops[prefix.len()..prefix.len() + tail.len()].copy_from_slice(&tail);
        build(mnemonic, mode, &ops[..prefix.len() + tail.len()], 0)
    };
    match mode {
        M::Accumulator => build(mnemonic, mode, &[accumulator::<O>], 0),
        M::ZeroPage => with_tail(&[address_lo]),
        M::ZeroPageX => with_tail(&[address_lo, zero_page_indexed::<IndexX>]),
        M::Absolute => with_tail(&[address_lo, address_hi]),
        M::AbsoluteX => with_tail(&[address_lo, address_hi_indexed::<IndexX>, indexed_dummy_read]),
        M::AbsoluteY => with_tail(&[address_lo, address_hi_indexed::<IndexY>, indexed_dummy_read]),
        M::IndirectX => with_tail(&[pointer_fetch, pointer_index_x, pointer_lo, pointer_hi]),
        M::IndirectY => with_tail(&[
            pointer_fetch,
            pointer_lo,
            pointer_hi_indexed::<IndexY>,
            indexed_dummy_read,
        ]),
        M::Implied | M::Immediate | M::ZeroPageY | M::Indirect | M::Relative => {
            unreachable_mode(mnemonic, mode)
        }
    }
}

fn unstable<U: UnstableStore>(mnemonic: Mnemonic, mode: AddressingMode) -> Instruction {
    match mode {
        M::AbsoluteX => build(
            mnemonic,
            mode,
            &[
                address_lo,
                address_hi_indexed::<IndexX>,
                unstable_dummy_read,
                unstable_store::<U>,
            ],
            0,
        ),
        M::AbsoluteY => build(
            mnemonic,
            mode,
            &[
                address_lo,
                address_hi_indexed::<IndexY>,
                unstable_dummy_read,
                unstable_store::<U>,
            ],
            0,
        ),
        M::IndirectY => build(
            mnemonic,
            mode,
            &[
                pointer_fetch,
                pointer_lo,
                pointer_hi_indexed::<IndexY>,
                unstable_dummy_read,
                unstable_store::<U>,
            ],
            0,
        ),
        _ => unreachable_mode(mnemonic, mode),
    }
}

fn implied_op<O: crate::ops::ImpliedOp>(mnemonic: Mnemonic) -> Instruction {
    build(mnemonic, M::Implied, &[implied::<O>], 0)
}

fn branch_on<const FLAG: u8, const SET: bool>(mnemonic: Mnemonic) -> Instruction {
    build(
        mnemonic,
        M::Relative,
        &[branch::<FLAG, SET>, branch_take, branch_fix],
        2,
    )
}

/// The builders above only receive modes listed in the decode match. A
/// mismatch there decodes to a JAM so it shows up at once in tests.
fn unreachable_mode(mnemonic: Mnemonic, mode: AddressingMode) -> Instruction {
    log::error!("no {mnemonic} encoding for {mode:?}");
    jam_instruction()
}

fn jam_instruction() -> Instruction {
    let mut instruction = build(Mn::Jam, M::Implied, &[jam], 0);
    instruction.cycles = 0;
    instruction
}

fn interrupt<K: crate::ops::InterruptKind>(mnemonic: Mnemonic) -> Instruction {
    build(
        mnemonic,
        M::Implied,
        &[
            idle,
            push_pch,
            push_pcl,
            push_status::<K>,
            vector_lo,
            vector_hi,
        ],
        0,
    )
}

// ---------------------------------------------------------------------------
// Decode matrix
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_lines)]
fn decode(opcode: u16) -> Instruction {
    let mut instruction = match opcode {
        NMI_OPCODE => interrupt::<Nmi>(Mn::Nmi),
        IRQ_OPCODE => interrupt::<Irq>(Mn::Irq),

        // Control flow.
        0x00 => build(
            Mn::Brk,
            M::Implied,
            &[
                skip_byte,
                push_pch,
                push_pcl,
                push_status::<Brk>,
                vector_lo,
                vector_hi,
            ],
            0,
        ),
        0x20 => build(
            Mn::Jsr,
            M::Absolute,
            &[
                address_lo,
                stack_dummy_read,
                push_pch,
                push_pcl,
                jump_subroutine,
            ],
            0,
        ),
        0x40 => build(
            Mn::Rti,
            M::Implied,
            &[idle, stack_dummy_read, pull::<Flags>, pull_pcl, pull_pch],
            0,
        ),
        0x60 => build(
            Mn::Rts,
            M::Implied,
            &[idle, stack_dummy_read, pull_pcl, pull_pch, return_increment],
            0,
        ),
        0x4C => build(Mn::Jmp, M::Absolute, &[address_lo, jump_absolute], 0),
        0x6C => build(
            Mn::Jmp,
            M::Indirect,
            &[address_lo, address_hi, indirect_lo, jump_indirect],
            0,
        ),

        // Branches.
        0x10 => branch_on::<N, false>(Mn::Bpl),
        0x30 => branch_on::<N, true>(Mn::Bmi),
        0x50 => branch_on::<V, false>(Mn::Bvc),
        0x70 => branch_on::<V, true>(Mn::Bvs),
        0x90 => branch_on::<C, false>(Mn::Bcc),
        0xB0 => branch_on::<C, true>(Mn::Bcs),
        0xD0 => branch_on::<Z, false>(Mn::Bne),
        0xF0 => branch_on::<Z, true>(Mn::Beq),

        // Stack.
        0x08 => build(Mn::Php, M::Implied, &[idle, push::<Flags>], 0),
        0x48 => build(Mn::Pha, M::Implied, &[idle, push::<Accumulator>], 0),
        0x28 => build(
            Mn::Plp,
            M::Implied,
            &[idle, stack_dummy_read, pull::<Flags>],
            0,
        ),
        0x68 => build(
            Mn::Pla,
            M::Implied,
            &[idle, stack_dummy_read, pull::<Accumulator>],
            0,
        ),

        // Implied.
        0x18 => implied_op::<Clc>(Mn::Clc),
        0x38 => implied_op::<Sec>(Mn::Sec),
        0x58 => implied_op::<Cli>(Mn::Cli),
        0x78 => implied_op::<Sei>(Mn::Sei),
        0xB8 => implied_op::<Clv>(Mn::Clv),
        0xD8 => implied_op::<Cld>(Mn::Cld),
        0xF8 => implied_op::<Sed>(Mn::Sed),
        0xAA => implied_op::<Tax>(Mn::Tax),
        0xA8 => implied_op::<Tay>(Mn::Tay),
        0x8A => implied_op::<Txa>(Mn::Txa),
        0x98 => implied_op::<Tya>(Mn::Tya),
        0xBA => implied_op::<Tsx>(Mn::Tsx),
        0x9A => implied_op::<Txs>(Mn::Txs),
        0xE8 => implied_op::<Inx>(Mn::Inx),
        0xC8 => implied_op::<Iny>(Mn::Iny),
        0xCA => implied_op::<Dex>(Mn::Dex),
        0x88 => implied_op::<Dey>(Mn::Dey),
        0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => implied_op::<Nop>(Mn::Nop),

        // Loads.
        0xA9 => read::<Lda>(Mn::Lda, M::Immediate),
        0xA5 => read::<Lda>(Mn::Lda, M::ZeroPage),
        0xB5 => read::<Lda>(Mn::Lda, M::ZeroPageX),
        0xAD => read::<Lda>(Mn::Lda, M::Absolute),
        0xBD => read::<Lda>(Mn::Lda, M::AbsoluteX),
        0xB9 => read::<Lda>(Mn::Lda, M::AbsoluteY),
        0xA1 => read::<Lda>(Mn::Lda, M::IndirectX),
        0xB1 => read::<Lda>(Mn::Lda, M::IndirectY),
        0xA2 => read::<Ldx>(Mn::Ldx, M::Immediate),
        0xA6 => read::<Ldx>(Mn::Ldx, M::ZeroPage),
        0xB6 => read::<Ldx>(Mn::Ldx, M::ZeroPageY),
        0xAE => read::<Ldx>(Mn::Ldx, M::Absolute),
        0xBE => read::<Ldx>(Mn::Ldx, M::AbsoluteY),
        0xA0 => read::<Ldy>(Mn::Ldy, M::Immediate),
        0xA4 => read::<Ldy>(Mn::Ldy, M::ZeroPage),
        0xB4 => read::<Ldy>(Mn::Ldy, M::ZeroPageX),
        0xAC => read::<Ldy>(Mn::Ldy, M::Absolute),
        0xBC => read::<Ldy>(Mn::Ldy, M::AbsoluteX),

        // Stores.
        0x85 => store::<Sta>(Mn::Sta, M::ZeroPage),
        0x95 => store::<Sta>(Mn::Sta, M::ZeroPageX),
        0x8D => store::<Sta>(Mn::Sta, M::Absolute),
        0x9D => store::<Sta>(Mn::Sta, M::AbsoluteX),
        0x99 => store::<Sta>(Mn::Sta, M::AbsoluteY),
        0x81 => store::<Sta>(Mn::Sta, M::IndirectX),
        0x91 => store::<Sta>(Mn::Sta, M::IndirectY),
        0x86 => store::<Stx>(Mn::Stx, M::ZeroPage),
        0x96 => store::<Stx>(Mn::Stx, M::ZeroPageY),
        0x8E => store::<Stx>(Mn::Stx, M::Absolute),
        0x84 => store::<Sty>(Mn::Sty, M::ZeroPage),
        0x94 => store::<Sty>(Mn::Sty, M::ZeroPageX),
        0x8C => store::<Sty>(Mn::Sty, M::Absolute),

        // ALU reads.
        0x09 => read::<Ora>(Mn::Ora, M::Immediate),
        0x05 => read::<Ora>(Mn::Ora, M::ZeroPage),
        0x15 => read::<Ora>(Mn::Ora, M::ZeroPageX),
        0x0D => read::<Ora>(Mn::Ora, M::Absolute),
        0x1D => read::<Ora>(Mn::Ora, M::AbsoluteX),
        0x19 => read::<Ora>(Mn::Ora, M::AbsoluteY),
        0x01 => read::<Ora>(Mn::Ora, M::IndirectX),
        0x11 => read::<Ora>(Mn::Ora, M::IndirectY),
        0x29 => read::<And>(Mn::And, M::Immediate),
        0x25 => read::<And>(Mn::And, M::ZeroPage),
        0x35 => read::<And>(Mn::And, M::ZeroPageX),
        0x2D => read::<And>(Mn::And, M::Absolute),
        0x3D => read::<And>(Mn::And, M::AbsoluteX),
        0x39 => read::<And>(Mn::And, M::AbsoluteY),
        0x21 => read::<And>(Mn::And, M::IndirectX),
        0x31 => read::<And>(Mn::And, M::IndirectY),
        0x49 => read::<Eor>(Mn::Eor, M::Immediate),
        0x45 => read::<Eor>(Mn::Eor, M::ZeroPage),
        0x55 => read::<Eor>(Mn::Eor, M::ZeroPageX),
        0x4D => read::<Eor>(Mn::Eor, M::Absolute),
        0x5D => read::<Eor>(Mn::Eor, M::AbsoluteX),
        0x59 => read::<Eor>(Mn::Eor, M::AbsoluteY),
        0x41 => read::<Eor>(Mn::Eor, M::IndirectX),
        0x51 => read::<Eor>(Mn::Eor, M::IndirectY),
        0x69 => read::<Adc>(Mn::Adc, M::Immediate),
        0x65 => read::<Adc>(Mn::Adc, M::ZeroPage),
        0x75 => read::<Adc>(Mn::Adc, M::ZeroPageX),
        0x6D => read::<Adc>(Mn::Adc, M::Absolute),
        0x7D => read::<Adc>(Mn::Adc, M::AbsoluteX),
        0x79 => read::<Adc>(Mn::Adc, M::AbsoluteY),
        0x61 => read::<Adc>(Mn::Adc, M::IndirectX),
        0x71 => read::<Adc>(Mn::Adc, M::IndirectY),
        0xE9 => read::<Sbc>(Mn::Sbc, M::Immediate),
        0xE5 => read::<Sbc>(Mn::Sbc, M::ZeroPage),
        0xF5 => read::<Sbc>(Mn::Sbc, M::ZeroPageX),
        0xED => read::<Sbc>(Mn::Sbc, M::Absolute),
        0xFD => read::<Sbc>(Mn::Sbc, M::AbsoluteX),
        0xF9 => read::<Sbc>(Mn::Sbc, M::AbsoluteY),
        0xE1 => read::<Sbc>(Mn::Sbc, M::IndirectX),
        0xF1 => read::<Sbc>(Mn::Sbc, M::IndirectY),
        0xC9 => read::<Cmp>(Mn::Cmp, M::Immediate),
        0xC5 => read::<Cmp>(Mn::Cmp, M::ZeroPage),
        0xD5 => read::<Cmp>(Mn::Cmp, M::ZeroPageX),
        0xCD => read::<Cmp>(Mn::Cmp, M::Absolute),
        0xDD => read::<Cmp>(Mn::Cmp, M::AbsoluteX),
        0xD9 => read::<Cmp>(Mn::Cmp, M::AbsoluteY),
        0xC1 => read::<Cmp>(Mn::Cmp, M::IndirectX),
        0xD1 => read::<Cmp>(Mn::Cmp, M::IndirectY),
        0xE0 => read::<Cpx>(Mn::Cpx, M::Immediate),
        0xE4 => read::<Cpx>(Mn::Cpx, M::ZeroPage),
        0xEC => read::<Cpx>(Mn::Cpx, M::Absolute),
        0xC0 => read::<Cpy>(Mn::Cpy, M::Immediate),
        0xC4 => read::<Cpy>(Mn::Cpy, M::ZeroPage),
        0xCC => read::<Cpy>(Mn::Cpy, M::Absolute),
        0x24 => read::<Bit>(Mn::Bit, M::ZeroPage),
        0x2C => read::<Bit>(Mn::Bit, M::Absolute),

        // Read-modify-write.
        0x0A => modify::<Asl>(Mn::Asl, M::Accumulator),
        0x06 => modify::<Asl>(Mn::Asl, M::ZeroPage),
        0x16 => modify::<Asl>(Mn::Asl, M::ZeroPageX),
        0x0E => modify::<Asl>(Mn::Asl, M::Absolute),
        0x1E => modify::<Asl>(Mn::Asl, M::AbsoluteX),
        0x4A => modify::<Lsr>(Mn::Lsr, M::Accumulator),
        0x46 => modify::<Lsr>(Mn::Lsr, M::ZeroPage),
        0x56 => modify::<Lsr>(Mn::Lsr, M::ZeroPageX),
        0x4E => modify::<Lsr>(Mn::Lsr, M::Absolute),
        0x5E => modify::<Lsr>(Mn::Lsr, M::AbsoluteX),
        0x2A => modify::<Rol>(Mn::Rol, M::Accumulator),
        0x26 => modify::<Rol>(Mn::Rol, M::ZeroPage),
        0x36 => modify::<Rol>(Mn::Rol, M::ZeroPageX),
        0x2E => modify::<Rol>(Mn::Rol, M::Absolute),
        0x3E => modify::<Rol>(Mn::Rol, M::AbsoluteX),
        0x6A => modify::<Ror>(Mn::Ror, M::Accumulator),
        0x66 => modify::<Ror>(Mn::Ror, M::ZeroPage),
        0x76 => modify::<Ror>(Mn::Ror, M::ZeroPageX),
        0x6E => modify::<Ror>(Mn::Ror, M::Absolute),
        0x7E => modify::<Ror>(Mn::Ror, M::AbsoluteX),
        0xE6 => modify::<Inc>(Mn::Inc, M::ZeroPage),
        0xF6 => modify::<Inc>(Mn::Inc, M::ZeroPageX),
        0xEE => modify::<Inc>(Mn::Inc, M::Absolute),
        0xFE => modify::<Inc>(Mn::Inc, M::AbsoluteX),
        0xC6 => modify::<Dec>(Mn::Dec, M::ZeroPage),
        0xD6 => modify::<Dec>(Mn::Dec, M::ZeroPageX),
        0xCE => modify::<Dec>(Mn::Dec, M::Absolute),
        0xDE => modify::<Dec>(Mn::Dec, M::AbsoluteX),

        // Undocumented read-modify-write combinations share one layout.
        0x03 | 0x07 | 0x0F | 0x13 | 0x17 | 0x1B | 0x1F => {
            modify::<Slo>(Mn::Slo, combo_mode(opcode))
        }
        0x23 | 0x27 | 0x2F | 0x33 | 0x37 | 0x3B | 0x3F => {
            modify::<Rla>(Mn::Rla, combo_mode(opcode))
        }
        0x43 | 0x47 | 0x4F | 0x53 | 0x57 | 0x5B | 0x5F => {
            modify::<Sre>(Mn::Sre, combo_mode(opcode))
        }
        0x63 | 0x67 | 0x6F | 0x73 | 0x77 | 0x7B | 0x7F => {
            modify::<Rra>(Mn::Rra, combo_mode(opcode))
        }
        0xC3 | 0xC7 | 0xCF | 0xD3 | 0xD7 | 0xDB | 0xDF => {
            modify::<Dcp>(Mn::Dcp, combo_mode(opcode))
        }
        0xE3 | 0xE7 | 0xEF | 0xF3 | 0xF7 | 0xFB | 0xFF => {
            modify::<Isc>(Mn::Isc, combo_mode(opcode))
        }

        // Undocumented reads and stores.
        0xA3 => read::<Lax>(Mn::Lax, M::IndirectX),
        0xA7 => read::<Lax>(Mn::Lax, M::ZeroPage),
        0xAF => read::<Lax>(Mn::Lax, M::Absolute),
        0xB3 => read::<Lax>(Mn::Lax, M::IndirectY),
        0xB7 => read::<Lax>(Mn::Lax, M::ZeroPageY),
        0xBF => read::<Lax>(Mn::Lax, M::AbsoluteY),
        0x83 => store::<Sax>(Mn::Sax, M::IndirectX),
        0x87 => store::<Sax>(Mn::Sax, M::ZeroPage),
        0x8F => store::<Sax>(Mn::Sax, M::Absolute),
        0x97 => store::<Sax>(Mn::Sax, M::ZeroPageY),
        0x0B | 0x2B => read::<Anc>(Mn::Anc, M::Immediate),
        0x4B => read::<Alr>(Mn::Alr, M::Immediate),
        0x6B => read::<Arr>(Mn::Arr, M::Immediate),
        0x8B => read::<Ane>(Mn::Ane, M::Immediate),
        0xAB => read::<Lxa>(Mn::Lxa, M::Immediate),
        0xCB => read::<Sbx>(Mn::Sbx, M::Immediate),
        0xEB => read::<Sbc>(Mn::Usbc, M::Immediate),
        0xBB => read::<Las>(Mn::Las, M::AbsoluteY),
        0x93 => unstable::<Sha>(Mn::Sha, M::IndirectY),
        0x9F => unstable::<Sha>(Mn::Sha, M::AbsoluteY),
        0x9E => unstable::<Shx>(Mn::Shx, M::AbsoluteY),
        0x9C => unstable::<Shy>(Mn::Shy, M::AbsoluteX),
        0x9B => unstable::<Tas>(Mn::Tas, M::AbsoluteY),

        // Multi-byte NOPs.
        0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => read::<Nop>(Mn::Dop, M::Immediate),
        0x04 | 0x44 | 0x64 => read::<Nop>(Mn::Dop, M::ZeroPage),
        0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => read::<Nop>(Mn::Dop, M::ZeroPageX),
        0x0C => read::<Nop>(Mn::Top, M::Absolute),
        0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => read::<Nop>(Mn::Top, M::AbsoluteX),

        // Everything left is one of the twelve JAM opcodes.
        _ => jam_instruction(),
    };
    if matches!(opcode, 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA) {
        instruction.illegal = true;
    }
    instruction
}

/// Addressing mode of the `xxxx_xx11` read-modify-write group, from the
/// low bits of the opcode.
fn combo_mode(opcode: u16) -> AddressingMode {
    match opcode & 0x1F {
        0x03 => M::IndirectX,
        0x07 => M::ZeroPage,
        0x0F => M::Absolute,
        0x13 => M::IndirectY,
        0x17 => M::ZeroPageX,
        0x1B => M::AbsoluteY,
        _ => M::AbsoluteX,
    }
}

// ---------------------------------------------------------------------------
// Disassembly
// ---------------------------------------------------------------------------

/// Disassemble the instruction at the start of `bytes`, which was fetched
/// from `pc`. Missing operand bytes are shown as `??`.
#[must_use]
pub fn disassemble(pc: u16, bytes: &[u8]) -> String {
    let Some(&opcode) = bytes.first() else {
        return String::from("???");
    };
    let instruction = instruction(opcode);
    let name = instruction.mnemonic.name();
    let lo = bytes.get(1).copied();
    let hi = bytes.get(2).copied();
    let byte = || lo.map_or_else(|| String::from("??"), |b| format!("{b:02X}"));
    let word = || match (lo, hi) {
        (Some(lo), Some(hi)) => format!("{:04X}", u16::from_le_bytes([lo, hi])),
        _ => String::from("????"),
    };
    match instruction.mode {
        M::Implied => name.to_owned(),
        M::Accumulator => format!("{name} A"),
        M::Immediate => format!("{name} #${}", byte()),
        M::ZeroPage => format!("{name} ${}", byte()),
        M::ZeroPageX => format!("{name} ${},X", byte()),
        M::ZeroPageY => format!("{name} ${},Y", byte()),
        M::Absolute => format!("{name} ${}", word()),
        M::AbsoluteX => format!("{name} ${},X", word()),
        M::AbsoluteY => format!("{name} ${},Y", word()),
        M::Indirect => format!("{name} (${})", word()),
        M::IndirectX => format!("{name} (${},X)", byte()),
        M::IndirectY => format!("{name} (${}),Y", byte()),
        M::Relative => match lo {
            Some(offset) => {
                let target = pc.wrapping_add(2).wrapping_add_signed(i16::from(offset as i8));
                format!("{name} ${target:04X}")
            }
            None => format!("{name} $????"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combo_modes_follow_opcode_columns() {
        assert_eq!(combo_mode(0x03), M::IndirectX);
        assert_eq!(combo_mode(0xFB), M::AbsoluteY);
        assert_eq!(combo_mode(0x5F), M::AbsoluteX);
    }

    #[test]
    fn twelve_opcodes_jam() {
        let jams: Vec<u8> = (0..=0xFFu8)
            .filter(|&op| instruction(op).mnemonic == Mn::Jam)
            .collect();
        assert_eq!(
            jams,
            [0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
        );
    }

    #[test]
    fn illegal_flag_covers_nop_duplicates() {
        assert!(!instruction(0xEA).illegal);
        assert!(instruction(0x1A).illegal);
        assert!(instruction(0x04).illegal);
        assert!(instruction(0xEB).illegal);
        assert!(!instruction(0xE9).illegal);
    }

    #[test]
    fn sequences_fit_the_table() {
        for entry in instruction_table() {
            assert!(usize::from(entry.micro_op_count()) <= MAX_MICRO_OPS);
        }
        assert_eq!(instruction_table()[usize::from(NMI_OPCODE)].cycles, 7);
        assert_eq!(instruction_table()[usize::from(IRQ_OPCODE)].mnemonic, Mn::Irq);
    }

    #[test]
    fn disassembles_each_operand_shape() {
        assert_eq!(disassemble(0, &[0xA9, 0x42]), "LDA #$42");
        assert_eq!(disassemble(0, &[0xBD, 0x34, 0x12]), "LDA $1234,X");
        assert_eq!(disassemble(0, &[0x6C, 0xFF, 0x10]), "JMP ($10FF)");
        assert_eq!(disassemble(0, &[0xB1, 0x80]), "LDA ($80),Y");
        assert_eq!(disassemble(0, &[0x0A]), "ASL A");
        assert_eq!(disassemble(0x0200, &[0xD0, 0xFE]), "BNE $0200");
        assert_eq!(disassemble(0, &[0xAD, 0x34]), "LDA $????");
    }

    #[test]
    fn addressing_mode_sizes() {
        assert_eq!(instruction(0xEA).mode.size(), 1);
        assert_eq!(instruction(0xA9).mode.size(), 2);
        assert_eq!(instruction(0x20).mode.size(), 3);
        assert_eq!(instruction(0xF0).mode.size(), 2);
    }

    #[test]
    fn brk_counts_its_padding_byte() {
        assert_eq!(instruction(0x00).mode, M::Implied);
        assert_eq!(instruction(0x00).size(), 2);
        assert_eq!(instruction(0x40).size(), 1);
        assert_eq!(instruction(0x6C).size(), 3);
    }

    #[test]
    fn mnemonics_carry_a_description() {
        assert_eq!(Mn::Lda.description(), "load accumulator");
        assert_eq!(Mn::Nop.description(), "no operation");
        assert!(
            instruction_table()
                .iter()
                .all(|entry| !entry.mnemonic.description().is_empty())
        );
    }
}

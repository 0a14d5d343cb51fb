//! Instruction behaviour: results, flags and interrupt handling.

use emu_core::{Bus, Cpu, SimpleBus};
use mos_6502::{Mos6502, UNSTABLE_MAGIC, flags};

/// Run one complete instruction (fetch + execute cycles). Returns the
/// number of cycles it took.
fn run_instruction(cpu: &mut Mos6502, bus: &mut SimpleBus) -> u32 {
    cpu.tick(bus);
    let mut cycles = 1;
    for _ in 0..20 {
        if cpu.is_instruction_complete() {
            return cycles;
        }
        cpu.tick(bus);
        cycles += 1;
    }
    panic!("Instruction did not complete within 20 cycles");
}

/// Load a program at $0200 and set PC there.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Mos6502, program: &[u8]) {
    bus.load(0x0200, program);
    cpu.regs.pc = 0x0200;
}

fn set_vector(bus: &mut SimpleBus, vector: u16, target: u16) {
    let [lo, hi] = target.to_le_bytes();
    bus.write(vector, lo);
    bus.write(vector.wrapping_add(1), hi);
}

#[test]
fn pha_pla_round_trips_through_stack() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    let program = [
        0xA9, 0x42, // LDA #$42
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x48, // PHA
        0xA9, 0x00, // LDA #$00
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..6 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.regs.a, 0x42, "PLA should restore A");
    assert_eq!(cpu.regs.s, 0xFF);
    assert!(!cpu.regs.p.is_set(flags::Z), "PLA sets Z from the pulled byte");
}

#[test]
fn php_pushes_break_and_plp_discards_it() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    let program = [
        0x38, // SEC
        0x08, // PHP
        0x18, // CLC
        0x28, // PLP
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..4 {
        run_instruction(&mut cpu, &mut bus);
    }

    let pushed = bus.peek(0x01FD);
    assert_eq!(pushed & 0x30, 0x30, "PHP pushes B and U");
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(!cpu.regs.p.is_set(flags::B), "B is not a real flag");
    assert!(cpu.regs.p.is_set(flags::U));
}

#[test]
fn brk_pushes_return_past_padding_byte() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFE, 0x0300);
    let program = [
        0x58, // CLI         @ $0200
        0x00, // BRK         @ $0201
        0xEA, // padding     @ $0202
    ];
    setup_program(&mut bus, &mut cpu, &program);
    cpu.regs.s = 0xFF;

    run_instruction(&mut cpu, &mut bus);
    let cycles = run_instruction(&mut cpu, &mut bus);

    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc(), 0x0300);
    assert_eq!(cpu.regs.s, 0xFC);
    assert!(cpu.regs.p.is_set(flags::I));
    assert_eq!(bus.peek(0x01FF), 0x02);
    assert_eq!(bus.peek(0x01FE), 0x03);
    assert_eq!(bus.peek(0x01FD), 0x30, "U and B set, I clear");
}

#[test]
fn brk_vector_is_not_taken_from_stale_operand_address() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFE, 0x0300);
    bus.write(0x1234, 0x42);
    let program = [
        0xAD, 0x34, 0x12, // LDA $1234
        0x00, // BRK
        0xEA,
    ];
    setup_program(&mut bus, &mut cpu, &program);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.pc(), 0x0300);
}

#[test]
fn rti_restores_status_and_pc() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFE, 0x0300);
    bus.write(0x0300, 0x40); // RTI
    let program = [
        0x38, // SEC
        0x00, // BRK
        0xEA, // padding
        0xE8, // INX
    ];
    setup_program(&mut bus, &mut cpu, &program);
    cpu.regs.p.clear(flags::I);

    run_instruction(&mut cpu, &mut bus); // SEC
    run_instruction(&mut cpu, &mut bus); // BRK
    let cycles = run_instruction(&mut cpu, &mut bus); // RTI

    assert_eq!(cycles, 6);
    assert_eq!(cpu.pc(), 0x0203);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(!cpu.regs.p.is_set(flags::I));
    assert_eq!(cpu.regs.s, 0xFD);
}

#[test]
fn jsr_rts_returns_after_operand() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0300, 0x60); // RTS
    let program = [
        0x20, 0x00, 0x03, // JSR $0300
        0xE8, // INX
    ];
    setup_program(&mut bus, &mut cpu, &program);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.pc(), 0x0300);
    assert_eq!(bus.peek(0x01FD), 0x02);
    assert_eq!(bus.peek(0x01FC), 0x02, "pushed address is the last operand byte");
    assert_eq!(run_instruction(&mut cpu, &mut bus), 6);
    assert_eq!(cpu.pc(), 0x0203);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.x, 1);
}

#[test]
fn jmp_indirect_wraps_within_page() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x10FF, 0x34);
    bus.write(0x1000, 0x12);
    bus.write(0x1100, 0x56);
    setup_program(&mut bus, &mut cpu, &[0x6C, 0xFF, 0x10]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.pc(), 0x1234);
}

#[test]
fn taken_branch_costs_one_more_cycle_and_two_across_a_page() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    // BNE +2 with Z clear, same page.
    setup_program(&mut bus, &mut cpu, &[0xD0, 0x02]);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.pc(), 0x0204);

    // BNE -6 from $0200 lands on $01FC.
    setup_program(&mut bus, &mut cpu, &[0xD0, 0xFA]);
    assert_eq!(run_instruction(&mut cpu, &mut bus), 4);
    assert_eq!(cpu.pc(), 0x01FC);
}

#[test]
fn indexed_read_adds_cycle_only_on_page_cross() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x1101, 0x77);
    setup_program(&mut bus, &mut cpu, &[0xBD, 0xFF, 0x10]);
    cpu.regs.x = 2;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(cpu.regs.a, 0x77);
}

#[test]
fn adc_ignores_decimal_mode() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    let program = [
        0xF8, // SED
        0xA9, 0x19, // LDA #$19
        0x69, 0x01, // ADC #$01
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert!(cpu.regs.p.is_set(flags::D));
    assert_eq!(cpu.regs.a, 0x1A);
}

#[test]
fn sbc_sets_overflow_on_signed_underflow() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    let program = [
        0x38, // SEC
        0xA9, 0x80, // LDA #$80
        0xE9, 0x01, // SBC #$01
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..3 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.regs.a, 0x7F);
    assert!(cpu.regs.p.is_set(flags::V));
    assert!(cpu.regs.p.is_set(flags::C));
}

// ============================================================================
// Undocumented opcodes
// ============================================================================

#[test]
fn lax_loads_a_and_x() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0x80);
    setup_program(&mut bus, &mut cpu, &[0xA7, 0x10]);

    assert_eq!(run_instruction(&mut cpu, &mut bus), 3);
    assert_eq!(cpu.regs.a, 0x80);
    assert_eq!(cpu.regs.x, 0x80);
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn sax_stores_a_and_x_without_touching_flags() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x87, 0x10]);
    cpu.regs.a = 0xF0;
    cpu.regs.x = 0x3C;
    let before = cpu.regs.p;

    run_instruction(&mut cpu, &mut bus);

    assert_eq!(bus.peek(0x0010), 0x30);
    assert_eq!(cpu.regs.p, before);
}

#[test]
fn dcp_decrements_then_compares() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0x43);
    setup_program(&mut bus, &mut cpu, &[0xC7, 0x10]);
    cpu.regs.a = 0x42;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(bus.peek(0x0010), 0x42);
    assert!(cpu.regs.p.is_set(flags::Z));
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn isc_increments_then_subtracts() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0x0F);
    setup_program(&mut bus, &mut cpu, &[0xE7, 0x10]);
    cpu.regs.a = 0x20;
    cpu.regs.p.set(flags::C);

    run_instruction(&mut cpu, &mut bus);

    assert_eq!(bus.peek(0x0010), 0x10);
    assert_eq!(cpu.regs.a, 0x10);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn slo_shifts_memory_and_ors_into_a() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0x81);
    setup_program(&mut bus, &mut cpu, &[0x07, 0x10]);
    cpu.regs.a = 0x01;

    run_instruction(&mut cpu, &mut bus);

    assert_eq!(bus.peek(0x0010), 0x02);
    assert_eq!(cpu.regs.a, 0x03);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn rra_rotates_right_then_adds_with_new_carry() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x0010, 0x03);
    setup_program(&mut bus, &mut cpu, &[0x67, 0x10]);
    cpu.regs.a = 0x10;

    run_instruction(&mut cpu, &mut bus);

    // ROR $03 -> $01 with C=1, then $10 + $01 + 1.
    assert_eq!(bus.peek(0x0010), 0x01);
    assert_eq!(cpu.regs.a, 0x12);
}

#[test]
fn anc_copies_bit_seven_into_carry() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x0B, 0xF0]);
    cpu.regs.a = 0x81;

    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::N));
}

#[test]
fn arr_sets_carry_and_overflow_from_bits_six_and_five() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x6B, 0xFF]);
    cpu.regs.a = 0x80;
    cpu.regs.p.set(flags::C);

    run_instruction(&mut cpu, &mut bus);

    // ($80 >> 1) | $80 = $C0: bit 6 set, bit 5 clear.
    assert_eq!(cpu.regs.a, 0xC0);
    assert!(cpu.regs.p.is_set(flags::C));
    assert!(cpu.regs.p.is_set(flags::V));
}

#[test]
fn sbx_subtracts_from_a_and_x() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0xCB, 0x02]);
    cpu.regs.a = 0x0F;
    cpu.regs.x = 0x07;

    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.regs.x, 0x05);
    assert_eq!(cpu.regs.a, 0x0F);
    assert!(cpu.regs.p.is_set(flags::C));
}

#[test]
fn ane_and_lxa_use_magic_constant() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x8B, 0xFF, 0xAB, 0xFF]);
    cpu.regs.a = 0x00;
    cpu.regs.x = 0xFF;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, UNSTABLE_MAGIC);

    cpu.regs.a = 0x01;
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, UNSTABLE_MAGIC | 0x01);
    assert_eq!(cpu.regs.x, UNSTABLE_MAGIC | 0x01);
}

#[test]
fn las_ands_memory_with_stack_pointer() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    bus.write(0x1000, 0x3C);
    setup_program(&mut bus, &mut cpu, &[0xBB, 0x00, 0x10]);
    cpu.regs.s = 0xF5;

    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.regs.a, 0x34);
    assert_eq!(cpu.regs.x, 0x34);
    assert_eq!(cpu.regs.s, 0x34);
}

#[test]
fn shx_without_page_cross_stores_x_and_high_plus_one() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x9E, 0x00, 0x12]);
    cpu.regs.x = 0xFF;
    cpu.regs.y = 0x05;

    assert_eq!(run_instruction(&mut cpu, &mut bus), 5);
    assert_eq!(bus.peek(0x1205), 0x13);
}

#[test]
fn sha_page_cross_replaces_high_byte_with_value() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x9F, 0xF0, 0x12]);
    cpu.regs.a = 0xFF;
    cpu.regs.x = 0x0F;
    cpu.regs.y = 0x20;

    run_instruction(&mut cpu, &mut bus);

    // value = $FF & $0F & ($12 + 1) = $03, written to $03:10.
    assert_eq!(bus.peek(0x0310), 0x03);
    assert_eq!(bus.peek(0x1310), 0x00);
}

#[test]
fn tas_loads_stack_pointer_before_storing() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x9B, 0x00, 0x40]);
    cpu.regs.a = 0xF3;
    cpu.regs.x = 0x3F;

    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.regs.s, 0x33);
    assert_eq!(bus.peek(0x4000), 0x33 & 0x41);
}

#[test]
fn jam_never_completes_and_reports_halted() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    setup_program(&mut bus, &mut cpu, &[0x02, 0xE8]);

    for _ in 0..50 {
        cpu.tick(&mut bus);
    }

    assert!(cpu.is_halted());
    assert!(!cpu.is_instruction_complete());
    assert_eq!(cpu.regs.x, 0);

    cpu.reset_to_known(&mut bus);
    assert!(!cpu.is_halted(), "reset clears the jam");
}

// ============================================================================
// Interrupts
// ============================================================================

#[test]
fn held_nmi_line_is_serviced_once() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFA, 0x0300);
    // Handler: INX, then JMP $0301 spins on itself.
    bus.load(0x0300, &[0xE8, 0x4C, 0x01, 0x03]);
    setup_program(&mut bus, &mut cpu, &[0xEA, 0xEA, 0xEA, 0xEA]);

    cpu.set_nmi_line(true);
    for _ in 0..100 {
        cpu.tick(&mut bus);
    }

    assert_eq!(cpu.regs.x, 1, "exactly one NMI entry");
    assert!(!cpu.nmi_pending());
}

#[test]
fn nmi_pulse_is_serviced_after_current_instruction() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFA, 0x0300);
    setup_program(&mut bus, &mut cpu, &[0xAD, 0x00, 0x10, 0xEA]);

    cpu.tick(&mut bus);
    cpu.set_nmi_line(true);
    cpu.tick(&mut bus);
    cpu.set_nmi_line(false);
    while !cpu.is_instruction_complete() {
        cpu.tick(&mut bus);
    }
    assert!(cpu.nmi_pending());

    let cycles = run_instruction(&mut cpu, &mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc(), 0x0300);
    assert_eq!(bus.peek(0x01FD), 0x02);
    assert_eq!(bus.peek(0x01FC), 0x03, "returns to the instruction after LDA");
    assert_eq!(bus.peek(0x01FB) & flags::B, 0, "NMI pushes B clear");
}

#[test]
fn irq_is_level_sensitive_and_masked_by_i() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFE, 0x0300);
    bus.load(0x0300, &[0xE8, 0x40]); // INX; RTI
    setup_program(&mut bus, &mut cpu, &[0x58, 0xEA, 0x78, 0xEA]); // CLI NOP SEI NOP

    cpu.set_irq_line(true);
    run_instruction(&mut cpu, &mut bus); // CLI
    assert_eq!(run_instruction(&mut cpu, &mut bus), 7, "IRQ entry");
    assert_eq!(cpu.pc(), 0x0300);
    run_instruction(&mut cpu, &mut bus); // INX
    cpu.set_irq_line(false);
    run_instruction(&mut cpu, &mut bus); // RTI
    assert_eq!(cpu.pc(), 0x0201);
    run_instruction(&mut cpu, &mut bus); // NOP
    assert_eq!(cpu.regs.x, 1);
}

#[test]
fn nmi_during_brk_hijacks_vector() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFE, 0x0300);
    set_vector(&mut bus, 0xFFFA, 0x0400);
    setup_program(&mut bus, &mut cpu, &[0x00, 0xEA]);

    cpu.tick(&mut bus); // opcode
    cpu.tick(&mut bus); // padding
    cpu.set_nmi_line(true);
    while !cpu.is_instruction_complete() {
        cpu.tick(&mut bus);
    }

    assert_eq!(cpu.pc(), 0x0400);
    assert!(!cpu.nmi_pending(), "hijack consumes the NMI");
    assert_eq!(bus.peek(0x01FB) & flags::B, flags::B, "B still pushed set");
}

#[test]
fn cold_reset_is_idempotent() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFC, 0x8000);
    bus.load(0x8000, &[0xA9, 0x55, 0xE8, 0x48]);

    cpu.reset_to_known(&mut bus);
    for _ in 0..7 {
        cpu.tick(&mut bus);
    }
    cpu.reset_to_known(&mut bus);
    let first = cpu.registers();
    cpu.reset_to_known(&mut bus);

    assert_eq!(cpu.registers(), first);
    assert_eq!(cpu.pc(), 0x8000);
    assert_eq!(cpu.total_cycles(), 0);
    assert!(cpu.is_instruction_complete());
}

#[test]
fn warm_reset_mid_instruction_restarts_at_vector() {
    let mut bus = SimpleBus::new();
    let mut cpu = Mos6502::new();
    set_vector(&mut bus, 0xFFFC, 0x8000);
    setup_program(&mut bus, &mut cpu, &[0xEE, 0x00, 0x10]);
    cpu.regs.a = 0x5A;

    cpu.tick(&mut bus);
    cpu.tick(&mut bus);
    cpu.reset_analog(&mut bus);

    assert!(cpu.is_instruction_complete());
    assert_eq!(cpu.pc(), 0x8000);
    assert_eq!(cpu.regs.a, 0x5A);
    assert_eq!(cpu.regs.s, 0xFA);
}

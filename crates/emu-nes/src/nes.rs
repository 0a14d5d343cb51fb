//! Top-level NES system.
//!
//! One `tick()` is one CPU cycle. Within a cycle the order is fixed: the
//! CPU runs one micro-op against the bus, the APU ticks, and the APU's IRQ
//! output is copied onto the CPU's IRQ input for the next cycle.

use emu_core::{Cpu, Observable, Tickable, Ticks, Value};
use log::{Level, debug, info, log_enabled, trace};
use mos_6502::{Mos6502, disassemble, instruction};
use nes_bus::{AddressSpace, Mapper, RomImage};
use ricoh_apu_2a03::{Apu, apply_memory_map};

use crate::board::{self, Board};
use crate::config::{NesConfig, NesRegion};
use crate::error::NesError;
use crate::nrom::Nrom;

/// NES system.
pub struct Nes {
    cpu: Mos6502,
    cpu_bus: AddressSpace<Board>,
    chr_bus: AddressSpace<Board>,
    board: Board,
    region: NesRegion,
    /// CPU cycles since the last cold reset.
    cycles: u64,
}

impl Nes {
    /// Build a console around an NROM image and cold-reset it.
    ///
    /// Fails if the frame timing table is invalid, the image does not fit
    /// NROM, or the address spaces cannot be built.
    pub fn new(config: &NesConfig, rom: &RomImage) -> Result<Self, NesError> {
        let timing = config.effective_timing();
        timing.validate()?;

        let mut cartridge = Nrom::default();
        cartridge.init_with_rom(rom)?;

        let mut cpu_bus = AddressSpace::new("cpu");
        let mut chr_bus = AddressSpace::new("chr");
        board::install_ram(&mut cpu_bus)?;
        apply_memory_map(&mut cpu_bus)?;
        cartridge.apply_map(&mut cpu_bus, &mut chr_bus)?;

        let mut nes = Self {
            cpu: Mos6502::new(),
            cpu_bus,
            chr_bus,
            board: Board::new(Apu::new(timing), cartridge),
            region: config.region,
            cycles: 0,
        };
        nes.reset_to_known();
        info!(
            "NES ready: {:?}, {} KiB PRG, {} devices on the CPU bus, reset to ${:04X}",
            nes.region,
            nes.board.cartridge.prg_len() / 1024,
            nes.cpu_bus.device_count(),
            nes.cpu.pc()
        );
        Ok(nes)
    }

    /// Run `cycles` CPU cycles.
    pub fn run_cycles(&mut self, cycles: u64) {
        self.tick_n(Ticks::new(cycles));
    }

    /// Run until the CPU finishes its current instruction. Returns the
    /// cycles spent, or `None` if the CPU is jammed.
    pub fn step_instruction(&mut self) -> Option<u64> {
        if self.cpu.is_halted() {
            return None;
        }
        if log_enabled!(Level::Trace) {
            let pc = self.cpu.pc();
            let description = self
                .board
                .peek(pc)
                .map_or("", |opcode| instruction(opcode).mnemonic.description());
            trace!("${pc:04X}  {:<12} ; {description}", self.disassemble_at_pc());
        }
        let start = self.cycles;
        self.tick();
        while !self.cpu.is_instruction_complete() {
            if self.cpu.is_halted() {
                return None;
            }
            self.tick();
        }
        Some(self.cycles - start)
    }

    /// Disassemble the instruction at PC. Bytes outside RAM and PRG show
    /// as `??`.
    #[must_use]
    pub fn disassemble_at_pc(&self) -> String {
        let pc = self.cpu.pc();
        let size = self
            .board
            .peek(pc)
            .map_or(1, |opcode| instruction(opcode).size());
        let bytes: Vec<u8> = (0..size)
            .map_while(|offset| self.board.peek(pc.wrapping_add(offset)))
            .collect();
        disassemble(pc, &bytes)
    }

    /// Drive the CPU's NMI input. The PPU normally owns this line.
    pub fn set_nmi_line(&mut self, asserted: bool) {
        self.cpu.set_nmi_line(asserted);
    }

    /// Power cycle: clear RAM and return the CPU and APU to their
    /// power-on state.
    pub fn reset_to_known(&mut self) {
        self.board.ram.fill(0);
        self.board.cartridge.reset_to_known();
        self.board.apu.reset_to_known();
        self.cpu.set_nmi_line(false);
        self.cpu.set_irq_line(false);
        let mut bus = self.cpu_bus.attach(&mut self.board);
        self.cpu.reset_to_known(&mut bus);
        self.cycles = 0;
        debug!("NES cold reset");
    }

    /// Reset button: RAM and APU channel registers survive.
    pub fn reset_analog(&mut self) {
        self.board.apu.reset_analog();
        self.cpu.set_irq_line(false);
        let mut bus = self.cpu_bus.attach(&mut self.board);
        self.cpu.reset_analog(&mut bus);
        debug!("NES warm reset");
    }

    /// Read the CPU bus as the CPU would, side effects included.
    pub fn cpu_read(&mut self, address: u16) -> u8 {
        self.cpu_bus.read(&mut self.board, address)
    }

    /// Write the CPU bus as the CPU would.
    pub fn cpu_write(&mut self, address: u16, value: u8) {
        self.cpu_bus.write(&mut self.board, address, value);
    }

    /// Read the CHR bus.
    pub fn chr_read(&mut self, address: u16) -> u8 {
        self.chr_bus.read(&mut self.board, address)
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6502 {
        &mut self.cpu
    }

    #[must_use]
    pub fn apu(&self) -> &Apu {
        &self.board.apu
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn cpu_bus(&self) -> &AddressSpace<Board> {
        &self.cpu_bus
    }

    #[must_use]
    pub fn chr_bus(&self) -> &AddressSpace<Board> {
        &self.chr_bus
    }

    #[must_use]
    pub fn region(&self) -> NesRegion {
        self.region
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl Tickable for Nes {
    fn tick(&mut self) {
        let mut bus = self.cpu_bus.attach(&mut self.board);
        self.cpu.tick(&mut bus);

        self.board.apu.tick();
        self.cpu.set_irq_line(self.board.apu.irq_pending());

        self.cycles += 1;
    }
}

fn parse_address(text: &str) -> Option<u16> {
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
    {
        u16::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

impl Observable for Nes {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("apu.") {
            self.board.apu.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            let address = parse_address(rest)?;
            (address <= 0x1FFF).then(|| Value::U8(self.board.peek_ram(address)))
        } else {
            match path {
                "cycles" => Some(self.cycles.into()),
                "open_bus" => Some(self.cpu_bus.open_bus().into()),
                "region" => Some(
                    match self.region {
                        NesRegion::Ntsc => "ntsc",
                        NesRegion::Pal => "pal",
                    }
                    .into(),
                ),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<6502_paths>",
            "apu.<2a03_paths>",
            "memory.<address>",
            "cycles",
            "open_bus",
            "region",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 32K of NOPs with the reset vector at $8000.
    fn nop_image() -> RomImage {
        let mut prg = vec![0xEA; 0x8000];
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        RomImage::new(prg, vec![0; 0x2000])
    }

    fn make_nes() -> Nes {
        Nes::new(&NesConfig::default(), &nop_image()).expect("valid console")
    }

    #[test]
    fn cold_reset_loads_vector() {
        let nes = make_nes();
        assert_eq!(nes.cpu().pc(), 0x8000);
        assert_eq!(nes.cycles(), 0);
    }

    #[test]
    fn nop_takes_two_cycles() {
        let mut nes = make_nes();
        assert_eq!(nes.step_instruction(), Some(2));
        assert_eq!(nes.cpu().pc(), 0x8001);
    }

    #[test]
    fn disassembles_from_prg() {
        let mut nes = make_nes();
        assert_eq!(nes.disassemble_at_pc(), "NOP");
        nes.cpu_mut().regs.pc = 0x0010;
        nes.cpu_write(0x0010, 0xA9);
        nes.cpu_write(0x0011, 0x42);
        assert_eq!(nes.disassemble_at_pc(), "LDA #$42");
        nes.cpu_write(0x0010, 0x00);
        assert_eq!(nes.disassemble_at_pc(), "BRK");
    }

    #[test]
    fn open_bus_path_shows_last_bus_value() {
        let mut nes = make_nes();
        nes.cpu_write(0x0000, 0x5C);
        assert_eq!(nes.query("open_bus"), Some(Value::U8(0x5C)));
        assert_eq!(nes.cpu_read(0x4016), 0x5C);
    }

    #[test]
    fn run_cycles_counts() {
        let mut nes = make_nes();
        nes.run_cycles(100);
        assert_eq!(nes.cycles(), 100);
        assert_eq!(nes.query("apu.cycle"), Some(Value::U64(100)));
    }

    #[test]
    fn observable_memory() {
        let mut nes = make_nes();
        nes.cpu_write(0x0800, 0xAB);
        assert_eq!(nes.query("memory.0x0000"), Some(Value::U8(0xAB)));
        assert_eq!(nes.query("memory.$1800"), Some(Value::U8(0xAB)));
        assert_eq!(nes.query("memory.0x8000"), None);
    }

    #[test]
    fn observable_forwards_prefixes() {
        let nes = make_nes();
        assert_eq!(nes.query("cpu.pc"), Some(Value::U16(0x8000)));
        assert_eq!(nes.query("apu.frame.mode"), Some(Value::from("4-step")));
        assert_eq!(nes.query("region"), Some(Value::from("ntsc")));
    }

    #[test]
    fn invalid_timing_is_rejected_before_start() {
        let mut timing = NesRegion::Ntsc.frame_timing();
        timing.four_step.wrap = timing.four_step.clock;
        let config = NesConfig::default().with_frame_timing(timing);
        let err = Nes::new(&config, &nop_image()).err().expect("bad table");
        assert!(matches!(err, NesError::Timing(_)));
    }

    #[test]
    fn oversized_prg_is_rejected() {
        let image = RomImage::new(vec![0; 0x10000], vec![]);
        let err = Nes::new(&NesConfig::default(), &image).err().expect("64 KiB PRG");
        assert!(matches!(err, NesError::Bus(_)));
    }
}

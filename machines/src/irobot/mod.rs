use std::io::Write;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use irobot_core::core::machine::{InputButton, Machine, StateError};
use irobot_core::core::{Bus, BusMaster, InterruptState, PageHandler, PageMap};
use irobot_core::cpu::Cpu;
use irobot_core::device::display_list::{DisplayListBuilder, DisplayListQueue};
use irobot_core::device::mathbox::{Mathbox, MathboxConfig, MathboxState, RAM_WORDS};
use irobot_core::device::palette::HardwarePalette;
use irobot_core::device::quad_pokey::{
    AudioSink, DIP_SWITCH_OFFSET, NUM_CHIPS, QuadPokey, QuadPokeyState, SAMPLE_RATE,
};

use crate::rom_loader::{RomEntry, RomLoadError, RomRegion, RomSet};

mod alphanumerics;
pub mod banks;
pub mod registers;

use alphanumerics::Alphanumerics;
use banks::{BANK_SIZE, Memory, Selection};
use registers::{
    COIN_AUX, COIN_L, COIN_R, EXT_START, FIRE, LEFT_COIN_COUNTER, MATH_START, MB_DONE,
    RIGHT_COIN_COUNTER, ReadPort, Registers, START_1, START_2, TEST, VBLANK, WritePort,
    set_active_low,
};

// ---------------------------------------------------------------------------
// I, Robot ROM definitions
// ---------------------------------------------------------------------------

/// Banked program ROM: six 8KB banks at 0x4000-0x5FFF.
pub static PROGRAM_ROM: RomRegion = RomRegion {
    size: 0xC000,
    entries: &[
        RomEntry {
            name: "136029-405",
            size: 0x4000,
            offset: 0x0000,
            checksum: Some(0x150A97),
        },
        RomEntry {
            name: "136029-206",
            size: 0x4000,
            offset: 0x4000,
            checksum: Some(0x174942),
        },
        RomEntry {
            name: "136029-207",
            size: 0x4000,
            offset: 0x8000,
            checksum: Some(0x17384C),
        },
    ],
};

/// Fixed program ROM at 0x6000-0xFFFF.
pub static FIXED_ROM: RomRegion = RomRegion {
    size: 0xA000,
    entries: &[
        RomEntry {
            name: "136029-208",
            size: 0x2000,
            offset: 0x0000,
            checksum: Some(0x0D5E26),
        },
        RomEntry {
            name: "136029-209",
            size: 0x4000,
            offset: 0x2000,
            checksum: Some(0x1A1B59),
        },
        RomEntry {
            name: "136029-210",
            size: 0x4000,
            offset: 0x6000,
            checksum: Some(0x179092),
        },
    ],
};

/// Mathbox geometry ROM, low bytes of each word.
pub static MATHBOX_LO_ROM: RomRegion = RomRegion {
    size: 0x6000,
    entries: &[
        RomEntry {
            name: "136029-103",
            size: 0x2000,
            offset: 0x0000,
            checksum: Some(0x6A797),
        },
        RomEntry {
            name: "136029-101",
            size: 0x4000,
            offset: 0x2000,
            checksum: Some(0x150247),
        },
    ],
};

/// Mathbox geometry ROM, high bytes of each word.
pub static MATHBOX_HI_ROM: RomRegion = RomRegion {
    size: 0x6000,
    entries: &[
        RomEntry {
            name: "136029-104",
            size: 0x2000,
            offset: 0x0000,
            checksum: Some(0x43382),
        },
        RomEntry {
            name: "136029-102",
            size: 0x4000,
            offset: 0x2000,
            checksum: Some(0xF557F),
        },
    ],
};

pub static ALPHA_ROM: RomRegion = RomRegion {
    size: 0x800,
    entries: &[RomEntry {
        name: "136029-124",
        size: 0x800,
        offset: 0,
        checksum: Some(0x2069D),
    }],
};

pub static COLOR_PROM: RomRegion = RomRegion {
    size: 0x20,
    entries: &[RomEntry {
        name: "136029-125",
        size: 0x20,
        offset: 0,
        checksum: Some(0x42C),
    }],
};

// ---------------------------------------------------------------------------
// Input button IDs
// ---------------------------------------------------------------------------
pub const INPUT_COIN_LEFT: u8 = 0;
pub const INPUT_COIN_RIGHT: u8 = 1;
pub const INPUT_COIN_AUX: u8 = 2;
pub const INPUT_START1: u8 = 3;
pub const INPUT_START2: u8 = 4;
pub const INPUT_FIRE: u8 = 5;
pub const INPUT_TEST: u8 = 6;

// Analog axes for `set_analog`
pub const AXIS_X: u8 = 0;
pub const AXIS_Y: u8 = 1;

const IROBOT_INPUT_MAP: &[InputButton] = &[
    InputButton { id: INPUT_COIN_LEFT, name: "Coin Left" },
    InputButton { id: INPUT_COIN_RIGHT, name: "Coin Right" },
    InputButton { id: INPUT_COIN_AUX, name: "Coin Aux" },
    InputButton { id: INPUT_START1, name: "P1 Start" },
    InputButton { id: INPUT_START2, name: "P2 Start" },
    InputButton { id: INPUT_FIRE, name: "Fire" },
    InputButton { id: INPUT_TEST, name: "Test" },
];

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
// CPU clock: 1.508625 MHz (6809E E clock)
// Dot clock: 5 MHz, 320 dots per line, 256 lines
// Frame rate: 5 MHz / (320 * 256) ≈ 61.04 Hz
pub const CPU_CLOCK_HZ: u64 = 1_508_625;
const DOT_CLOCK_HZ: u64 = 5_000_000;
const DOTS_PER_LINE: u64 = 320;
pub const LINES_PER_FRAME: u64 = 256;
const VBLANK_START: u64 = 240;
/// CPU cycles without a watchdog clear before the board resets.
pub const WATCHDOG_CYCLES: u64 = 500_000;

pub const EEPROM_SIZE: usize = 0x100;
const ADC_IDLE: u8 = 0x80;

const STATE_MACHINE: &str = "irobot";
const STATE_VERSION: u32 = 1;

/// Board jumpers and emulation switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Coinage switches at 3J.
    pub dip_3j: u8,
    /// Game option switches at 5E, read through the POKEY page.
    pub dip_5e: u8,
    pub sound: bool,
    /// CPU clock multiplier; 1 runs at the nominal board clock.
    pub cpu_speedup: u32,
    /// Replace the diagnostic Mathbox table (see [`self_test`]).
    pub patch_self_test: bool,
    pub mathbox: MathboxConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            dip_3j: 0x00, // 1 coin 1 play
            dip_5e: 0x43, // English, no time limit, medium difficulty
            sound: true,
            cpu_speedup: 1,
            patch_self_test: true,
            mathbox: MathboxConfig::default(),
        }
    }
}

/// Page handlers behind [`PageTarget::Device`](irobot_core::core::PageTarget).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Inputs,
    Registers,
    Eeprom,
    Adc,
    Pokey,
    Palette,
    Watchdog,
    FirqAck,
    AdcStart,
    MathboxRam,
}

/// Everything a device page can reach. Kept apart from the page map so a
/// bus access can borrow both at once.
struct Hardware {
    config: BoardConfig,
    regs: Registers,
    inrd1: u8,
    inrd2: u8,
    vblank: bool,
    irq: bool,
    firq: bool,
    watchdog: u64,
    eeprom: Vec<u8>,
    adc: u8,
    analog: [u8; 2],
    pokeys: QuadPokey,
    palette: HardwarePalette,
    mathbox: Mathbox,
    builder: DisplayListBuilder,
    rng: StdRng,
    /// A latch write changed the bank decode.
    remap: bool,
}

impl Hardware {
    fn new(config: BoardConfig) -> Self {
        Self {
            config,
            regs: Registers::new(),
            inrd1: 0xFF,
            inrd2: 0xFF,
            vblank: false,
            irq: false,
            firq: false,
            watchdog: 0,
            eeprom: vec![0; EEPROM_SIZE],
            adc: ADC_IDLE,
            analog: [0x80; 2],
            pokeys: QuadPokey::new(config.sound),
            palette: HardwarePalette::new(),
            mathbox: Mathbox::new(config.mathbox),
            builder: DisplayListBuilder::new(DisplayListQueue::new()),
            rng: StdRng::seed_from_u64(0x1983),
            remap: false,
        }
    }

    fn statrd(&self) -> u8 {
        // EXT_DONE is active low and the video processor finishes
        // instantly, so it always reads clear.
        let mut status = 0;
        if self.vblank {
            status |= VBLANK;
        }
        if self.mathbox.done() {
            status |= MB_DONE;
        }
        status
    }

    fn write_statwr(&mut self, data: u8) {
        let previous = self.regs.statwr;
        self.regs.statwr = data;
        self.remap = true;

        let level = data & MATH_START != 0;
        if self
            .mathbox
            .set_math_start(level, self.builder.current(), &self.palette)
        {
            self.firq = true;
        }

        if previous & EXT_START != 0 && data & EXT_START == 0 {
            self.builder.commit(self.regs.erase());
        }
    }

    fn write_out1(&mut self, data: u8) {
        let rising = data & !self.regs.out1;
        if rising & (LEFT_COIN_COUNTER | RIGHT_COIN_COUNTER) != 0 {
            trace!("coin counter pulse {rising:#04x}");
        }
        self.regs.out1 = data;
        self.remap = true;
    }

    fn take_remap(&mut self) -> bool {
        std::mem::take(&mut self.remap)
    }
}

impl PageHandler<Device> for Hardware {
    fn read(&mut self, device: Device, addr: u16) -> u8 {
        match device {
            Device::Inputs => match ReadPort::decode(addr) {
                ReadPort::Inrd1 => self.inrd1,
                ReadPort::Inrd2 => self.inrd2,
                ReadPort::Statrd => self.statrd(),
                ReadPort::Dip3j => self.config.dip_3j,
            },
            Device::Eeprom => self.eeprom[(addr & 0xFF) as usize],
            Device::Adc => self.adc,
            Device::Pokey => {
                if addr & 0x3F == DIP_SWITCH_OFFSET {
                    self.config.dip_5e
                } else {
                    // POT and RANDOM registers; the game only uses them
                    // for noise.
                    self.rng.next_u32() as u8
                }
            }
            Device::MathboxRam => self.mathbox.read_ram(addr),
            Device::Registers
            | Device::Palette
            | Device::Watchdog
            | Device::FirqAck
            | Device::AdcStart => 0,
        }
    }

    fn write(&mut self, device: Device, addr: u16, data: u8) {
        match device {
            Device::Registers => match WritePort::decode(addr) {
                WritePort::IrqAck => self.irq = false,
                WritePort::Statwr => self.write_statwr(data),
                WritePort::Out0 => {
                    self.regs.out0 = data;
                    self.remap = true;
                }
                WritePort::Out1 => self.write_out1(data),
            },
            Device::Eeprom => self.eeprom[(addr & 0xFF) as usize] = data & 0x0F,
            Device::Pokey => self.pokeys.write(addr, data),
            Device::Palette => self.palette.write(addr, data),
            Device::Watchdog => self.watchdog = 0,
            Device::FirqAck => self.firq = false,
            Device::AdcStart => {
                let axis = if addr & 1 == 0 { AXIS_Y } else { AXIS_X };
                self.adc = self.analog[axis as usize];
            }
            Device::MathboxRam => self.mathbox.write_ram(addr, data),
            Device::Inputs | Device::Adc => {}
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BoardState {
    machine: String,
    version: u32,
    clock: u64,
    registers: Registers,
    irq: bool,
    firq: bool,
    watchdog: u64,
    adc: u8,
    eeprom: Vec<u8>,
    palette: HardwarePalette,
    mathbox: MathboxState,
    pokeys: QuadPokeyState,
    work_ram: Vec<u8>,
    banked_ram: Vec<u8>,
    com_ram: Vec<u8>,
    alpha_ram: Vec<u8>,
}

/// Atari I, Robot (1983)
///
/// Hardware: Motorola 6809E @ 1.5 MHz, Mathbox bit-slice geometry
/// coprocessor, hardware polygon video processor, four POKEYs.
/// Video: filled polygons from a display list, with an 8x8 character
/// overlay (32x29 cells).
///
/// Memory map:
///   0x0000-0x07FF  Work RAM
///   0x0800-0x0FFF  Banked RAM (3 banks, OUT0 bits 5-6)
///   0x1000-0x10FF  Read: INRD1 / INRD2 / STATRD / DIP 3J
///   0x1100-0x11FF  Write: IRQ ack / STATWR / OUT0 / OUT1
///   0x1200-0x12FF  EEPROM (256 x 4 bits)
///   0x1300-0x13FF  Read: ADC
///   0x1400-0x14FF  Quad POKEY (0x1420 reads DIP 5E)
///   0x1800-0x18FF  Write: color RAM
///   0x1900-0x19FF  Write: watchdog clear
///   0x1A00-0x1AFF  Write: FIRQ ack
///   0x1B00-0x1BFF  Write: ADC start
///   0x1C00-0x1FFF  Alphanumeric RAM
///   0x2000-0x3FFF  Mathbox ROM bank, Mathbox RAM, or COMRAM
///   0x4000-0x5FFF  Program ROM bank (OUT1 bits 1-3)
///   0x6000-0xFFFF  Fixed program ROM
///
/// The 6809 is a collaborator: attach one with
/// [`attach_cpu`](Self::attach_cpu). Without it the board still keeps time,
/// raises interrupts and answers bus accesses made through [`Bus`].
pub struct IRobotSystem {
    map: PageMap<Device>,
    hw: Hardware,
    memory: Memory,
    selection: Selection,
    alpha: Alphanumerics,
    cpu: Option<Box<dyn Cpu>>,
    clock: u64,
    /// Last absolute scanline processed.
    line: Option<u64>,
}

impl IRobotSystem {
    pub fn new(config: BoardConfig) -> Self {
        let mut map = PageMap::new();
        let memory = Memory::new(&mut map);
        let hw = Hardware::new(config);
        let selection = memory.apply(&mut map, &hw.regs);
        Self {
            map,
            hw,
            memory,
            selection,
            alpha: Alphanumerics::new(&[], &[]),
            cpu: None,
            clock: 0,
            line: None,
        }
    }

    pub fn load_rom_set(&mut self, rom_set: &RomSet) -> Result<(), RomLoadError> {
        self.install_roms(rom_set, RomRegion::load)
    }

    /// Same as [`load_rom_set`](Self::load_rom_set) without checksum
    /// verification, for modified or hand-built images.
    pub fn load_rom_set_skip_checksums(&mut self, rom_set: &RomSet) -> Result<(), RomLoadError> {
        self.install_roms(rom_set, RomRegion::load_skip_checksums)
    }

    fn install_roms(
        &mut self,
        rom_set: &RomSet,
        load: fn(&RomRegion, &RomSet) -> Result<Vec<u8>, RomLoadError>,
    ) -> Result<(), RomLoadError> {
        let mut program = load(&PROGRAM_ROM, rom_set)?;
        let fixed = load(&FIXED_ROM, rom_set)?;
        let lo = load(&MATHBOX_LO_ROM, rom_set)?;
        let hi = load(&MATHBOX_HI_ROM, rom_set)?;
        let alpha_rom = load(&ALPHA_ROM, rom_set)?;
        let color_prom = load(&COLOR_PROM, rom_set)?;

        if self.hw.config.patch_self_test {
            self_test::apply(&mut program[4 * BANK_SIZE..6 * BANK_SIZE]);
            debug!("patched Mathbox self-test table");
        }
        self.map.buffer_mut(self.memory.program_rom).copy_from_slice(&program);
        self.map.buffer_mut(self.memory.fixed_rom).copy_from_slice(&fixed);

        self.hw
            .mathbox
            .load_roms(&lo[0x2000..], &hi[0x2000..], &lo[..0x2000], &hi[..0x2000]);
        let mathbox_rom = self.map.buffer_mut(self.memory.mathbox_rom);
        for (bank, dst) in mathbox_rom.chunks_exact_mut(BANK_SIZE).enumerate() {
            dst.copy_from_slice(self.hw.mathbox.rom_bank(bank));
        }

        self.alpha = Alphanumerics::new(&alpha_rom, &color_prom);
        Ok(())
    }

    /// Attach a 6809 core and reset it against the board.
    pub fn attach_cpu(&mut self, cpu: Box<dyn Cpu>) {
        self.cpu = Some(cpu);
        self.reset_cpu();
    }

    pub fn config(&self) -> &BoardConfig {
        &self.hw.config
    }

    /// Replace the switches. DIP and Mathbox settings apply immediately,
    /// sound enable and the CPU multiplier on the next frame.
    pub fn set_config(&mut self, config: BoardConfig) {
        self.hw.config = config;
        self.hw.mathbox.set_config(config.mathbox);
        self.hw.pokeys.set_enabled(config.sound);
    }

    pub fn registers(&self) -> Registers {
        self.hw.regs
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn mathbox(&self) -> &Mathbox {
        &self.hw.mathbox
    }

    pub fn mathbox_mut(&mut self) -> &mut Mathbox {
        &mut self.hw.mathbox
    }

    pub fn palette(&self) -> &HardwarePalette {
        &self.hw.palette
    }

    pub fn pokeys(&self) -> &QuadPokey {
        &self.hw.pokeys
    }

    pub fn alpha_ram(&self) -> &[u8] {
        self.map.buffer(self.memory.alpha_ram)
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    fn cpu_hz(&self) -> u64 {
        CPU_CLOCK_HZ * self.hw.config.cpu_speedup.max(1) as u64
    }

    /// Absolute scanline count at `clock`.
    fn line_at(&self, clock: u64) -> u64 {
        (clock as u128 * DOT_CLOCK_HZ as u128 / (self.cpu_hz() as u128 * DOTS_PER_LINE as u128))
            as u64
    }

    /// Current scanline (V counter), 0-255.
    pub fn current_scanline(&self) -> u16 {
        (self.line_at(self.clock) % LINES_PER_FRAME) as u16
    }

    /// Advance one CPU cycle.
    pub fn tick(&mut self) {
        let line = self.line_at(self.clock);
        if self.line != Some(line) {
            self.line = Some(line);
            self.scanline(line % LINES_PER_FRAME);
        }

        if let Some(mut cpu) = self.cpu.take() {
            cpu.execute_cycle(self, BusMaster::Cpu(0));
            self.cpu = Some(cpu);

            self.hw.watchdog += 1;
            if self.hw.watchdog > WATCHDOG_CYCLES {
                warn!("watchdog expired, resetting board");
                self.reset();
            }
        }

        self.clock += 1;
    }

    /// IRQ is clocked every 32 lines from 16: asserted at 48, 112, 176 and
    /// 240, released at 16, 80, 144 and 208.
    fn scanline(&mut self, line: u64) {
        if line % 32 == 16 {
            self.hw.irq = (line - 16) & 0x20 != 0;
        }
        self.hw.vblank = line >= VBLANK_START;
    }

    fn apply_banks(&mut self) {
        let selection = self.memory.apply(&mut self.map, &self.hw.regs);
        if selection != self.selection {
            trace!("bank select {:?} -> {selection:?}", self.selection);
            self.selection = selection;
        }
    }

    fn reset_cpu(&mut self) {
        if let Some(mut cpu) = self.cpu.take() {
            cpu.reset(self);
            self.cpu = Some(cpu);
        }
    }

    fn encode_state(&self) -> BoardState {
        let buffer = |id| self.map.buffer(id).to_vec();
        BoardState {
            machine: STATE_MACHINE.to_string(),
            version: STATE_VERSION,
            clock: self.clock,
            registers: self.hw.regs,
            irq: self.hw.irq,
            firq: self.hw.firq,
            watchdog: self.hw.watchdog,
            adc: self.hw.adc,
            eeprom: self.hw.eeprom.clone(),
            palette: self.hw.palette.clone(),
            mathbox: self.hw.mathbox.save_state(),
            pokeys: self.hw.pokeys.save_state(),
            work_ram: buffer(self.memory.work_ram),
            banked_ram: buffer(self.memory.banked_ram),
            com_ram: buffer(self.memory.com_ram),
            alpha_ram: buffer(self.memory.alpha_ram),
        }
    }

    fn restore_state(&mut self, state: BoardState) -> Result<(), StateError> {
        if state.machine != STATE_MACHINE || state.version != STATE_VERSION {
            return Err(StateError::Incompatible(format!(
                "snapshot is {} v{}, expected {STATE_MACHINE} v{STATE_VERSION}",
                state.machine, state.version
            )));
        }
        let rams = [
            (self.memory.work_ram, &state.work_ram),
            (self.memory.banked_ram, &state.banked_ram),
            (self.memory.com_ram, &state.com_ram),
            (self.memory.alpha_ram, &state.alpha_ram),
        ];
        for (id, data) in rams.iter() {
            if self.map.buffer(*id).len() != data.len() {
                return Err(StateError::Incompatible(format!(
                    "RAM block is {} bytes, expected {}",
                    data.len(),
                    self.map.buffer(*id).len()
                )));
            }
        }
        if state.eeprom.len() != EEPROM_SIZE {
            return Err(StateError::Incompatible("EEPROM size".into()));
        }

        if state.mathbox.ram.len() != RAM_WORDS || state.pokeys.chips.len() != NUM_CHIPS {
            return Err(StateError::Incompatible("device state shape".into()));
        }

        self.hw.mathbox.load_state(&state.mathbox)?;
        self.hw.pokeys.load_state(&state.pokeys)?;
        for (id, data) in rams {
            self.map.buffer_mut(id).copy_from_slice(data);
        }
        self.hw.eeprom.copy_from_slice(&state.eeprom);
        self.hw.palette = state.palette;
        self.hw.regs = state.registers;
        self.hw.irq = state.irq;
        self.hw.firq = state.firq;
        self.hw.watchdog = state.watchdog;
        self.hw.adc = state.adc;
        self.clock = state.clock;
        self.line = None;
        self.hw.builder.discard();
        self.apply_banks();
        Ok(())
    }
}

impl Default for IRobotSystem {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl Bus for IRobotSystem {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        self.map.read(addr, &mut self.hw)
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        self.map.write(addr, data, &mut self.hw);
        if self.hw.take_remap() {
            self.apply_banks();
        }
    }

    fn is_halted_for(&self, _master: BusMaster) -> bool {
        false
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            nmi: false,
            irq: self.hw.irq,
            firq: self.hw.firq,
        }
    }
}

impl Machine for IRobotSystem {
    fn display_size(&self) -> (u32, u32) {
        (alphanumerics::WIDTH as u32, alphanumerics::HEIGHT as u32)
    }

    fn run_frame(&mut self) {
        let end = (self.line_at(self.clock) / LINES_PER_FRAME + 1) * LINES_PER_FRAME;
        while self.line_at(self.clock) < end {
            self.tick();
        }
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        self.alpha.render(
            self.map.buffer(self.memory.alpha_ram),
            self.hw.regs.alpha_map(),
            buffer,
            alphanumerics::WIDTH,
        );
    }

    fn display_lists(&self) -> Option<DisplayListQueue> {
        Some(self.hw.builder.queue().clone())
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        match button {
            INPUT_COIN_LEFT => set_active_low(&mut self.hw.inrd1, COIN_L, pressed),
            INPUT_COIN_RIGHT => set_active_low(&mut self.hw.inrd1, COIN_R, pressed),
            INPUT_COIN_AUX => set_active_low(&mut self.hw.inrd1, COIN_AUX, pressed),
            INPUT_TEST => set_active_low(&mut self.hw.inrd1, TEST, pressed),
            INPUT_START1 => set_active_low(&mut self.hw.inrd2, START_1, pressed),
            INPUT_START2 => set_active_low(&mut self.hw.inrd2, START_2, pressed),
            INPUT_FIRE => set_active_low(&mut self.hw.inrd2, FIRE, pressed),
            _ => {}
        }
    }

    fn set_analog(&mut self, axis: u8, value: u8) {
        if let Some(slot) = self.hw.analog.get_mut(axis as usize) {
            *slot = value;
        }
    }

    fn input_map(&self) -> &[InputButton] {
        IROBOT_INPUT_MAP
    }

    /// Power-on reset. RAM and EEPROM keep their contents.
    fn reset(&mut self) {
        self.hw.regs = Registers::new();
        self.hw.irq = false;
        self.hw.firq = false;
        self.hw.watchdog = 0;
        self.hw.adc = ADC_IDLE;
        self.hw.mathbox.reset();
        self.hw.pokeys.reset();
        self.hw.builder.discard();
        self.hw.remap = false;
        self.apply_banks();
        self.reset_cpu();
    }

    fn save_nvram(&self) -> Option<&[u8]> {
        Some(&self.hw.eeprom)
    }

    fn load_nvram(&mut self, data: &[u8]) {
        if data.len() != EEPROM_SIZE {
            warn!("ignoring {} byte NVRAM image, expected {EEPROM_SIZE}", data.len());
            return;
        }
        for (cell, &byte) in self.hw.eeprom.iter_mut().zip(data) {
            *cell = byte & 0x0F;
        }
    }

    fn audio_sample_rate(&self) -> u32 {
        if self.hw.pokeys.enabled() { SAMPLE_RATE } else { 0 }
    }

    fn update_audio(&mut self, sink: &mut dyn AudioSink) {
        self.hw.pokeys.update(sink);
    }

    fn frame_rate_hz(&self) -> f64 {
        DOT_CLOCK_HZ as f64 / (DOTS_PER_LINE * LINES_PER_FRAME) as f64
    }

    fn save_state(&self) -> Result<Vec<u8>, StateError> {
        let json = serde_json::to_vec(&self.encode_state())
            .map_err(|e| StateError::Encoding(e.to_string()))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }

    fn load_state(&mut self, data: &[u8]) -> Result<(), StateError> {
        let state: BoardState = serde_json::from_reader(GzDecoder::new(data))
            .map_err(|e| StateError::Encoding(e.to_string()))?;
        self.restore_state(state)
    }
}

pub fn create_machine(rom_set: &RomSet) -> Result<Box<dyn Machine>, RomLoadError> {
    let mut sys = IRobotSystem::default();
    sys.load_rom_set(rom_set)?;
    sys.reset();
    Ok(Box::new(sys))
}

inventory::submit! {
    crate::registry::MachineEntry::new("irobot", "irobot", create_machine)
}

//! Page layout and bank switching.
//!
//! All memory the CPU can see is owned by the [`PageMap`]; switching a bank
//! only re-points page targets at a different offset.

use irobot_core::core::{BufferId, PageMap, PageTarget};

use super::Device;
use super::registers::{OUT3, OUT4, Registers};

pub const BANK_SIZE: usize = 0x2000;
pub const PROGRAM_BANKS: usize = 6;
pub const FIXED_ROM_SIZE: usize = 0xA000;
pub const MATHBOX_ROM_BANKS: usize = 6;
pub const WORK_RAM_SIZE: usize = 0x0800;
pub const RAM_BANK_SIZE: usize = 0x0800;
pub const RAM_BANKS: usize = 3;
pub const COM_RAM_SIZE: usize = 0x2000;
pub const ALPHA_RAM_SIZE: usize = 0x0400;

/// MPAGE to Mathbox ROM bank. Pages 0-3 alias the first two banks.
const MATHBOX_ROM_PAGE: [usize; 8] = [0, 1, 0, 1, 2, 3, 4, 5];

/// What the CPU sees at 0x2000-0x3FFF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Window {
    MathboxRom(usize),
    MathboxRam,
    ComRam(usize),
}

impl Window {
    pub fn select(regs: &Registers) -> Self {
        if regs.out0 & OUT4 == 0 {
            Self::MathboxRom(MATHBOX_ROM_PAGE[regs.mpage()])
        } else if regs.out0 & OUT3 != 0 {
            Self::MathboxRam
        } else {
            Self::ComRam(regs.com_swap() as usize)
        }
    }
}

/// Current bank selection. `None` means the selected bank is not populated
/// and the range reads as zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub ram_bank: Option<usize>,
    pub window: Window,
    pub program_bank: Option<usize>,
}

impl Selection {
    pub fn from_registers(regs: &Registers) -> Self {
        let ram_bank = regs.ram_bank();
        let program_bank = regs.program_bank();
        Self {
            ram_bank: (ram_bank < RAM_BANKS).then_some(ram_bank),
            window: Window::select(regs),
            program_bank: (program_bank < PROGRAM_BANKS).then_some(program_bank),
        }
    }
}

/// Buffers registered with the page map.
pub struct Memory {
    pub work_ram: BufferId,
    pub banked_ram: BufferId,
    pub com_ram: BufferId,
    pub alpha_ram: BufferId,
    pub mathbox_rom: BufferId,
    pub program_rom: BufferId,
    pub fixed_rom: BufferId,
}

impl Memory {
    /// Allocate every buffer and map the pages that never move.
    ///
    /// ```text
    /// 0000-07FF  work RAM           1400-14FF  POKEY / DIP 5E
    /// 0800-0FFF  banked RAM         1800-18FF  palette (write)
    /// 1000-10FF  inputs / status    1900-19FF  watchdog (write)
    /// 1100-11FF  latches (write)    1A00-1AFF  FIRQ ack (write)
    /// 1200-12FF  EEPROM             1B00-1BFF  ADC start (write)
    /// 1300-13FF  ADC result         1C00-1FFF  alphanumeric RAM
    /// 2000-3FFF  bank window        4000-5FFF  program ROM bank
    /// 6000-FFFF  fixed program ROM
    /// ```
    pub fn new(map: &mut PageMap<Device>) -> Self {
        let memory = Self {
            work_ram: map.add_buffer(vec![0; WORK_RAM_SIZE]),
            banked_ram: map.add_buffer(vec![0; RAM_BANK_SIZE * RAM_BANKS]),
            com_ram: map.add_buffer(vec![0; COM_RAM_SIZE * 2]),
            alpha_ram: map.add_buffer(vec![0; ALPHA_RAM_SIZE]),
            mathbox_rom: map.add_buffer(vec![0; BANK_SIZE * MATHBOX_ROM_BANKS]),
            program_rom: map.add_buffer(vec![0; BANK_SIZE * PROGRAM_BANKS]),
            fixed_rom: map.add_buffer(vec![0; FIXED_ROM_SIZE]),
        };

        let at = |id, offset| PageTarget::Buffer { id, offset };
        map.map(0x00, 0x07, at(memory.work_ram, 0));
        map.map_read(0x10, 0x10, PageTarget::Device(Device::Inputs));
        map.map_write(0x11, 0x11, PageTarget::Device(Device::Registers));
        map.map(0x12, 0x12, PageTarget::Device(Device::Eeprom));
        map.map_read(0x13, 0x13, PageTarget::Device(Device::Adc));
        map.map(0x14, 0x14, PageTarget::Device(Device::Pokey));
        map.map_write(0x18, 0x18, PageTarget::Device(Device::Palette));
        map.map_write(0x19, 0x19, PageTarget::Device(Device::Watchdog));
        map.map_write(0x1A, 0x1A, PageTarget::Device(Device::FirqAck));
        map.map_write(0x1B, 0x1B, PageTarget::Device(Device::AdcStart));
        map.map(0x1C, 0x1F, at(memory.alpha_ram, 0));
        map.map_read(0x60, 0xFF, at(memory.fixed_rom, 0));
        memory
    }

    /// Point the switchable ranges at the banks `regs` selects.
    pub fn apply(&self, map: &mut PageMap<Device>, regs: &Registers) -> Selection {
        let selection = Selection::from_registers(regs);
        let at = |id, offset| PageTarget::Buffer { id, offset };

        let ram = match selection.ram_bank {
            Some(bank) => at(self.banked_ram, bank * RAM_BANK_SIZE),
            None => PageTarget::Discard,
        };
        map.map(0x08, 0x0F, ram);

        match selection.window {
            Window::MathboxRom(bank) => {
                map.map_read(0x20, 0x3F, at(self.mathbox_rom, bank * BANK_SIZE));
                map.map_write(0x20, 0x3F, PageTarget::Discard);
            }
            Window::MathboxRam => map.map(0x20, 0x3F, PageTarget::Device(Device::MathboxRam)),
            Window::ComRam(n) => map.map(0x20, 0x3F, at(self.com_ram, n * COM_RAM_SIZE)),
        }

        let program = match selection.program_bank {
            Some(bank) => at(self.program_rom, bank * BANK_SIZE),
            None => PageTarget::Discard,
        };
        map.map_read(0x40, 0x5F, program);

        selection
    }
}

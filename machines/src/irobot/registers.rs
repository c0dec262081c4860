//! Latches and status ports in the 0x1000-0x11FF register block.

use serde::{Deserialize, Serialize};

// INRD1 (0x1000, active low)
pub const COIN_R: u8 = 0x80;
pub const COIN_L: u8 = 0x40;
pub const COIN_AUX: u8 = 0x20;
pub const TEST: u8 = 0x10;
pub const COIN_TAMPER: u8 = 0x08;

// INRD2 (0x1040, active low)
pub const START_1: u8 = 0x80;
pub const START_2: u8 = 0x40;
pub const FIRE: u8 = 0x10;

// STATRD (0x1080)
pub const VBLANK: u8 = 0x80;
pub const EXT_DONE: u8 = 0x40;
pub const MB_DONE: u8 = 0x20;

// STATWR (0x1140)
pub const EXT_COM_SWAP: u8 = 0x80;
pub const RECALL: u8 = 0x40;
pub const COCKTAIL: u8 = 0x20;
pub const MATH_START: u8 = 0x10;
pub const ADDCON: u8 = 0x08;
pub const EXT_START: u8 = 0x04;
pub const COM_RAM_SEL: u8 = 0x02;
/// Cleared to erase the frame before drawing.
pub const ERASE: u8 = 0x01;

// OUT0 (0x1180)
pub const ALPHA_MAP: u8 = 0x80;
pub const OUT4: u8 = 0x10;
pub const OUT3: u8 = 0x08;

// OUT1 (0x11C0)
pub const LEFT_COIN_COUNTER: u8 = 0x80;
pub const RIGHT_COIN_COUNTER: u8 = 0x40;
pub const LED1: u8 = 0x20;
pub const LED2: u8 = 0x10;

pub const OUT0_RESET: u8 = 0x10;

/// A read in the 0x10xx page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadPort {
    Inrd1,
    Inrd2,
    Statrd,
    Dip3j,
}

impl ReadPort {
    pub fn decode(addr: u16) -> Self {
        match addr & 0xFF {
            0x00..=0x3F => Self::Inrd1,
            0x40..=0x7F => Self::Inrd2,
            0x80..=0xBF => Self::Statrd,
            _ => Self::Dip3j,
        }
    }
}

/// A write in the 0x11xx page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePort {
    IrqAck,
    Statwr,
    Out0,
    Out1,
}

impl WritePort {
    pub fn decode(addr: u16) -> Self {
        match addr & 0xFF {
            0x00..=0x3F => Self::IrqAck,
            0x40..=0x7F => Self::Statwr,
            0x80..=0xBF => Self::Out0,
            _ => Self::Out1,
        }
    }
}

/// The three output latches. Everything the bank decoder needs is derived
/// from these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub statwr: u8,
    pub out0: u8,
    pub out1: u8,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            statwr: 0,
            out0: OUT0_RESET,
            out1: 0,
        }
    }

    pub fn alpha_map(&self) -> bool {
        self.out0 & ALPHA_MAP != 0
    }

    /// RAM bank at 0x0800, 0-3. Bank 3 is not populated.
    pub fn ram_bank(&self) -> usize {
        ((self.out0 >> 5) & 3) as usize
    }

    /// MPAGE: Mathbox ROM page seen in the 0x2000 window.
    pub fn mpage(&self) -> usize {
        ((self.out0 >> 1) & 7) as usize
    }

    /// Program ROM bank at 0x4000, 0-7. Banks 6 and 7 are not populated.
    pub fn program_bank(&self) -> usize {
        ((self.out1 >> 1) & 7) as usize
    }

    pub fn com_swap(&self) -> bool {
        self.statwr & EXT_COM_SWAP != 0
    }

    pub fn erase(&self) -> bool {
        self.statwr & ERASE == 0
    }

    pub fn leds(&self) -> (bool, bool) {
        // Active low
        (self.out1 & LED1 == 0, self.out1 & LED2 == 0)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Set or clear an active-low input bit.
pub fn set_active_low(reg: &mut u8, mask: u8, pressed: bool) {
    if pressed {
        *reg &= !mask;
    } else {
        *reg |= mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_decode_splits_page_in_quarters() {
        assert_eq!(ReadPort::decode(0x1000), ReadPort::Inrd1);
        assert_eq!(ReadPort::decode(0x107F), ReadPort::Inrd2);
        assert_eq!(ReadPort::decode(0x1080), ReadPort::Statrd);
        assert_eq!(ReadPort::decode(0x10FF), ReadPort::Dip3j);
        assert_eq!(WritePort::decode(0x1100), WritePort::IrqAck);
        assert_eq!(WritePort::decode(0x1140), WritePort::Statwr);
        assert_eq!(WritePort::decode(0x11BF), WritePort::Out0);
        assert_eq!(WritePort::decode(0x11C0), WritePort::Out1);
    }

    #[test]
    fn latch_fields() {
        let regs = Registers {
            statwr: EXT_COM_SWAP | ERASE,
            out0: ALPHA_MAP | 0x40 | 0x0A,
            out1: 0x0C | LED2,
        };
        assert!(regs.alpha_map());
        assert_eq!(regs.ram_bank(), 2);
        assert_eq!(regs.mpage(), 5);
        assert_eq!(regs.program_bank(), 6);
        assert!(regs.com_swap());
        assert!(!regs.erase());
        assert_eq!(regs.leds(), (true, false));
    }

    #[test]
    fn active_low_inputs() {
        let mut reg = 0xFF;
        set_active_low(&mut reg, FIRE, true);
        assert_eq!(reg, 0xEF);
        set_active_low(&mut reg, FIRE, false);
        assert_eq!(reg, 0xFF);
    }
}

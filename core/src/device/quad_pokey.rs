//! Four POKEYs behind the 0x1400 page, each feeding its own 8-bit voice.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::StateError;
use crate::device::pokey::{CLOCK_HZ, Pokey};

/// One output sample per 40 chip clocks (44,688 Hz).
pub const SAMPLE_RATE: u32 = CLOCK_HZ / 40;

pub const NUM_CHIPS: usize = 4;

/// Register offset inside the page that reads the 5E DIP switches.
pub const DIP_SWITCH_OFFSET: u16 = 0x20;

const POOL_BUFFERS: usize = 32;
/// 1 ms of audio per buffer.
const BUFFER_SAMPLES: usize = SAMPLE_RATE as usize / 1000;
/// Keep at least this many buffers queued at the sink.
const LOW_WATER: usize = 20;

/// Platform audio output. Receives one unsigned 8-bit mono buffer per chip
/// per submission; the buffers are only borrowed.
pub trait AudioSink {
    fn queued_buffers(&self) -> usize;
    fn submit(&mut self, voices: &[&[u8]]);
}

/// Split a 0x14xx address into (chip, register).
///
/// ```text
/// A5 A4 A3 A2 A1 A0
///  |  \__/  \_____/
///  |  chip   reg 0-7
///  \______ reg bit 3 (AUDCTL)
/// ```
pub fn decode(addr: u16) -> (usize, u8) {
    let chip = ((addr >> 3) & 0x03) as usize;
    let reg = ((addr & 0x07) + ((addr & 0x20) >> 2)) as u8;
    (chip, reg)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadPokeyState {
    pub chips: Vec<Pokey>,
}

pub struct QuadPokey {
    chips: [Pokey; NUM_CHIPS],
    pool: Vec<[Vec<u8>; NUM_CHIPS]>,
    next_buffer: usize,
    enabled: bool,
}

impl QuadPokey {
    pub fn new(enabled: bool) -> Self {
        Self {
            chips: std::array::from_fn(|_| Pokey::new(CLOCK_HZ, SAMPLE_RATE)),
            pool: (0..POOL_BUFFERS)
                .map(|_| std::array::from_fn(|_| vec![128u8; BUFFER_SAMPLES]))
                .collect(),
            next_buffer: 0,
            enabled,
        }
    }

    pub fn reset(&mut self) {
        for chip in &mut self.chips {
            chip.reset();
        }
    }

    pub fn chip(&self, n: usize) -> &Pokey {
        &self.chips[n]
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn write(&mut self, addr: u16, data: u8) {
        let (chip, reg) = decode(addr);
        self.chips[chip].write(reg, data);
    }

    /// Fill and submit buffers until the sink is past the low-water mark.
    /// At most one pool's worth is produced per call, so a sink that never
    /// drains cannot stall the caller.
    pub fn update(&mut self, sink: &mut dyn AudioSink) {
        if !self.enabled {
            return;
        }
        let mut produced = 0;
        while sink.queued_buffers() < LOW_WATER && produced < POOL_BUFFERS {
            let slot = &mut self.pool[self.next_buffer];
            self.next_buffer = (self.next_buffer + 1) % POOL_BUFFERS;
            for (chip, buffer) in self.chips.iter_mut().zip(slot.iter_mut()) {
                chip.fill(buffer);
            }
            let voices: [&[u8]; NUM_CHIPS] = std::array::from_fn(|n| slot[n].as_slice());
            sink.submit(&voices);
            produced += 1;
        }
    }

    /// Render `samples` per chip directly, bypassing the pool.
    pub fn render(&mut self, samples: usize) -> [Vec<u8>; NUM_CHIPS] {
        std::array::from_fn(|n| {
            let mut buf = vec![0u8; samples];
            self.chips[n].fill(&mut buf);
            buf
        })
    }

    pub fn save_state(&self) -> QuadPokeyState {
        QuadPokeyState {
            chips: self.chips.to_vec(),
        }
    }

    pub fn load_state(&mut self, state: &QuadPokeyState) -> Result<(), StateError> {
        if state.chips.len() != NUM_CHIPS {
            return Err(StateError::Incompatible(format!(
                "expected {NUM_CHIPS} POKEYs, found {}",
                state.chips.len()
            )));
        }
        for (chip, saved) in self.chips.iter_mut().zip(&state.chips) {
            *chip = saved.clone();
        }
        debug!("quad pokey: state restored");
        Ok(())
    }
}

//! Event-driven POKEY sound generator (audio section only).
//!
//! Rather than clocking the chip at 1.79 MHz, the mixer jumps from event to
//! event: whichever of the four channel dividers or the output sample clock
//! expires first. Polynomial noise sources are precomputed bit tables
//! addressed by per-table cursors that catch up lazily on each channel
//! event.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Approximate 1.79 MHz POKEY clock.
pub const CLOCK_HZ: u32 = 1_787_520;

const DIV_64: u32 = 28;
const DIV_15: u32 = 114;

const POLY4_SIZE: u32 = 0x000F;
const POLY5_SIZE: u32 = 0x001F;
const POLY9_SIZE: u32 = 0x01FF;
const POLY17_SIZE: u32 = 0x0001_FFFF;

const BIT4: [bool; POLY4_SIZE as usize] = [
    true, true, false, true, true, true, false, false, false, false, true, false, true, false,
    false,
];

const BIT5: [bool; POLY5_SIZE as usize] = [
    false, false, true, true, false, false, false, true, true, true, true, false, false, true,
    false, true, false, true, true, false, true, true, true, false, true, false, false, false,
    false, false, true,
];

/// Divider value that parks a channel: it never fires.
const PARKED: u32 = 0x7FFF_FFFF;

// AUDC bits
const AUDC_NOTPOLY5: u8 = 0x80;
const AUDC_POLY4: u8 = 0x40;
const AUDC_PURE: u8 = 0x20;
const AUDC_VOL_ONLY: u8 = 0x10;
const AUDC_VOLUME: u8 = 0x0F;

// AUDCTL bits
const AUDCTL_POLY9: u8 = 0x80;
const AUDCTL_CH1_179: u8 = 0x40;
const AUDCTL_CH3_179: u8 = 0x20;
const AUDCTL_CH1_CH2: u8 = 0x10;
const AUDCTL_CH3_CH4: u8 = 0x08;
const AUDCTL_CLOCK_15: u8 = 0x01;

/// 17-bit (and 9-bit) noise table, shared by every chip.
fn poly17() -> &'static [bool] {
    static TABLE: OnceLock<Vec<bool>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut poly: i32 = 0;
        (0..POLY17_SIZE)
            .map(|_| {
                poly = (poly >> 1) + (!((poly << 16) ^ (poly << 11)) & 0x10000);
                poly & 0x100 != 0
            })
            .collect()
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub audf: u8,
    pub audc: u8,
    /// Doubled volume, 0..=30.
    pub audv: u8,
    pub div_n_cnt: u32,
    pub div_n_max: u32,
    pub output_on: bool,
}

impl Channel {
    fn new() -> Self {
        Self {
            audf: 0,
            audc: 0,
            audv: 0,
            div_n_cnt: 0,
            div_n_max: PARKED,
            output_on: false,
        }
    }

    /// Change the period. The running counter is clamped so a shorter
    /// period takes effect immediately.
    fn set_div_n_max(&mut self, value: u32) {
        if self.div_n_max != value {
            self.div_n_max = value;
            if self.div_n_cnt > value {
                self.div_n_cnt = value;
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokey {
    channels: [Channel; 4],
    audctl: u8,
    /// Output sample period in 32.32 fixed point chip clocks.
    samp_n_max: u64,
    samp_n_cnt: u64,
    base_mult: u32,
    /// Clocks elapsed since the poly cursors were last advanced.
    poly_adjust: u32,
    p4: u32,
    p5: u32,
    p9: u32,
    p17: u32,
}

impl Pokey {
    pub fn new(clock_hz: u32, sample_rate: u32) -> Self {
        let mut pokey = Self {
            channels: std::array::from_fn(|_| Channel::new()),
            audctl: 0,
            samp_n_max: ((clock_hz as u64) << 32) / sample_rate.max(1) as u64,
            samp_n_cnt: 0,
            base_mult: DIV_64,
            poly_adjust: 0,
            p4: 0,
            p5: 0,
            p9: 0,
            p17: 0,
        };
        pokey.reset();
        pokey
    }

    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            *ch = Channel::new();
        }
        self.audctl = 0;
        self.base_mult = DIV_64;
        self.poly_adjust = 0;
        self.p4 = 0;
        self.p5 = 0;
        self.p9 = 0;
        self.p17 = 0;
        self.samp_n_cnt = 0;
    }

    pub fn channel(&self, n: usize) -> &Channel {
        &self.channels[n]
    }

    pub fn audctl(&self) -> u8 {
        self.audctl
    }

    /// Register write. Only the audio registers (0x0-0x8) are decoded.
    pub fn write(&mut self, reg: u8, data: u8) {
        match reg & 0x0F {
            r @ (0x00 | 0x02 | 0x04 | 0x06) => self.write_audf((r >> 1) as usize, data),
            r @ (0x01 | 0x03 | 0x05 | 0x07) => self.write_audc((r >> 1) as usize, data),
            0x08 => self.write_audctl(data),
            _ => {}
        }
    }

    fn write_audf(&mut self, ch: usize, data: u8) {
        self.channels[ch].audf = data;
        self.update(ch);
        // Writing the low half of a joined pair changes the high channel's
        // period too.
        match ch {
            0 if self.audctl & AUDCTL_CH1_CH2 != 0 => self.update(1),
            2 if self.audctl & AUDCTL_CH3_CH4 != 0 => self.update(3),
            _ => {}
        }
    }

    fn write_audc(&mut self, ch: usize, data: u8) {
        let channel = &mut self.channels[ch];
        channel.audc = data;
        channel.audv = (data & AUDC_VOLUME) << 1;
        self.update(ch);
    }

    fn write_audctl(&mut self, data: u8) {
        self.audctl = data;
        self.base_mult = if data & AUDCTL_CLOCK_15 != 0 { DIV_15 } else { DIV_64 };
        for ch in 0..4 {
            self.set_output(ch);
        }
    }

    /// Recompute a channel's divider period from AUDF and AUDCTL.
    fn update(&mut self, ch: usize) {
        let audctl = self.audctl;
        let base = self.base_mult;
        let audf = self.channels[ch].audf as u32;
        let (fast, joined, low) = match ch {
            0 => (audctl & AUDCTL_CH1_179 != 0, false, 0),
            1 => (
                audctl & AUDCTL_CH1_179 != 0,
                audctl & AUDCTL_CH1_CH2 != 0,
                self.channels[0].audf as u32,
            ),
            2 => (audctl & AUDCTL_CH3_179 != 0, false, 0),
            _ => (
                audctl & AUDCTL_CH3_179 != 0,
                audctl & AUDCTL_CH3_CH4 != 0,
                self.channels[2].audf as u32,
            ),
        };

        let period = match (ch, joined, fast) {
            // 16-bit pair, clocked by the 1.79 MHz source or the base clock.
            (1 | 3, true, true) => audf * 256 + low + 7,
            (1 | 3, true, false) => (audf * 256 + low + 1) * base,
            // Channels 2 and 4 never run from 1.79 MHz on their own.
            (1 | 3, false, _) => (audf + 1) * base,
            (_, _, true) => audf + 4,
            (_, _, false) => (audf + 1) * base,
        };
        self.channels[ch].set_div_n_max(period);
        self.set_output(ch);
    }

    /// Freeze the channel high when it is silent, volume-only, or toggling
    /// faster than the output can represent.
    fn set_output(&mut self, ch: usize) {
        let sample_period = (self.samp_n_max >> 32) as u32;
        let channel = &mut self.channels[ch];
        if channel.audc & AUDC_VOL_ONLY != 0
            || channel.audc & AUDC_VOLUME == 0
            || channel.div_n_max < sample_period
        {
            channel.output_on = true;
            channel.div_n_max = PARKED;
            channel.div_n_cnt = PARKED;
        }
    }

    /// Produce unsigned 8-bit samples centred on 128.
    pub fn fill(&mut self, buffer: &mut [u8]) {
        let bit17 = poly17();

        let mut sample: u8 = 128;
        for ch in &self.channels {
            sample = sample.wrapping_sub(ch.audv >> 1);
            if ch.output_on {
                sample = sample.wrapping_add(ch.audv);
            }
        }

        let mut written = 0;
        while written < buffer.len() {
            // Next event: a channel wins a tie with the sample clock, and
            // later channels win ties with earlier ones.
            let mut event_min = (self.samp_n_cnt >> 32) as u32;
            let mut event = None;
            for (n, ch) in self.channels.iter().enumerate() {
                if ch.div_n_cnt <= event_min {
                    event_min = ch.div_n_cnt;
                    event = Some(n);
                }
            }

            for ch in &mut self.channels {
                ch.div_n_cnt -= event_min;
            }
            self.samp_n_cnt -= (event_min as u64) << 32;
            self.poly_adjust = self.poly_adjust.wrapping_add(event_min);

            let Some(n) = event else {
                self.samp_n_cnt += self.samp_n_max;
                buffer[written] = sample;
                written += 1;
                continue;
            };

            self.p4 = ((self.p4 as u64 + self.poly_adjust as u64) % POLY4_SIZE as u64) as u32;
            self.p5 = ((self.p5 as u64 + self.poly_adjust as u64) % POLY5_SIZE as u64) as u32;
            self.p9 = ((self.p9 as u64 + self.poly_adjust as u64) % POLY9_SIZE as u64) as u32;
            self.p17 = ((self.p17 as u64 + self.poly_adjust as u64) % POLY17_SIZE as u64) as u32;
            self.poly_adjust = 0;

            let poly9 = self.audctl & AUDCTL_POLY9 != 0;
            let (p4, p5, p9, p17) = (self.p4, self.p5, self.p9, self.p17);
            let ch = &mut self.channels[n];
            ch.div_n_cnt = ch.div_n_cnt.wrapping_add(ch.div_n_max);

            let toggle = if ch.audc & AUDC_NOTPOLY5 != 0 || BIT5[p5 as usize] {
                if ch.audc & AUDC_PURE != 0 {
                    true
                } else if ch.audc & AUDC_POLY4 != 0 {
                    BIT4[p4 as usize] != ch.output_on
                } else if poly9 {
                    bit17[p9 as usize] != ch.output_on
                } else {
                    bit17[p17 as usize] != ch.output_on
                }
            } else {
                false
            };

            if toggle {
                if ch.output_on {
                    sample = sample.wrapping_sub(ch.audv);
                } else {
                    sample = sample.wrapping_add(ch.audv);
                }
                ch.output_on = !ch.output_on;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poly17_table_has_full_period() {
        let table = poly17();
        assert_eq!(table.len(), POLY17_SIZE as usize);
        let ones = table.iter().filter(|&&b| b).count();
        assert!(ones > table.len() * 2 / 5 && ones < table.len() * 3 / 5);
    }

    #[test]
    fn audc_write_doubles_volume() {
        let mut p = Pokey::new(CLOCK_HZ, CLOCK_HZ / 40);
        p.write(0x03, 0xA7);
        assert_eq!(p.channel(1).audv, 14);
        assert_eq!(p.channel(1).audc, 0xA7);
    }
}

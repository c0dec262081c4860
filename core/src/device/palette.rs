//! Color lookup for display-list primitives.

use serde::{Deserialize, Serialize};

pub const PALETTE_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend toward `other`; `t` is clamped to 0..=1.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

/// Source of primitive colors. Indices wrap at 64.
pub trait Palette {
    fn color(&self, index: i32) -> Rgb;

    /// Color for a shaded surface. The integer part of `shade` steps through
    /// the ramp; the fraction blends toward the next entry unless the step
    /// lands on the last entry of an 8-color ramp.
    fn shaded(&self, index: i32, shade: f32) -> Rgb {
        let step = shade as i32;
        let index = index.wrapping_add(step);
        let c = self.color(index);
        if index & 7 != 7 {
            c.lerp(self.color(index.wrapping_add(1)), shade - step as f32)
        } else {
            c
        }
    }
}

/// The board's 64-entry color RAM at 0x1800.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwarePalette {
    entries: Vec<Rgb>,
}

impl HardwarePalette {
    pub fn new() -> Self {
        Self {
            entries: vec![Rgb::BLACK; PALETTE_SIZE],
        }
    }

    /// Decode a CPU write. The data bus is inverted; address bit 0 carries
    /// the low intensity bit and bits 1-6 select the entry.
    ///
    /// ```text
    /// data: RRGGBBII   (after inversion)
    /// ```
    pub fn write(&mut self, addr: u16, data: u8) {
        let d = !data as u32;
        let index = ((addr >> 1) & 0x3F) as usize;
        let intensity = (((d & 3) << 1) + ((!addr & 1) as u32) + 1) * 8;
        let ch = |shift: u32| (((d >> shift) & 3) * intensity).min(255) as u8;
        self.entries[index] = Rgb::new(ch(6), ch(4), ch(2));
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }
}

impl Default for HardwarePalette {
    fn default() -> Self {
        Self::new()
    }
}

impl Palette for HardwarePalette {
    fn color(&self, index: i32) -> Rgb {
        self.entries[(index & 0x3F) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp;

    impl Palette for Ramp {
        fn color(&self, index: i32) -> Rgb {
            let v = ((index & 0x3F) * 4) as u8;
            Rgb::new(v, v, v)
        }
    }

    #[test]
    fn write_decodes_inverted_data() {
        let mut p = HardwarePalette::new();
        // !0x00 = 0xFF: every field 3, II = 3, odd address drops the low bit.
        p.write(0x1803, 0x00);
        // intensity = ((3 << 1) + 0 + 1) * 8 = 56, channel = 3 * 56 = 168
        assert_eq!(p.color(1), Rgb::new(168, 168, 168));

        p.write(0x1802, 0xFF);
        assert_eq!(p.color(1), Rgb::BLACK);
    }

    #[test]
    fn write_even_address_sets_low_intensity_bit() {
        let mut p = HardwarePalette::new();
        // !0x3F = 0xC0: red 3, intensity bits 0, even address adds 1.
        p.write(0x1800, 0x3F);
        assert_eq!(p.color(0), Rgb::new(3 * 16, 0, 0));
    }

    #[test]
    fn color_index_wraps() {
        let mut p = HardwarePalette::new();
        p.write(0x1800 | (5 << 1), 0x00);
        assert_eq!(p.color(5 + 64), p.color(5));
        assert_eq!(p.color(-59), p.color(5));
    }

    #[test]
    fn shaded_steps_and_blends() {
        assert_eq!(Ramp.shaded(8, 0.0), Rgb::new(32, 32, 32));
        assert_eq!(Ramp.shaded(8, 2.0), Rgb::new(40, 40, 40));
        assert_eq!(Ramp.shaded(8, 2.5), Rgb::new(42, 42, 42));
    }

    #[test]
    fn shaded_does_not_blend_past_ramp_end() {
        // 8 + 7 = 15, last entry of the ramp.
        assert_eq!(Ramp.shaded(8, 7.0), Rgb::new(60, 60, 60));
        assert_eq!(Ramp.shaded(8, 6.9), Ramp.color(14).lerp(Ramp.color(15), 0.9));
    }
}

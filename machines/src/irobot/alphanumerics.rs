//! Character overlay drawn from the 0x1C00 RAM.
//!
//! Each RAM byte is one 8x8 cell: bits 0-5 select one of 64 characters in
//! the 136029-124 ROM, bits 6-7 one of four colors. Two 4-color palettes live
//! in the 136029-125 PROM; OUT0's ALPHA_MAP picks between them. Clear pixels
//! are transparent, so the overlay sits on top of whatever the renderer drew.

use irobot_core::device::palette::Rgb;

pub const COLUMNS: usize = 32;
pub const ROWS: usize = 29;
pub const CELL: usize = 8;
pub const WIDTH: usize = COLUMNS * CELL;
pub const HEIGHT: usize = ROWS * CELL;

const NUM_CHARS: usize = 64;

pub struct Alphanumerics {
    /// One byte per character scanline, MSB leftmost.
    glyphs: [[u8; CELL]; NUM_CHARS],
    colors: [[Rgb; 4]; 2],
}

impl Alphanumerics {
    /// `char_rom` holds two nibbles per scanline (high nibble first);
    /// `color_prom` is the 32-byte color PROM. Short images decode as blank.
    pub fn new(char_rom: &[u8], color_prom: &[u8]) -> Self {
        let nibble = |n: usize| char_rom.get(n).copied().unwrap_or(0) & 0x0F;
        let glyphs = std::array::from_fn(|ch| {
            std::array::from_fn(|line| {
                let n = (ch * CELL + line) * 2;
                nibble(n) << 4 | nibble(n + 1)
            })
        });

        let colors = std::array::from_fn(|palette| {
            std::array::from_fn(|color| {
                let byte = color_prom
                    .get(palette * 16 + color + 4)
                    .copied()
                    .unwrap_or(0) as u32;
                let intensity = ((byte & 3) << 1) + 1;
                let ch = |shift: u32| (255 * ((byte >> shift) & 3) * intensity / 21).min(255) as u8;
                Rgb::new(ch(6), ch(4), ch(2))
            })
        });

        Self { glyphs, colors }
    }

    pub fn glyph(&self, ch: usize) -> &[u8; CELL] {
        &self.glyphs[ch & (NUM_CHARS - 1)]
    }

    pub fn color(&self, palette: usize, color: usize) -> Rgb {
        self.colors[palette & 1][color & 3]
    }

    /// Draw set pixels of every cell into an RGB24 buffer `width` pixels
    /// wide. Cells falling outside the buffer are clipped.
    pub fn render(&self, ram: &[u8], alt_palette: bool, buffer: &mut [u8], width: usize) {
        let palette = alt_palette as usize;
        let height = buffer.len() / (width * 3).max(1);

        for (cell, &byte) in ram.iter().take(COLUMNS * ROWS).enumerate() {
            let glyph = self.glyph((byte & 0x3F) as usize);
            let rgb = self.color(palette, (byte >> 6) as usize);
            let (x0, y0) = ((cell % COLUMNS) * CELL, (cell / COLUMNS) * CELL);

            for (dy, &bits) in glyph.iter().enumerate() {
                let y = y0 + dy;
                if y >= height || bits == 0 {
                    continue;
                }
                for dx in (0..CELL).filter(|dx| bits & (0x80 >> dx) != 0) {
                    let x = x0 + dx;
                    if x >= width {
                        break;
                    }
                    let p = (y * width + x) * 3;
                    buffer[p..p + 3].copy_from_slice(&[rgb.r, rgb.g, rgb.b]);
                }
            }
        }
    }
}

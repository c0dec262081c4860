//! Mathbox geometry coprocessor.
//!
//! 32K x 16-bit words of memory: the low 8K words are RAM shared with the
//! CPU, the rest is geometry ROM (136029-101..104). A rising edge on
//! MATH_START runs the command found at word 0, either a native matrix
//! operation or a pass of the scene interpreter that appends primitives to
//! a display list.

pub mod fixed;
pub mod interpreter;
pub mod terrain;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::core::StateError;
use crate::device::display_list::DisplayList;
use crate::device::palette::Palette;

use interpreter::Interpreter;

pub const MEMORY_WORDS: usize = 0x8000;
pub const RAM_WORDS: usize = 0x2000;
pub const ADDRESS_MASK: u16 = 0x7FFF;

pub const ROM_BANK_SIZE: usize = 0x2000;
pub const NUM_ROM_BANKS: usize = 6;

/// CPU-visible RAM window size in bytes (the low 4K words).
pub const CPU_RAM_WINDOW: usize = 0x2000;

/// Matrix operands at or above this address are malformed.
const MATRIX_LIMIT: u16 = 0x8000 - 18;

// Operand pointers for the native commands.
const ROTATE_MATRIX_PTR: usize = 0x06;
const ROTATE_SIN: usize = 0x07;
const ROTATE_COS: usize = 0x08;
const MULTIPLY_A_PTR: usize = 0x7B;
const MULTIPLY_B_PTR: usize = 0x7C;
const MULTIPLY_C_PTR: usize = 0x7D;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    StartPlayfield,
    Unknown,
    Roll,
    Yaw,
    Pitch,
    MatrixMultiply,
    /// Any other word is the address of an object list.
    RasterizeObject(u16),
}

impl Command {
    pub fn decode(word: u16) -> Self {
        match word {
            0x8400 => Self::StartPlayfield,
            0x8600 => Self::Unknown,
            0x8800 => Self::Roll,
            0x9000 => Self::Yaw,
            0xA000 => Self::Pitch,
            0xC000 => Self::MatrixMultiply,
            addr => Self::RasterizeObject(addr),
        }
    }
}

/// Interpreter switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathboxConfig {
    /// Walk the per-row object lists while drawing terrain.
    pub terrain_objects: bool,
    /// Re-emit sloped terrain tops as a vector outline in polygon mode.
    pub sloped_tile_outline: bool,
}

impl Default for MathboxConfig {
    fn default() -> Self {
        Self {
            terrain_objects: true,
            sloped_tile_outline: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathboxState {
    pub ram: Vec<u16>,
    pub math_start: bool,
    pub done: bool,
}

pub struct Mathbox {
    memory: Box<[u16]>,
    rom_banks: Vec<Vec<u8>>,
    math_start: bool,
    done: bool,
    config: MathboxConfig,
}

impl Mathbox {
    pub fn new(config: MathboxConfig) -> Self {
        Self {
            memory: vec![0u16; MEMORY_WORDS].into_boxed_slice(),
            rom_banks: vec![vec![0u8; ROM_BANK_SIZE]; NUM_ROM_BANKS],
            math_start: false,
            done: true,
            config,
        }
    }

    /// Assemble the ROM words and the CPU-visible banks.
    ///
    /// ```text
    /// words 0x2000-0x3FFF   hi 136029-104   lo 136029-103
    /// words 0x4000-0x7FFF   hi 136029-102   lo 136029-101
    /// ```
    ///
    /// The CPU sees the ROM as six 8 KB banks of big-endian words starting
    /// at word 0x2000. Short images leave the remaining bytes zero.
    pub fn load_roms(&mut self, r101: &[u8], r102: &[u8], r103: &[u8], r104: &[u8]) {
        let mut fill = |base: usize, end: usize, lo: &[u8], hi: &[u8]| {
            for (n, word) in self.memory[base..end].iter_mut().enumerate() {
                let l = lo.get(n).copied().unwrap_or(0) as u16;
                let h = hi.get(n).copied().unwrap_or(0) as u16;
                *word = h << 8 | l;
            }
        };
        fill(0x2000, 0x4000, r103, r104);
        fill(0x4000, MEMORY_WORDS, r101, r102);

        for (bank, rom) in self.rom_banks.iter_mut().enumerate() {
            let base = RAM_WORDS + bank * ROM_BANK_SIZE / 2;
            for (n, pair) in rom.chunks_exact_mut(2).enumerate() {
                let word = self.memory[base + n];
                pair[0] = (word >> 8) as u8;
                pair[1] = word as u8;
            }
        }
        debug!("mathbox: geometry ROM loaded");
    }

    pub fn rom_bank(&self, bank: usize) -> &[u8] {
        &self.rom_banks[bank]
    }

    pub fn memory(&self) -> &[u16] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u16] {
        &mut self.memory
    }

    pub fn config(&self) -> &MathboxConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MathboxConfig) {
        self.config = config;
    }

    /// CPU read through the 0x2000 window. Even offsets are the high byte
    /// of a word.
    pub fn read_ram(&self, offset: u16) -> u8 {
        let word = self.memory[((offset as usize) & (CPU_RAM_WINDOW - 1)) >> 1];
        if offset & 1 == 0 { (word >> 8) as u8 } else { word as u8 }
    }

    pub fn write_ram(&mut self, offset: u16, data: u8) {
        let word = &mut self.memory[((offset as usize) & (CPU_RAM_WINDOW - 1)) >> 1];
        *word = if offset & 1 == 0 {
            (*word & 0x00FF) | (data as u16) << 8
        } else {
            (*word & 0xFF00) | data as u16
        };
    }

    pub fn math_start(&self) -> bool {
        self.math_start
    }

    /// MB_DONE status line.
    pub fn done(&self) -> bool {
        self.done
    }

    pub fn reset(&mut self) {
        self.math_start = false;
        self.done = true;
    }

    /// Drive the MATH_START line. A rising edge executes the command at
    /// word 0 to completion and returns true; the caller raises FIRQ.
    /// Any other transition returns false.
    pub fn set_math_start(
        &mut self,
        level: bool,
        out: &mut DisplayList,
        palette: &dyn Palette,
    ) -> bool {
        if level == self.math_start {
            return false;
        }
        self.math_start = level;
        if !level {
            return false;
        }

        self.done = false;
        let command = self.execute(out, palette);
        trace!("mathbox: {command:?}");
        self.done = true;
        true
    }

    /// Run the command at word 0.
    pub fn execute(&mut self, out: &mut DisplayList, palette: &dyn Palette) -> Command {
        let command = Command::decode(self.memory[0]);
        match command {
            Command::Roll => self.rotate(&[(0, 1), (3, 4), (6, 7)], false),
            Command::Yaw => self.rotate(&[(0, 2), (3, 5), (6, 8)], true),
            Command::Pitch => self.rotate(&[(1, 2), (4, 5), (7, 8)], false),
            Command::MatrixMultiply => self.matrix_multiply(),
            Command::Unknown => {}
            Command::StartPlayfield => {
                Interpreter::new(&self.memory, out, palette, &self.config).generate_terrain()
            }
            Command::RasterizeObject(addr) => {
                Interpreter::new(&self.memory, out, palette, &self.config).rasterize_object(addr)
            }
        }
        command
    }

    /// Rotate the matrix at `mem[mem[6]]` by `sin = mem[7]`, `cos = mem[8]`.
    ///
    /// Each `(a, b)` word pair is rotated in place. Yaw uses
    /// `a' = a*cos + b*sin`, `b' = b*cos - a*sin`; roll and pitch use the
    /// opposite sign. Products wrap at 32 bits and are truncated to 16.
    fn rotate(&mut self, pairs: &[(u16, u16); 3], yaw: bool) {
        let base = self.memory[ROTATE_MATRIX_PTR];
        debug_assert!(base < MATRIX_LIMIT, "rotation matrix at {base:#06x}");
        let sin = self.memory[ROTATE_SIN] as i16 as i32;
        let cos = self.memory[ROTATE_COS] as i16 as i32;

        for &(ia, ib) in pairs {
            let pa = ((base.wrapping_add(ia)) & ADDRESS_MASK) as usize;
            let pb = ((base.wrapping_add(ib)) & ADDRESS_MASK) as usize;
            let a = self.memory[pa] as i16 as i32;
            let b = self.memory[pb] as i16 as i32;
            let (na, nb) = if yaw {
                (
                    a.wrapping_mul(cos).wrapping_add(b.wrapping_mul(sin)),
                    b.wrapping_mul(cos).wrapping_sub(a.wrapping_mul(sin)),
                )
            } else {
                (
                    a.wrapping_mul(cos).wrapping_sub(b.wrapping_mul(sin)),
                    b.wrapping_mul(cos).wrapping_add(a.wrapping_mul(sin)),
                )
            };
            self.memory[pa] = (na >> 14) as i16 as u16;
            self.memory[pb] = (nb >> 14) as i16 as u16;
        }
    }

    /// `C = A x B` for the matrices at `mem[mem[0x7B]]`, `mem[mem[0x7C]]`,
    /// written to `mem[mem[0x7D]]`. Word `3i+j` of the result is the dot
    /// product of word-row `i` of A with word-row `j` of B, which stores
    /// the transpose of the mathematical product.
    fn matrix_multiply(&mut self) {
        let a = self.memory[MULTIPLY_A_PTR];
        let b = self.memory[MULTIPLY_B_PTR];
        let c = self.memory[MULTIPLY_C_PTR];
        debug_assert!(a < MATRIX_LIMIT, "multiply A at {a:#06x}");
        debug_assert!(b < MATRIX_LIMIT, "multiply B at {b:#06x}");
        debug_assert!(c < MATRIX_LIMIT, "multiply C at {c:#06x}");

        let at = |base: u16, n: usize| (base.wrapping_add(n as u16) & ADDRESS_MASK) as usize;

        // Each result word is stored before the next is computed, so a C
        // that overlaps A or B feeds later words.
        for i in 0..3 {
            for j in 0..3 {
                let sum = (0..3).fold(0i32, |acc, k| {
                    let x = self.memory[at(a, 3 * i + k)] as i16 as i32;
                    let y = self.memory[at(b, 3 * j + k)] as i16 as i32;
                    acc.wrapping_add(x.wrapping_mul(y))
                });
                self.memory[at(c, 3 * i + j)] = (sum >> 14) as i16 as u16;
            }
        }
    }

    pub fn save_state(&self) -> MathboxState {
        MathboxState {
            ram: self.memory[..RAM_WORDS].to_vec(),
            math_start: self.math_start,
            done: self.done,
        }
    }

    pub fn load_state(&mut self, state: &MathboxState) -> Result<(), StateError> {
        if state.ram.len() != RAM_WORDS {
            return Err(StateError::Incompatible(format!(
                "mathbox RAM is {} words, expected {RAM_WORDS}",
                state.ram.len()
            )));
        }
        self.memory[..RAM_WORDS].copy_from_slice(&state.ram);
        self.math_start = state.math_start;
        self.done = state.done;
        Ok(())
    }
}

impl Default for Mathbox {
    fn default() -> Self {
        Self::new(MathboxConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_view_is_big_endian() {
        let mut mb = Mathbox::default();
        mb.memory_mut()[0x10] = 0x1234;
        assert_eq!(mb.read_ram(0x20), 0x12);
        assert_eq!(mb.read_ram(0x21), 0x34);
        mb.write_ram(0x21, 0xCD);
        mb.write_ram(0x20, 0xAB);
        assert_eq!(mb.memory()[0x10], 0xABCD);
    }

    #[test]
    fn cpu_view_wraps_at_window() {
        let mut mb = Mathbox::default();
        mb.write_ram(0x2000, 0x55);
        assert_eq!(mb.memory()[0], 0x5500);
    }

    #[test]
    fn rom_banks_interleave_images() {
        let mut mb = Mathbox::default();
        let r103 = vec![0x03u8; 0x2000];
        let r104 = vec![0x04u8; 0x2000];
        let r101 = vec![0x01u8; 0x4000];
        let r102 = vec![0x02u8; 0x4000];
        mb.load_roms(&r101, &r102, &r103, &r104);
        assert_eq!(mb.memory()[0x2000], 0x0403);
        assert_eq!(mb.memory()[0x7FFF], 0x0201);
        assert_eq!(&mb.rom_bank(1)[..2], &[0x04, 0x03]);
        assert_eq!(&mb.rom_bank(2)[..2], &[0x02, 0x01]);
        assert_eq!(&mb.rom_bank(5)[0x1FFE..], &[0x02, 0x01]);
    }

    #[test]
    fn decode_commands() {
        assert_eq!(Command::decode(0x8400), Command::StartPlayfield);
        assert_eq!(Command::decode(0xC000), Command::MatrixMultiply);
        assert_eq!(Command::decode(0x0100), Command::RasterizeObject(0x0100));
    }
}

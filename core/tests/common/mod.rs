#![allow(dead_code)]

use irobot_core::device::display_list::DisplayList;
use irobot_core::device::mathbox::Mathbox;
use irobot_core::device::palette::{Palette, Rgb};

pub const ONE: i16 = 0x4000;
pub const IDENTITY: [i16; 9] = [ONE, 0, 0, 0, ONE, 0, 0, 0, ONE];

/// Palette that encodes the index in the red channel.
pub struct IndexPalette;

impl Palette for IndexPalette {
    fn color(&self, index: i32) -> Rgb {
        Rgb::new((index & 0x3F) as u8, 0, 0)
    }
}

pub fn write_words(mb: &mut Mathbox, addr: u16, words: &[u16]) {
    let start = addr as usize;
    mb.memory_mut()[start..start + words.len()].copy_from_slice(words);
}

pub fn write_vector(mb: &mut Mathbox, addr: u16, x: i16, y: i16, z: i16) {
    write_words(mb, addr, &[x as u16, y as u16, z as u16]);
}

pub fn write_matrix(mb: &mut Mathbox, addr: u16, m: [i16; 9]) {
    let words: Vec<u16> = m.iter().map(|&v| v as u16).collect();
    write_words(mb, addr, &words);
}

pub fn read_matrix(mb: &Mathbox, addr: u16) -> [i16; 9] {
    std::array::from_fn(|n| mb.memory()[addr as usize + n] as i16)
}

/// Store `command` at word 0 and pulse MATH_START.
pub fn run_command(mb: &mut Mathbox, command: u16) -> DisplayList {
    let mut out = DisplayList::new();
    mb.memory_mut()[0] = command;
    mb.set_math_start(false, &mut out, &IndexPalette);
    assert!(mb.set_math_start(true, &mut out, &IndexPalette));
    mb.set_math_start(false, &mut out, &IndexPalette);
    out
}

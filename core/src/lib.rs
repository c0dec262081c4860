pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::machine::{InputButton, Machine, StateError};
    pub use crate::core::{Bus, BusMaster, InterruptState, PageHandler, PageMap, PageTarget};
    pub use crate::cpu::Cpu;
    pub use crate::device::display_list::{DisplayList, DisplayListQueue, RenderMode};
    pub use crate::device::palette::{Palette, Rgb};
    pub use crate::device::quad_pokey::AudioSink;
}

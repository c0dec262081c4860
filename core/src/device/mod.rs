pub mod display_list;
pub mod mathbox;
pub mod palette;
pub mod pokey;
pub mod quad_pokey;

pub use display_list::{DisplayList, DisplayListBuilder, DisplayListQueue};
pub use mathbox::{Mathbox, MathboxConfig};
pub use palette::{HardwarePalette, Palette, Rgb};
pub use pokey::Pokey;
pub use quad_pokey::{AudioSink, QuadPokey};

pub mod irobot;
pub mod registry;
pub mod rom_loader;

pub use irobot::{BoardConfig, IRobotSystem};
pub use rom_loader::{RomLoadError, RomSet};

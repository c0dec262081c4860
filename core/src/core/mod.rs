pub mod bus;
pub mod machine;
pub mod page_map;

pub use bus::{Bus, BusMaster, InterruptState};
pub use machine::{InputButton, Machine, StateError};
pub use page_map::{BufferId, PageHandler, PageMap, PageTarget};

//! CPU collaborator interface.
//!
//! The board does not decode instructions itself. A 6809 core supplied by the
//! host implements [`Cpu`] and is stepped one clock at a time against the
//! board's [`Bus`](crate::core::Bus).

use crate::core::{Bus, BusMaster};

pub type CpuBus = dyn Bus<Address = u16, Data = u8>;

/// A CPU core that can be attached to a board.
pub trait Cpu: Send {
    /// Power-on / watchdog reset. Implementations fetch their reset vector
    /// through `bus`.
    fn reset(&mut self, bus: &mut CpuBus);

    /// Execute one clock cycle with bus access. Returns true at an
    /// instruction boundary. Interrupt lines are sampled through
    /// [`Bus::check_interrupts`].
    fn execute_cycle(&mut self, bus: &mut CpuBus, master: BusMaster) -> bool;

    /// True while halted internally (SYNC, CWAI).
    fn is_sleeping(&self) -> bool {
        false
    }
}

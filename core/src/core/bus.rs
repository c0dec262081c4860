/// Identifies who is accessing the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusMaster {
    Cpu(usize), // CPU 0 is the board's 6809
    Host,       // frontend / test harness poking the board outside CPU time
}

/// Generic bus interface seen by a CPU collaborator.
pub trait Bus {
    type Address: Copy + Into<u64>; // u16 for 8-bit CPUs
    type Data; // u8

    fn read(&mut self, master: BusMaster, addr: Self::Address) -> Self::Data;
    fn write(&mut self, master: BusMaster, addr: Self::Address, data: Self::Data);

    /// Check if the bus is halted for this master (TSC/RDY/BUSREQ).
    /// Returns true if the master must pause before the next bus cycle.
    fn is_halted_for(&self, master: BusMaster) -> bool;

    /// Current interrupt lines as seen by `target`.
    fn check_interrupts(&self, target: BusMaster) -> InterruptState;
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterruptState {
    pub nmi: bool,
    pub irq: bool,
    pub firq: bool, // 6809-specific; the Mathbox completion line on I, Robot
}

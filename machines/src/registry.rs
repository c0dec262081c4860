//! Machine registry for automatic front-end discovery.
//!
//! Each front-end-capable machine self-registers via [`inventory::submit!`]
//! with a [`MachineEntry`] containing its CLI name, ROM set name, and a
//! factory function. The front-end discovers available machines at runtime
//! without any central list.

use irobot_core::core::machine::Machine;

use crate::rom_loader::{RomLoadError, RomSet};

/// Describes a front-end-capable arcade machine.
pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "irobot").
    pub name: &'static str,
    /// ROM set name for ZIP lookup (e.g., "irobot").
    pub rom_name: &'static str,
    /// Factory: construct a Machine from a loaded ROM set.
    pub create: fn(&RomSet) -> Result<Box<dyn Machine>, RomLoadError>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        rom_name: &'static str,
        create: fn(&RomSet) -> Result<Box<dyn Machine>, RomLoadError>,
    ) -> Self {
        Self {
            name,
            rom_name,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// Return all registered front-end-capable machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

/// Look up a machine by CLI name or ROM set name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name || e.rom_name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_is_registered() {
        let entry = find("irobot").unwrap();
        assert_eq!(entry.rom_name, "irobot");
        assert!(all().iter().any(|e| e.name == "irobot"));
        assert!(find("joust").is_none());
    }

    #[test]
    fn factory_reports_missing_roms() {
        let entry = find("irobot").unwrap();
        let result = (entry.create)(&RomSet::from_slices(&[]));
        assert!(matches!(result, Err(RomLoadError::MissingFile(_))));
    }
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use irobot_core::core::machine::Machine;
use irobot_machines::{IRobotSystem, registry};
use log::{error, info, warn};

mod audio;
mod config;
mod emulator;
mod input;
mod rasterizer;
mod rom_path;
mod screenshot;
mod video;

use config::Config;

#[derive(Parser)]
#[command(name = "irobot", about = "I, Robot arcade board")]
struct Args {
    /// ROM archive, rompath holding irobot.zip, or directory of ROM files
    rom_path: PathBuf,

    /// Window scale factor
    #[arg(long)]
    scale: Option<u32>,

    /// Settings file (defaults to irobot/config.toml in the config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable sound
    #[arg(long)]
    mute: bool,

    /// Keep the diagnostic ROM unpatched
    #[arg(long)]
    no_patch: bool,

    /// Load ROMs even when checksums do not match
    #[arg(long)]
    skip_checksums: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(scale) = args.scale {
        config.scale = scale;
    }
    if args.mute {
        config.board.sound = false;
    }
    if args.no_patch {
        config.board.patch_self_test = false;
    }

    let rom_name = registry::find("irobot").map_or("irobot", |e| e.rom_name);
    let rom_set = match rom_path::load_rom_set(rom_name, &args.rom_path) {
        Ok(rom_set) => rom_set,
        Err(e) => {
            error!("failed to read ROMs: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut machine = IRobotSystem::new(config.board);
    let loaded = if args.skip_checksums {
        machine.load_rom_set_skip_checksums(&rom_set)
    } else {
        machine.load_rom_set(&rom_set)
    };
    if let Err(e) = loaded {
        error!("failed to load ROMs: {e}");
        return ExitCode::FAILURE;
    }
    info!("loaded {} ROM files from {}", rom_set.file_names().len(), args.rom_path.display());

    let nvram_path = sibling_path(&args.rom_path, "nvram");
    if let Ok(data) = std::fs::read(&nvram_path) {
        machine.load_nvram(&data);
    }

    let paths = emulator::Paths {
        state: sibling_path(&args.rom_path, "state"),
        screenshots: config.screenshot_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
    };
    let key_map = input::default_key_map(machine.input_map());
    machine.reset();
    let result = emulator::run(&mut machine, &key_map, config.scale.max(1), &paths);

    if let Some(data) = machine.save_nvram()
        && let Err(e) = std::fs::write(&nvram_path, data)
    {
        warn!("failed to save EEPROM: {e}");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// `irobot.<ext>` inside a ROM directory, or the archive path with `ext`.
fn sibling_path(rom_path: &Path, ext: &str) -> PathBuf {
    if rom_path.is_dir() {
        rom_path.join(format!("irobot.{ext}"))
    } else {
        rom_path.with_extension(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let args = Args::parse_from(["irobot", "roms", "--scale", "2", "--mute", "--no-patch"]);
        assert_eq!(args.rom_path, PathBuf::from("roms"));
        assert_eq!(args.scale, Some(2));
        assert!(args.mute && args.no_patch && !args.skip_checksums);
        assert!(args.config.is_none());
    }

    #[test]
    fn sibling_paths() {
        assert_eq!(
            sibling_path(Path::new("roms/irobot.zip"), "nvram"),
            PathBuf::from("roms/irobot.nvram")
        );
        let dir = std::env::temp_dir();
        assert_eq!(sibling_path(&dir, "state"), dir.join("irobot.state"));
    }
}

//! Finds the ROM images: a MAME-style rompath, a ZIP archive or a directory
//! of loose files.

use irobot_machines::rom_loader::{RomLoadError, RomSet};
use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Load every file under `path` into a [`RomSet`].
///
/// A `.zip` path is read as an archive. A directory holding `{rom_name}.zip`
/// reads that archive; any other directory is read file by file.
pub fn load_rom_set(rom_name: &str, path: &Path) -> Result<RomSet, RomLoadError> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return load_from_zip(path);
    }

    if path.is_dir() {
        let zip_path = path.join(format!("{rom_name}.zip"));
        if zip_path.exists() {
            return load_from_zip(&zip_path);
        }
        debug!("rom path: reading loose files from {}", path.display());
        return RomSet::from_directory(path);
    }

    Err(RomLoadError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("ROM path not found: {}", path.display()),
    )))
}

fn zip_error(e: zip::result::ZipError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, format!("invalid ZIP: {e}"))
}

fn load_from_zip(path: &Path) -> Result<RomSet, RomLoadError> {
    debug!("rom path: reading archive {}", path.display());
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut archive = zip::ZipArchive::new(reader).map_err(zip_error)?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;
        if entry.is_dir() {
            continue;
        }
        // Archives sometimes nest the images in a folder.
        let name = entry
            .name()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        std::io::Read::read_to_end(&mut entry, &mut data)?;
        entries.push((name, data));
    }

    Ok(RomSet::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_zip(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> std::path::PathBuf {
        let zip_path = dir.join(name);
        let file = File::create(&zip_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (fname, data) in files {
            zip.start_file(*fname, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
        zip_path
    }

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn reads_archive_named_directly() {
        let dir = scratch("irobot_rompath_test_zip");
        let zip_path = create_test_zip(&dir, "roms.zip", &[("136029-124.2n", &[0xAA; 16])]);

        let rom_set = load_rom_set("irobot", &zip_path).unwrap();
        assert_eq!(rom_set.get("124"), Some(&[0xAA; 16][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn reads_archive_from_rompath() {
        let dir = scratch("irobot_rompath_test_dir");
        create_test_zip(&dir, "irobot.zip", &[("irobot/136029-125.5c", &[0xBB; 8])]);

        let rom_set = load_rom_set("irobot", &dir).unwrap();
        assert_eq!(rom_set.get("136029-125.5c"), Some(&[0xBB; 8][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn falls_back_to_loose_files() {
        let dir = scratch("irobot_rompath_test_loose");
        std::fs::write(dir.join("136029-208.1j"), [0xCC; 4]).unwrap();

        let rom_set = load_rom_set("irobot", &dir).unwrap();
        assert_eq!(rom_set.get("208"), Some(&[0xCC; 4][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_path_is_io_error() {
        let path = std::env::temp_dir().join("irobot_rompath_test_nowhere");
        let _ = std::fs::remove_dir_all(&path);
        assert!(matches!(load_rom_set("irobot", &path), Err(RomLoadError::Io(_))));
    }
}

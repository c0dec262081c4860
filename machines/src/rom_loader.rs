//! ROM loading and validation.
//!
//! ROM images come from a ZIP archive, a directory of loose files, or
//! byte slices (for testing). Files are looked up by Atari part number, so
//! `136029-101`, `136029-101.1c` and `irobot/136029-101.bin` all satisfy the
//! entry named `136029-101`. Each entry may carry a checksum, the 32-bit sum
//! of all bytes in the image, which is what the board's diagnostic screen
//! reports.

use std::collections::HashMap;
use std::path::Path;

use log::debug;

/// Sum of all bytes, as printed by the self-test ROM screen.
pub fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |sum, &b| sum.wrapping_add(b as u32))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RomLoadError {
    Io(std::io::Error),

    /// No file in the set carries this part number.
    MissingFile(String),

    /// Image length differs from the part's size.
    SizeMismatch {
        file: String,
        expected: usize,
        actual: usize,
    },

    /// Byte-sum checksum does not match the expected value.
    ChecksumMismatch {
        file: String,
        expected: u32,
        actual: u32,
    },
}

impl std::fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "ROM I/O error: {e}"),
            Self::MissingFile(part) => write!(f, "ROM {part} not found"),
            Self::SizeMismatch {
                file,
                expected,
                actual,
            } => write!(f, "ROM {file} is {actual} bytes, expected {expected}"),
            Self::ChecksumMismatch {
                file,
                expected,
                actual,
            } => write!(
                f,
                "ROM {file}: checksum expected 0x{expected:08X}, got 0x{actual:08X}"
            ),
        }
    }
}

impl std::error::Error for RomLoadError {}

impl From<std::io::Error> for RomLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Images by file name
// ---------------------------------------------------------------------------

pub struct RomSet {
    files: HashMap<String, Vec<u8>>,
}

impl RomSet {
    /// Read every regular file in `path` (non-recursive), keyed by file
    /// name.
    pub fn from_directory(path: &Path) -> Result<Self, RomLoadError> {
        let mut files = HashMap::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() {
                continue;
            }
            let Some(name) = file_path.file_name() else {
                continue;
            };
            let data = std::fs::read(&file_path)?;
            files.insert(name.to_string_lossy().into_owned(), data);
        }
        debug!("rom set: {} files from {}", files.len(), path.display());
        Ok(Self { files })
    }

    /// Build a set from owned (name, data) pairs, e.g. extracted from an
    /// archive.
    pub fn from_entries(entries: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            files: entries.into_iter().collect(),
        }
    }

    /// Build a set from borrowed images; used by tests and tools.
    pub fn from_slices(entries: &[(&str, &[u8])]) -> Self {
        let files = entries
            .iter()
            .map(|(name, data)| (name.to_string(), data.to_vec()))
            .collect();
        Self { files }
    }

    /// Exact match first, then any file whose name contains `part`.
    pub fn get(&self, part: &str) -> Option<&[u8]> {
        if let Some(data) = self.files.get(part) {
            return Some(data);
        }
        let mut matches: Vec<_> = self
            .files
            .iter()
            .filter(|(name, _)| name.contains(part))
            .collect();
        // Deterministic pick when an archive carries duplicates.
        matches.sort_by(|a, b| a.0.cmp(b.0));
        matches.first().map(|(_, data)| data.as_slice())
    }

    /// Like [`get`](Self::get), failing with [`RomLoadError::MissingFile`].
    pub fn require(&self, part: &str) -> Result<&[u8], RomLoadError> {
        self.get(part)
            .ok_or_else(|| RomLoadError::MissingFile(part.to_string()))
    }

    /// Like [`require`](Self::require), also checking the image length.
    pub fn require_sized(&self, part: &str, size: usize) -> Result<&[u8], RomLoadError> {
        match self.require(part)? {
            data if data.len() == size => Ok(data),
            data => Err(RomLoadError::SizeMismatch {
                file: part.to_string(),
                expected: size,
                actual: data.len(),
            }),
        }
    }

    /// File names in arbitrary order.
    pub fn file_names(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// Region layout
// ---------------------------------------------------------------------------

/// One chip of a region.
pub struct RomEntry {
    /// Atari part number, matched against file names.
    pub name: &'static str,
    pub size: usize,
    /// Where the image starts inside the region.
    pub offset: usize,
    /// Expected byte sum, or `None` to accept any contents.
    pub checksum: Option<u32>,
}

/// A memory region assembled from one or more ROM files.
pub struct RomRegion {
    /// Region length; bytes no entry covers stay zero.
    pub size: usize,
    pub entries: &'static [RomEntry],
}

impl RomRegion {
    /// Assemble the region, validating sizes and checksums.
    pub fn load(&self, rom_set: &RomSet) -> Result<Vec<u8>, RomLoadError> {
        self.load_inner(rom_set, true)
    }

    /// Assemble the region, validating sizes only. For patched or
    /// hand-assembled images.
    pub fn load_skip_checksums(&self, rom_set: &RomSet) -> Result<Vec<u8>, RomLoadError> {
        self.load_inner(rom_set, false)
    }

    fn load_inner(&self, rom_set: &RomSet, verify: bool) -> Result<Vec<u8>, RomLoadError> {
        let mut image = vec![0u8; self.size];

        for entry in self.entries {
            debug_assert!(
                entry.offset + entry.size <= self.size,
                "{} does not fit its region",
                entry.name,
            );

            let data = rom_set.require_sized(entry.name, entry.size)?;

            if verify && let Some(expected) = entry.checksum {
                let actual = checksum(data);
                if actual != expected {
                    return Err(RomLoadError::ChecksumMismatch {
                        file: entry.name.to_string(),
                        expected,
                        actual,
                    });
                }
            }

            image[entry.offset..][..entry.size].copy_from_slice(data);
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_byte_sum() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[1, 2, 3]), 6);
        assert_eq!(checksum(&[0xFF; 0x4000]), 0xFF * 0x4000);
    }

    #[test]
    fn get_matches_part_number_inside_file_name() {
        let rom_set = RomSet::from_slices(&[
            ("136029-101.1c", &[0x01]),
            ("136029-102.1d", &[0x02]),
        ]);
        assert_eq!(rom_set.get("136029-102"), Some(&[0x02][..]));
        assert!(rom_set.get("136029-103").is_none());
    }

    #[test]
    fn get_prefers_exact_name() {
        let rom_set = RomSet::from_slices(&[("136029-124", &[0xAA]), ("x136029-124", &[0xBB])]);
        assert_eq!(rom_set.get("136029-124"), Some(&[0xAA][..]));
    }

    #[test]
    fn missing_part_is_an_error() {
        let rom_set = RomSet::from_slices(&[]);
        let result = rom_set.require("136029-405");
        assert!(matches!(result, Err(RomLoadError::MissingFile(_))));
    }

    #[test]
    fn wrong_length_is_an_error() {
        let rom_set = RomSet::from_slices(&[("136029-124.2n", &[0u8; 100])]);
        let result = rom_set.require_sized("136029-124", 0x800);
        assert!(matches!(result, Err(RomLoadError::SizeMismatch { .. })));
    }

    #[test]
    fn from_entries_keeps_names() {
        let rom_set = RomSet::from_entries(vec![("a.bin".into(), vec![1]), ("b.bin".into(), vec![2])]);
        let mut names = rom_set.file_names();
        names.sort();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
    }

    static PAIR: [RomEntry; 2] = [
        RomEntry {
            name: "lo",
            size: 4,
            offset: 0,
            checksum: Some(10),
        },
        RomEntry {
            name: "hi",
            size: 4,
            offset: 4,
            checksum: None,
        },
    ];

    #[test]
    fn load_places_entries_at_offsets() {
        let region = RomRegion {
            size: 8,
            entries: &PAIR,
        };
        let rom_set = RomSet::from_slices(&[("lo", &[1, 2, 3, 4]), ("hi", &[9; 4])]);
        assert_eq!(region.load(&rom_set).unwrap(), vec![1, 2, 3, 4, 9, 9, 9, 9]);
    }

    #[test]
    fn load_rejects_bad_checksum() {
        let region = RomRegion {
            size: 8,
            entries: &PAIR,
        };
        let rom_set = RomSet::from_slices(&[("lo", &[1, 1, 1, 1]), ("hi", &[0; 4])]);
        assert!(matches!(
            region.load(&rom_set),
            Err(RomLoadError::ChecksumMismatch {
                expected: 10,
                actual: 4,
                ..
            })
        ));
        assert!(region.load_skip_checksums(&rom_set).is_ok());
    }

    #[test]
    fn skipping_checksums_still_checks_lengths() {
        let region = RomRegion {
            size: 8,
            entries: &PAIR,
        };
        let rom_set = RomSet::from_slices(&[("lo", &[0; 3]), ("hi", &[0; 4])]);
        assert!(matches!(
            region.load_skip_checksums(&rom_set),
            Err(RomLoadError::SizeMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn directory_files_are_keyed_by_name() {
        let dir = std::env::temp_dir().join("irobot_rom_loader_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("136029-125.2j"), [0xAA, 0xBB]).unwrap();

        let rom_set = RomSet::from_directory(&dir).unwrap();
        assert_eq!(rom_set.get("136029-125"), Some(&[0xAA, 0xBB][..]));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use dicom::core::Tag;
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{DefaultDicomObject, InMemDicomObject};
use tracing::warn;
use walkdir::WalkDir;

pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
pub const BODY_PART_EXAMINED: Tag = Tag(0x0018, 0x0015);
pub const PROTOCOL_NAME: Tag = Tag(0x0018, 0x1030);
pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
pub const WINDOW_CENTER_WIDTH_EXPLANATION: Tag = Tag(0x0028, 0x1055);

/// Small helper trait to pull string values from different DICOM object shapes.
pub trait ElementAccess {
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn has_element(&self, tag: Tag) -> bool;
}

impl ElementAccess for DefaultDicomObject {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.into_owned())
    }

    fn has_element(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }
}

impl ElementAccess for InMemDicomObject<StandardDataDictionary> {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.into_owned())
    }

    fn has_element(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }
}

/// Sniff the Part 10 signature: a 128-byte preamble followed by `DICM`.
/// The extension is never consulted.
pub fn is_dicom(path: &Path) -> bool {
    let mut header = [0u8; 132];
    match File::open(path) {
        Ok(mut file) => file.read_exact(&mut header).is_ok() && &header[128..] == b"DICM",
        Err(_) => false,
    }
}

/// Every DICOM file under `root`, in file-name order within each directory.
///
/// Unreadable directory entries are logged and skipped.
pub fn dicom_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_dicom(path))
        .collect()
}

//! Stamp assets and raster file discovery.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sorted list of the recognized raster files directly inside `dir`.
pub fn list_image_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_supported_image(path))
            .collect(),
        Err(err) => {
            log::warn!("cannot list {}: {err}", dir.display());
            Vec::new()
        }
    };
    files.sort();
    files
}

/// One overlay asset: the file it came from and its decoded pixels.
pub struct Stamp {
    pub path: PathBuf,
    pub image: RgbaImage,
}

/// All stamps available for placement, loaded once at startup. Placed
/// elements refer to entries by index, so the order never changes after
/// loading.
#[derive(Default)]
pub struct StampLibrary {
    stamps: Vec<Stamp>,
}

impl StampLibrary {
    pub fn new(stamps: Vec<Stamp>) -> Self {
        Self { stamps }
    }

    /// Load every recognized raster in `dir`. Files that fail to decode are
    /// skipped with a warning.
    pub fn load_dir(dir: &Path) -> Self {
        let mut stamps = Vec::new();
        for path in list_image_files(dir) {
            match image::open(&path) {
                Ok(img) => stamps.push(Stamp {
                    path,
                    image: img.to_rgba8(),
                }),
                Err(err) => log::warn!("skipping stamp {}: {err}", path.display()),
            }
        }
        log::info!("loaded {} stamps from {}", stamps.len(), dir.display());
        Self::new(stamps)
    }

    pub fn get(&self, index: usize) -> Option<&Stamp> {
        self.stamps.get(index)
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

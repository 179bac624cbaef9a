//! Per-image scenes: a base raster plus the stamps placed on it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;

/// One stamp instance placed on a scene.
///
/// `stamp` indexes into the stamp library. `center` and `size` are in the
/// base image's own pixel space; `size` is fixed at placement, `rotation`
/// only changes while the element is the live-rotating one.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedStamp {
    pub stamp: usize,
    pub center: (f32, f32),
    pub size: (f32, f32),
    pub rotation: f32,
    pub flipped: bool,
}

/// The editable state of one image: its pixels plus placed stamps in
/// insertion order.
pub struct Scene {
    pub base: RgbaImage,
    pub stamps: Vec<PlacedStamp>,
}

impl Scene {
    pub fn new(base: RgbaImage) -> Self {
        Self {
            base,
            stamps: Vec::new(),
        }
    }
}

/// A reversible record of one scene edit.
pub enum EditCommand {
    StampAdded { image: PathBuf, index: usize },
}

/// Scenes keyed by image path. A scene is created the first time its image
/// is shown and kept for the lifetime of the process, so edits survive
/// navigating away and back.
#[derive(Default)]
pub struct SceneStore {
    scenes: BTreeMap<PathBuf, Scene>,
}

impl SceneStore {
    pub fn get(&self, image: &Path) -> Option<&Scene> {
        self.scenes.get(image)
    }

    pub fn get_mut(&mut self, image: &Path) -> Option<&mut Scene> {
        self.scenes.get_mut(image)
    }

    /// The stored scene for `image`, creating it from `load`'s raster when
    /// seen for the first time. `None` only if the raster cannot be produced.
    pub fn get_or_create<F>(&mut self, image: &Path, load: F) -> Option<&mut Scene>
    where
        F: FnOnce() -> Option<RgbaImage>,
    {
        if !self.scenes.contains_key(image) {
            let base = load()?;
            self.scenes.insert(image.to_path_buf(), Scene::new(base));
        }
        self.scenes.get_mut(image)
    }

    /// All scenes in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Scene)> {
        self.scenes.iter()
    }
}

//! The stamping interaction: selection, placement, live rotation, scaling,
//! flipping, navigation, and undo.
//!
//! The editor is headless. The GUI shell translates platform events into the
//! methods below, converting pointer positions into the active scene's pixel
//! space first. `pointer_moved` is expected only for actual movement, one
//! call per pointer-move event.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::geometry;
use crate::scene::{EditCommand, PlacedStamp, Scene, SceneStore};
use crate::stamps::StampLibrary;

/// Everything the stamping interaction mutates, behind one `&mut`.
///
/// Unmet preconditions (no images, no selection, empty undo stack, index at
/// a boundary) make the corresponding method a no-op rather than an error.
pub struct Editor {
    images: Vec<PathBuf>,
    current: usize,
    pub scenes: SceneStore,
    pub library: StampLibrary,
    selected_stamp: Option<usize>,
    scale_factor: f32,
    flipped: bool,
    cursor_size: (f32, f32),
    undo_stack: Vec<EditCommand>,
    /// Index into the active scene's stamps while a rotate-drag is live.
    rotating: Option<usize>,
    /// Reference point for the next incremental rotation delta.
    rotate_ref: (f32, f32),
}

impl Editor {
    pub fn new(library: StampLibrary, cursor_size: (f32, f32)) -> Self {
        Self {
            images: Vec::new(),
            current: 0,
            scenes: SceneStore::default(),
            library,
            selected_stamp: None,
            scale_factor: 1.0,
            flipped: false,
            cursor_size,
            undo_stack: Vec::new(),
            rotating: None,
            rotate_ref: (0.0, 0.0),
        }
    }

    /// Replace the image list, starting over at the first entry. Previously
    /// stored scenes are kept; revisiting an image finds its edits again.
    pub fn set_images(&mut self, images: Vec<PathBuf>) {
        self.images = images;
        self.current = 0;
        self.rotating = None;
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_image(&self) -> Option<&Path> {
        self.images.get(self.current).map(PathBuf::as_path)
    }

    /// Look up or create the scene for the current image, pulling the base
    /// raster from `load` on first sight. Returns whether a scene is
    /// available afterwards.
    pub fn ensure_active_scene<F>(&mut self, load: F) -> bool
    where
        F: FnOnce() -> Option<RgbaImage>,
    {
        let Some(path) = self.images.get(self.current).cloned() else {
            return false;
        };
        self.scenes.get_or_create(&path, load).is_some()
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.scenes.get(self.current_image()?)
    }

    fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        let path = self.images.get(self.current)?.clone();
        self.scenes.get_mut(&path)
    }

    pub fn next_image(&mut self) {
        if self.current + 1 < self.images.len() {
            self.current += 1;
            // The live-rotation index belongs to the scene being left.
            self.rotating = None;
        }
    }

    pub fn previous_image(&mut self) {
        if self.current > 0 {
            self.current -= 1;
            self.rotating = None;
        }
    }

    pub fn select_stamp(&mut self, index: usize) {
        if index < self.library.len() {
            self.selected_stamp = Some(index);
        }
    }

    pub fn selected_stamp(&self) -> Option<usize> {
        self.selected_stamp
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// Called on both Shift press and Shift release: a tap lands back on the
    /// starting value, holding Shift keeps the mirrored orientation.
    pub fn toggle_flip(&mut self) {
        self.flipped = !self.flipped;
    }

    /// One wheel step. The factor is unclamped and drifts multiplicatively
    /// (up then down lands on 0.99, not 1.0).
    pub fn adjust_scale(&mut self, up: bool) {
        if up {
            self.scale_factor *= 1.1;
        } else {
            self.scale_factor *= 0.9;
        }
    }

    /// Size of the live cursor preview in view pixels: the cursor box scaled
    /// by the current factor, aspect-fitted to the selected stamp.
    pub fn preview_size(&self) -> Option<(f32, f32)> {
        let stamp = self.library.get(self.selected_stamp?)?;
        Some(geometry::fit_size(
            stamp.image.width() as f32,
            stamp.image.height() as f32,
            self.cursor_size.0 * self.scale_factor,
            self.cursor_size.1 * self.scale_factor,
        ))
    }

    pub fn rotating(&self) -> Option<usize> {
        self.rotating
    }

    /// Place the selected stamp centered at `scene_pos` and begin the
    /// rotate-drag on it.
    ///
    /// The placed size divides out `view_zoom` so the element's logical size
    /// matches what the cursor preview showed on screen.
    pub fn pointer_down(&mut self, scene_pos: (f32, f32), view_zoom: f32) {
        if self.rotating.is_some() || view_zoom <= 0.0 {
            return;
        }
        let Some(stamp_index) = self.selected_stamp else {
            return;
        };
        let Some(stamp) = self.library.get(stamp_index) else {
            return;
        };
        let size = geometry::fit_size(
            stamp.image.width() as f32,
            stamp.image.height() as f32,
            self.cursor_size.0 * self.scale_factor / view_zoom,
            self.cursor_size.1 * self.scale_factor / view_zoom,
        );
        let flipped = self.flipped;
        let Some(image) = self.current_image().map(Path::to_path_buf) else {
            return;
        };
        let Some(scene) = self.scenes.get_mut(&image) else {
            return;
        };

        scene.stamps.push(PlacedStamp {
            stamp: stamp_index,
            center: scene_pos,
            size,
            rotation: 0.0,
            flipped,
        });
        let index = scene.stamps.len() - 1;
        self.undo_stack.push(EditCommand::StampAdded { image, index });
        self.rotating = Some(index);
        self.rotate_ref = scene_pos;
    }

    /// Live rotation while the button is held. The element's rotation is
    /// replaced with the angle swept about its center from the previous
    /// pointer position to this one, and the reference point then advances
    /// to `scene_pos`. Each move measures against the previous move, not the
    /// placement point.
    pub fn pointer_moved(&mut self, scene_pos: (f32, f32)) {
        let Some(index) = self.rotating else {
            return;
        };
        let reference = self.rotate_ref;
        let Some(scene) = self.active_scene_mut() else {
            return;
        };
        let Some(placed) = scene.stamps.get_mut(index) else {
            return;
        };
        placed.rotation = geometry::rotation_delta(placed.center, reference, scene_pos);
        self.rotate_ref = scene_pos;
    }

    /// Commit the rotate-drag; the last applied rotation stands.
    pub fn pointer_up(&mut self) {
        self.rotating = None;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Revert the most recent placement. Each command is popped once and
    /// never reapplied.
    pub fn undo(&mut self) {
        let Some(command) = self.undo_stack.pop() else {
            return;
        };
        match command {
            EditCommand::StampAdded { image, index } => {
                if let Some(scene) = self.scenes.get_mut(&image) {
                    if index < scene.stamps.len() {
                        scene.stamps.remove(index);
                    }
                }
                if self.current_image() == Some(image.as_path()) && self.rotating == Some(index) {
                    self.rotating = None;
                }
            }
        }
    }
}

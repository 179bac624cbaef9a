//! The eframe shell: window panels, canvas painting, and translation of
//! platform input into editor events.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eframe::egui;
use egui::emath::Rot2;
use image::RgbaImage;

use crate::compositor;
use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::geometry;
use crate::scene::PlacedStamp;
use crate::stamps::{self, StampLibrary};

pub struct StampApp {
    editor: Editor,
    config: EditorConfig,
    base_textures: HashMap<PathBuf, egui::TextureHandle>,
    stamp_textures: Vec<Option<egui::TextureHandle>>,
    shift_down: bool,
}

impl StampApp {
    pub fn new(config: EditorConfig, image_folder: Option<PathBuf>) -> Self {
        let library = StampLibrary::load_dir(&config.stamps_dir);
        let stamp_count = library.len();
        let mut app = Self {
            editor: Editor::new(library, config.cursor_size),
            config,
            base_textures: HashMap::new(),
            stamp_textures: vec![None; stamp_count],
            shift_down: false,
        };
        if let Some(folder) = image_folder {
            app.load_image_folder(&folder);
        }
        app
    }

    fn load_image_folder(&mut self, folder: &Path) {
        let files = stamps::list_image_files(folder);
        log::info!("opening {} images from {}", files.len(), folder.display());
        self.editor.set_images(files);
    }

    fn export(&self) {
        match compositor::export_all(
            &self.editor.scenes,
            &self.editor.library,
            &self.config.export_dir_name,
        ) {
            Ok(written) => log::info!("exported {} composites", written.len()),
            Err(err) => log::error!("export failed: {err:#}"),
        }
    }

    fn base_texture(&mut self, ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
        if let Some(texture) = self.base_textures.get(path) {
            return Some(texture.clone());
        }
        let scene = self.editor.scenes.get(path)?;
        let texture = upload_texture(ctx, format!("image:{}", path.display()), &scene.base);
        self.base_textures.insert(path.to_path_buf(), texture.clone());
        Some(texture)
    }

    fn stamp_texture(&mut self, ctx: &egui::Context, index: usize) -> Option<egui::TextureHandle> {
        if let Some(Some(texture)) = self.stamp_textures.get(index) {
            return Some(texture.clone());
        }
        let stamp = self.editor.library.get(index)?;
        let texture = upload_texture(ctx, format!("stamp:{}", stamp.path.display()), &stamp.image);
        if let Some(slot) = self.stamp_textures.get_mut(index) {
            *slot = Some(texture.clone());
        }
        Some(texture)
    }

    fn controls_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Load Images").clicked() {
                    if let Some(folder) = rfd::FileDialog::new().pick_folder() {
                        self.load_image_folder(&folder);
                    }
                }
                if ui.button("Save Edits").clicked() {
                    self.export();
                }
                if ui.button("Previous Image").clicked() {
                    self.editor.previous_image();
                }
                if ui.button("Next Image").clicked() {
                    self.editor.next_image();
                }
                if ui
                    .add_enabled(self.editor.can_undo(), egui::Button::new("Undo"))
                    .clicked()
                {
                    self.editor.undo();
                }
                ui.separator();
                match self.editor.current_image() {
                    Some(path) => {
                        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("?");
                        ui.label(format!(
                            "{name} ({}/{})",
                            self.editor.current_index() + 1,
                            self.editor.images().len()
                        ));
                    }
                    None => {
                        ui.label("No images loaded");
                    }
                }
                ui.separator();
                ui.label(format!(
                    "Stamp scale: {:.0}%",
                    self.editor.scale_factor() * 100.0
                ));
                if self.editor.is_flipped() {
                    ui.label("flipped");
                }
            });
        });
    }

    fn palette_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("palette")
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                ui.heading("Stamps");
                if self.editor.library.is_empty() {
                    ui.label(format!(
                        "No stamps found in {}",
                        self.config.stamps_dir.display()
                    ));
                    return;
                }
                egui::ScrollArea::vertical().show(ui, |ui| {
                    egui::Grid::new("stamp_grid").show(ui, |ui| {
                        for index in 0..self.editor.library.len() {
                            let Some(texture) = self.stamp_texture(ctx, index) else {
                                continue;
                            };
                            let tex_size = texture.size_vec2();
                            let (w, h) = geometry::fit_size(tex_size.x, tex_size.y, 72.0, 72.0);
                            let thumb = egui::load::SizedTexture::from_handle(&texture);
                            let img = egui::Image::from_texture(thumb)
                                .fit_to_exact_size(egui::vec2(w, h));
                            let selected = self.editor.selected_stamp() == Some(index);
                            if ui.add(egui::ImageButton::new(img).selected(selected)).clicked() {
                                self.editor.select_stamp(index);
                            }
                            if index % 2 == 1 {
                                ui.end_row();
                            }
                        }
                    });
                });
            });
    }

    fn canvas_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            let Some(path) = self.editor.current_image().map(Path::to_path_buf) else {
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Load a folder of images to begin",
                    egui::FontId::proportional(16.0),
                    egui::Color32::GRAY,
                );
                return;
            };
            let Some(texture) = self.base_texture(ctx, &path) else {
                painter.text(
                    canvas_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    format!("Cannot load {}", path.display()),
                    egui::FontId::proportional(16.0),
                    egui::Color32::GRAY,
                );
                return;
            };

            let size = texture.size_vec2();
            let image_size = (size.x, size.y);
            let zoom = fit_zoom(image_size, canvas_rect.size());

            let image_rect = egui::Rect::from_min_max(
                scene_to_screen(canvas_rect, image_size, zoom, (0.0, 0.0)),
                scene_to_screen(canvas_rect, image_size, zoom, image_size),
            );
            painter.image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );

            let placed: Vec<PlacedStamp> = self
                .editor
                .active_scene()
                .map(|scene| scene.stamps.clone())
                .unwrap_or_default();
            for element in &placed {
                if let Some(texture) = self.stamp_texture(ctx, element.stamp) {
                    paint_placed(&painter, canvas_rect, image_size, zoom, element, texture.id());
                }
            }

            // Live preview under the cursor, sized like the placement will be
            // on screen. Hidden while a rotate-drag is in progress.
            let primary_down = ctx.input(|i| i.pointer.primary_down());
            if self.editor.rotating().is_none() {
                if let (Some(hover), Some(selected)) =
                    (response.hover_pos(), self.editor.selected_stamp())
                {
                    if let (Some((w, h)), Some(texture)) = (
                        self.editor.preview_size(),
                        self.stamp_texture(ctx, selected),
                    ) {
                        let rect = egui::Rect::from_center_size(hover, egui::vec2(w, h));
                        let mut mesh = egui::Mesh::with_texture(texture.id());
                        mesh.add_rect_with_uv(
                            rect,
                            stamp_uv(self.editor.is_flipped()),
                            egui::Color32::from_white_alpha(180),
                        );
                        painter.add(egui::Shape::mesh(mesh));
                    }
                }
            }

            let (pressed, released, moved, pointer_pos, scroll) = ctx.input(|i| {
                (
                    i.pointer.primary_pressed(),
                    i.pointer.primary_released(),
                    i.pointer.delta() != egui::Vec2::ZERO,
                    i.pointer.interact_pos(),
                    i.raw_scroll_delta.y,
                )
            });

            if let Some(pos) = pointer_pos {
                let scene_pos = screen_to_scene(canvas_rect, image_size, zoom, pos);
                if pressed && response.hovered() {
                    self.editor.pointer_down(scene_pos, zoom);
                } else if moved && primary_down {
                    self.editor.pointer_moved(scene_pos);
                }
            }
            if released {
                self.editor.pointer_up();
            }
            if scroll != 0.0 && response.hovered() {
                self.editor.adjust_scale(scroll > 0.0);
            }
        });
    }
}

impl eframe::App for StampApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Shift toggles the flip on press and again on release.
        let shift = ctx.input(|i| i.modifiers.shift);
        if shift != self.shift_down {
            self.shift_down = shift;
            self.editor.toggle_flip();
        }

        ctx.input(|i| {
            if i.key_pressed(egui::Key::ArrowRight) {
                self.editor.next_image();
            }
            if i.key_pressed(egui::Key::ArrowLeft) {
                self.editor.previous_image();
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::Z) {
                self.editor.undo();
            }
        });

        if let Some(path) = self.editor.current_image().map(Path::to_path_buf) {
            self.editor.ensure_active_scene(|| load_base_raster(&path));
        }

        self.controls_panel(ctx);
        self.palette_panel(ctx);
        self.canvas_panel(ctx);
    }
}

fn load_base_raster(path: &Path) -> Option<RgbaImage> {
    match image::open(path) {
        Ok(img) => Some(img.to_rgba8()),
        Err(err) => {
            log::warn!("cannot load {}: {err}", path.display());
            None
        }
    }
}

fn upload_texture(ctx: &egui::Context, name: String, img: &RgbaImage) -> egui::TextureHandle {
    let size = [img.width() as usize, img.height() as usize];
    let pixels = img.as_flat_samples();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

/// Zoom that fits the whole image into the canvas, preserving aspect.
fn fit_zoom(image: (f32, f32), avail: egui::Vec2) -> f32 {
    if image.0 <= 0.0 || image.1 <= 0.0 {
        return 1.0;
    }
    (avail.x / image.0).min(avail.y / image.1)
}

/// Convert image-space coords to screen-space.
fn scene_to_screen(canvas: egui::Rect, image: (f32, f32), zoom: f32, p: (f32, f32)) -> egui::Pos2 {
    let center = canvas.center();
    egui::pos2(
        center.x + (p.0 - image.0 * 0.5) * zoom,
        center.y + (p.1 - image.1 * 0.5) * zoom,
    )
}

/// Convert screen-space coords to image-space.
fn screen_to_scene(canvas: egui::Rect, image: (f32, f32), zoom: f32, pos: egui::Pos2) -> (f32, f32) {
    let center = canvas.center();
    (
        (pos.x - center.x) / zoom + image.0 * 0.5,
        (pos.y - center.y) / zoom + image.1 * 0.5,
    )
}

fn stamp_uv(flipped: bool) -> egui::Rect {
    if flipped {
        egui::Rect::from_min_max(egui::pos2(1.0, 0.0), egui::pos2(0.0, 1.0))
    } else {
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0))
    }
}

fn paint_placed(
    painter: &egui::Painter,
    canvas: egui::Rect,
    image: (f32, f32),
    zoom: f32,
    element: &PlacedStamp,
    texture: egui::TextureId,
) {
    let center = scene_to_screen(canvas, image, zoom, element.center);
    let size = egui::vec2(element.size.0 * zoom, element.size.1 * zoom);
    let rect = egui::Rect::from_center_size(center, size);
    let mut mesh = egui::Mesh::with_texture(texture);
    mesh.add_rect_with_uv(rect, stamp_uv(element.flipped), egui::Color32::WHITE);
    mesh.rotate(Rot2::from_angle(element.rotation.to_radians()), center);
    painter.add(egui::Shape::mesh(mesh));
}

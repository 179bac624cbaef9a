//! Flattening scenes to rasters and writing exports.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{imageops, DynamicImage, Rgba, RgbaImage};

use crate::scene::{Scene, SceneStore};
use crate::stamps::StampLibrary;

/// Flatten a scene into a raster sized to its base image.
///
/// The buffer starts fully transparent, the base is composited first, then
/// each placed stamp in insertion order: resized to its recorded size,
/// mirrored if flipped, rotated about its own center, and alpha-blended at
/// its scene position. Overhang past the base bounds is clipped.
pub fn render(scene: &Scene, library: &StampLibrary) -> RgbaImage {
    let mut out = RgbaImage::new(scene.base.width(), scene.base.height());
    imageops::overlay(&mut out, &scene.base, 0, 0);

    for placed in &scene.stamps {
        let Some(stamp) = library.get(placed.stamp) else {
            continue;
        };
        let w = placed.size.0.round() as u32;
        let h = placed.size.1.round() as u32;
        if w == 0 || h == 0 {
            continue;
        }
        let mut layer = imageops::resize(&stamp.image, w, h, imageops::FilterType::Triangle);
        if placed.flipped {
            layer = imageops::flip_horizontal(&layer);
        }
        let layer = rotate_about_center(&layer, placed.rotation);
        let x = (placed.center.0 - layer.width() as f32 / 2.0).round() as i64;
        let y = (placed.center.1 - layer.height() as f32 / 2.0).round() as i64;
        imageops::overlay(&mut out, &layer, x, y);
    }
    out
}

/// Write every stored scene's composite to `<image dir>/<subdir>/<basename>`,
/// creating the subdirectory as needed and overwriting silently.
pub fn export_all(store: &SceneStore, library: &StampLibrary, subdir: &str) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (path, scene) in store.iter() {
        let dir = path.parent().unwrap_or_else(|| Path::new(".")).join(subdir);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = dir.join(name);
        save_raster(render(scene, library), &target)
            .with_context(|| format!("writing {}", target.display()))?;
        log::info!("exported {}", target.display());
        written.push(target);
    }
    Ok(written)
}

// JPEG cannot carry the buffer's alpha channel.
fn save_raster(img: RgbaImage, target: &Path) -> Result<()> {
    let jpeg = target
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    if jpeg {
        DynamicImage::ImageRgba8(img).to_rgb8().save(target)?;
    } else {
        img.save(target)?;
    }
    Ok(())
}

/// Rotate a raster about its center, expanding the bounds to hold the
/// result. Output pixels are inverse-mapped into the source and bilinearly
/// sampled against transparency.
fn rotate_about_center(src: &RgbaImage, angle_deg: f32) -> RgbaImage {
    if angle_deg == 0.0 {
        return src.clone();
    }
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let (src_w, src_h) = (src.width() as f32, src.height() as f32);
    // The 1e-3 slack keeps float error in sin/cos from inflating an exact
    // bound (90 degrees of a 4x2 raster must yield 2x4, not 3x5).
    let out_w = (src_w * cos.abs() + src_h * sin.abs() - 1e-3).ceil().max(1.0) as u32;
    let out_h = (src_w * sin.abs() + src_h * cos.abs() - 1e-3).ceil().max(1.0) as u32;
    let mut dst = RgbaImage::new(out_w, out_h);

    let (out_cx, out_cy) = (out_w as f32 * 0.5, out_h as f32 * 0.5);
    let (src_cx, src_cy) = (src_w * 0.5, src_h * 0.5);
    for dy in 0..out_h {
        for dx in 0..out_w {
            let u = dx as f32 + 0.5 - out_cx;
            let v = dy as f32 + 0.5 - out_cy;
            let sx = u * cos + v * sin + src_cx - 0.5;
            let sy = -u * sin + v * cos + src_cy - 0.5;
            let px = bilinear_sample(src, sx, sy);
            if px[3] > 0 {
                dst.put_pixel(dx, dy, px);
            }
        }
    }
    dst
}

fn bilinear_sample(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let sample = |sx: i32, sy: i32| -> [f32; 4] {
        if sx < 0 || sy < 0 || sx >= img.width() as i32 || sy >= img.height() as i32 {
            [0.0; 4]
        } else {
            let p = img.get_pixel(sx as u32, sy as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        }
    };

    let tl = sample(x0, y0);
    let tr = sample(x0 + 1, y0);
    let bl = sample(x0, y0 + 1);
    let br = sample(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = tl[c] + (tr[c] - tl[c]) * fx;
        let bot = bl[c] + (br[c] - bl[c]) * fx;
        out[c] = (top + (bot - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::PlacedStamp;
    use crate::stamps::Stamp;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);

    fn solid(w: u32, h: u32, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_pixel(w, h, color)
    }

    fn library(images: Vec<RgbaImage>) -> StampLibrary {
        let stamps = images
            .into_iter()
            .enumerate()
            .map(|(i, image)| Stamp {
                path: PathBuf::from(format!("stamp-{i}.png")),
                image,
            })
            .collect();
        StampLibrary::new(stamps)
    }

    fn placed(stamp: usize, center: (f32, f32), size: (f32, f32)) -> PlacedStamp {
        PlacedStamp {
            stamp,
            center,
            size,
            rotation: 0.0,
            flipped: false,
        }
    }

    fn close_to(p: Rgba<u8>, q: Rgba<u8>) -> bool {
        p.0.iter().zip(q.0.iter()).all(|(a, b)| a.abs_diff(*b) <= 3)
    }

    #[test]
    fn empty_scene_renders_the_base() {
        let scene = Scene::new(solid(4, 4, GRAY));
        let out = render(&scene, &library(vec![]));
        assert_eq!(out.dimensions(), (4, 4));
        assert!(out.pixels().all(|p| *p == GRAY));
    }

    #[test]
    fn stamp_drawn_centered_at_its_position() {
        let mut scene = Scene::new(solid(10, 10, GRAY));
        scene.stamps.push(placed(0, (5.0, 5.0), (2.0, 2.0)));
        let out = render(&scene, &library(vec![solid(2, 2, BLUE)]));

        assert_eq!(*out.get_pixel(4, 4), BLUE);
        assert_eq!(*out.get_pixel(5, 5), BLUE);
        assert_eq!(*out.get_pixel(3, 3), GRAY);
        assert_eq!(*out.get_pixel(6, 6), GRAY);
    }

    #[test]
    fn later_insertions_draw_on_top() {
        let mut scene = Scene::new(solid(10, 10, GRAY));
        scene.stamps.push(placed(0, (5.0, 5.0), (2.0, 2.0)));
        scene.stamps.push(placed(1, (5.0, 5.0), (2.0, 2.0)));
        let out = render(
            &scene,
            &library(vec![solid(2, 2, RED), solid(2, 2, BLUE)]),
        );
        assert_eq!(*out.get_pixel(5, 5), BLUE);
    }

    #[test]
    fn missing_stamp_index_is_skipped() {
        let mut scene = Scene::new(solid(4, 4, GRAY));
        scene.stamps.push(placed(7, (2.0, 2.0), (2.0, 2.0)));
        let out = render(&scene, &library(vec![]));
        assert!(out.pixels().all(|p| *p == GRAY));
    }

    #[test]
    fn degenerate_size_is_skipped() {
        let mut scene = Scene::new(solid(4, 4, GRAY));
        scene.stamps.push(placed(0, (2.0, 2.0), (0.0, 0.0)));
        let out = render(&scene, &library(vec![solid(2, 2, BLUE)]));
        assert!(out.pixels().all(|p| *p == GRAY));
    }

    #[test]
    fn overhang_is_clipped() {
        let mut scene = Scene::new(solid(4, 4, GRAY));
        scene.stamps.push(placed(0, (0.0, 0.0), (4.0, 4.0)));
        let out = render(&scene, &library(vec![solid(4, 4, BLUE)]));

        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(*out.get_pixel(0, 0), BLUE);
        assert_eq!(*out.get_pixel(3, 3), GRAY);
    }

    #[test]
    fn flip_mirrors_horizontally() {
        let mut stamp = RgbaImage::new(2, 1);
        stamp.put_pixel(0, 0, RED);
        stamp.put_pixel(1, 0, GREEN);

        let mut scene = Scene::new(solid(4, 1, GRAY));
        let mut element = placed(0, (2.0, 0.5), (2.0, 1.0));
        element.flipped = true;
        scene.stamps.push(element);

        let out = render(&scene, &library(vec![stamp]));
        assert_eq!(*out.get_pixel(1, 0), GREEN);
        assert_eq!(*out.get_pixel(2, 0), RED);
    }

    #[test]
    fn zero_rotation_is_exact() {
        let stamp = solid(3, 3, BLUE);
        let rotated = rotate_about_center(&stamp, 0.0);
        assert_eq!(rotated, stamp);
    }

    #[test]
    fn half_turn_reverses_a_row() {
        let mut stamp = RgbaImage::new(3, 1);
        stamp.put_pixel(0, 0, RED);
        stamp.put_pixel(1, 0, GREEN);
        stamp.put_pixel(2, 0, BLUE);

        let rotated = rotate_about_center(&stamp, 180.0);
        assert_eq!(rotated.dimensions(), (3, 1));
        assert!(close_to(*rotated.get_pixel(0, 0), BLUE));
        assert!(close_to(*rotated.get_pixel(1, 0), GREEN));
        assert!(close_to(*rotated.get_pixel(2, 0), RED));
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let stamp = solid(4, 2, BLUE);
        let rotated = rotate_about_center(&stamp, 90.0);
        assert_eq!(rotated.dimensions(), (2, 4));
        assert!(close_to(*rotated.get_pixel(1, 2), BLUE));
    }

    #[test]
    fn rotated_corners_stay_transparent() {
        let stamp = solid(8, 8, BLUE);
        let rotated = rotate_about_center(&stamp, 45.0);
        // The bounding box grows and its corners lie outside the square.
        assert!(rotated.width() > 8);
        assert_eq!(rotated.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn export_writes_one_file_per_scene() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");

        let mut store = SceneStore::default();
        let scene = store
            .get_or_create(&a, || Some(solid(6, 6, GRAY)))
            .unwrap();
        scene.stamps.push(placed(0, (3.0, 3.0), (2.0, 2.0)));
        store.get_or_create(&b, || Some(solid(4, 4, GRAY)));

        let library = library(vec![solid(2, 2, BLUE)]);
        let written = export_all(&store, &library, "edited").unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join("edited").join("a.png"),
                dir.path().join("edited").join("b.png"),
            ]
        );
        let exported = image::open(&written[0]).unwrap().to_rgba8();
        assert_eq!(exported.dimensions(), (6, 6));
        assert_eq!(*exported.get_pixel(3, 3), BLUE);
        assert_eq!(*exported.get_pixel(0, 0), GRAY);

        // Exporting again overwrites without complaint.
        export_all(&store, &library, "edited").unwrap();
    }

    #[test]
    fn jpeg_export_is_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("photo.jpg");

        let mut store = SceneStore::default();
        store.get_or_create(&a, || Some(solid(4, 4, GRAY)));

        let written = export_all(&store, &library(vec![]), "edited").unwrap();
        assert_eq!(written.len(), 1);
        assert!(image::open(&written[0]).is_ok());
    }
}

mod app;
mod compositor;
mod config;
mod editor;
mod geometry;
mod scene;
mod stamps;

use std::path::PathBuf;

use eframe::egui;

use app::StampApp;
use config::EditorConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Optional argument: a folder of images to open at startup instead of
    // going through the picker.
    let image_folder = std::env::args().nth(1).map(PathBuf::from);
    if let Some(ref folder) = image_folder {
        if !folder.is_dir() {
            eprintln!("Not a directory: {}", folder.display());
            std::process::exit(1);
        }
    }

    let config = EditorConfig::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 700.0])
            .with_title("stamp-edit"),
        ..Default::default()
    };

    eframe::run_native(
        "stamp-edit",
        options,
        Box::new(move |_cc| Ok(Box::new(StampApp::new(config, image_folder)))),
    )
    .expect("Failed to run eframe");
}

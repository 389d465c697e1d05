// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the preview pipeline demo
//!
//! This module provides command-line functionality for:
//! - Listing available filters
//! - Running the pipeline headlessly against the simulated stack

use camera_preview::backends::simulated::SimulatedStack;
use camera_preview::{CameraDrawer, FilterType, PreviewConfig, SurfaceHandle};
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// List all available filters
pub fn list_filters() -> Result<(), Box<dyn std::error::Error>> {
    println!("Available filters:");
    println!();
    for (index, filter) in FilterType::ALL.iter().enumerate() {
        println!("  [{}] {}", index, filter.display_name());
    }
    Ok(())
}

/// Run the preview pipeline against the simulated stack
///
/// Exercises a full session: create surface, report its size, stream the
/// requested number of frames, take one picture, then tear down and print a
/// summary of everything the pipeline did.
pub fn run_preview(
    frames: u64,
    filter: Option<FilterType>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => PreviewConfig::load(&path)?,
        None => PreviewConfig::default(),
    };
    if let Some(filter) = filter {
        config.default_filter = filter;
    }

    // Portrait sensor: image dimensions come out swapped
    let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 90));
    let (view_width, view_height) = (config.view_width, config.view_height);
    let frame_interval = Duration::from_millis(1000 / u64::from(config.desired_fps.max(1)));

    let drawer = CameraDrawer::new(config, Arc::clone(&stack) as Arc<dyn camera_preview::PreviewStack>);
    drawer.surface_created(SurfaceHandle(1));
    drawer.surface_changed(view_width, view_height);
    stack.wait_for_camera();

    println!(
        "Streaming {} simulated frames at {}x{}...",
        frames, view_width, view_height
    );
    for _ in 0..frames {
        stack.emit_frame();
        thread::sleep(frame_interval);
    }

    drawer.take_picture();
    // Let the queued picture request meet one more frame
    thread::sleep(frame_interval);
    stack.emit_frame();
    thread::sleep(frame_interval);

    drawer.surface_destroyed();

    let journal = stack.journal();
    let picture_name = format!("photo_{}", Local::now().format("%Y-%m-%d_%H-%M-%S"));
    println!();
    println!("Session summary:");
    println!("  frames produced:   {}", frames + 1);
    println!("  frames consumed:   {}", journal.tex_image_updates);
    println!("  draws presented:   {}", journal.swaps);
    println!(
        "  latest on screen:  {}",
        journal
            .last_presented_frame
            .map(|f| f.to_string())
            .unwrap_or_else(|| "none".into())
    );
    println!(
        "  pictures captured: {} ({})",
        journal.pictures.len(),
        picture_name
    );
    println!(
        "  image size:        {:?} (sensor orientation 90)",
        journal.camera_input_size
    );

    Ok(())
}

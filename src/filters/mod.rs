// SPDX-License-Identifier: GPL-3.0-only

//! Filter chain types
//!
//! The preview render path is an ordered pair of filters: a mandatory
//! camera-input filter that samples the external camera texture (and applies
//! the pixel transform matrix), optionally followed by one active effect
//! filter. The effect filter is swappable at runtime; concrete filter
//! implementations live behind [`FilterFactory`].

use crate::backends::{Matrix4, TextureId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Filter identifiers for the preview effect stage
///
/// `Standard` means "no active effect filter": the camera-input filter draws
/// straight to the display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// No filter applied (displays as "ORIGINAL")
    #[default]
    Standard,
    /// Black & white / monochrome filter
    Mono,
    /// Sepia tone filter (warm brownish tint)
    Sepia,
    /// Boosted color saturation
    Saturation,
    /// Vivid - boosted saturation and contrast
    Vivid,
    /// Cool - blue color temperature shift
    Cool,
    /// Warm - orange/amber color temperature
    Warm,
    /// Negative - inverted colors
    Negative,
    /// Vignette - darkened edges
    Vignette,
}

impl FilterType {
    /// All filter variants for UI/CLI iteration
    pub const ALL: [FilterType; 9] = [
        FilterType::Standard,
        FilterType::Mono,
        FilterType::Sepia,
        FilterType::Saturation,
        FilterType::Vivid,
        FilterType::Cool,
        FilterType::Warm,
        FilterType::Negative,
        FilterType::Vignette,
    ];

    /// Get display name for the filter
    pub fn display_name(&self) -> &'static str {
        match self {
            FilterType::Standard => "Original",
            FilterType::Mono => "Mono",
            FilterType::Sepia => "Sepia",
            FilterType::Saturation => "Saturation",
            FilterType::Vivid => "Vivid",
            FilterType::Cool => "Cool",
            FilterType::Warm => "Warm",
            FilterType::Negative => "Negative",
            FilterType::Vignette => "Vignette",
        }
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterType::ALL
            .into_iter()
            .find(|f| f.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown filter: {}", s))
    }
}

/// The mandatory first render stage
///
/// Converts the external camera texture into a normal 2D texture, applying
/// the capture texture's transform matrix. Can render either directly to the
/// display surface or into an intermediate framebuffer for a downstream
/// effect filter.
pub trait CameraInputFilter: Send {
    /// Source image dimensions changed (camera opened or reconfigured)
    fn on_input_size_changed(&mut self, width: u32, height: u32);

    /// Display (view) dimensions changed
    fn on_display_changed(&mut self, width: u32, height: u32);

    /// Allocate (or re-allocate) the intermediate framebuffer
    fn init_framebuffer(&mut self, width: u32, height: u32);

    /// Release the intermediate framebuffer, if allocated
    fn destroy_framebuffer(&mut self);

    /// Render the camera texture directly to the current surface
    fn draw_frame(&mut self, texture: TextureId, matrix: &Matrix4);

    /// Render the camera texture into the intermediate framebuffer and
    /// return the resulting 2D texture
    fn draw_to_texture(&mut self, texture: TextureId, matrix: &Matrix4) -> TextureId;

    /// Release all GPU resources held by this filter
    fn release(&mut self);
}

/// An active effect filter (second render stage)
pub trait ImageFilter: Send {
    /// Display (view) dimensions changed
    fn on_display_changed(&mut self, _width: u32, _height: u32) {}

    /// Render the (already converted) 2D input texture to the current surface
    fn draw_frame(&mut self, texture: TextureId, matrix: &Matrix4);

    /// Release all GPU resources held by this filter
    fn release(&mut self) {}
}

/// Maps filter identifiers to filter instances
///
/// Invoked only from the render thread; returned filters are owned by the
/// render loop, which releases their GPU resources before dropping them.
pub trait FilterFactory: Send {
    /// Create the mandatory camera-input filter
    fn camera_filter(&mut self) -> Box<dyn CameraInputFilter>;

    /// Create the effect filter for `filter_type`, or `None` for
    /// [`FilterType::Standard`]
    fn get_filter(&mut self, filter_type: FilterType) -> Option<Box<dyn ImageFilter>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_unique_and_nonempty() {
        for filter in FilterType::ALL {
            assert!(!filter.display_name().is_empty());
        }
        let mut names: Vec<_> = FilterType::ALL.iter().map(|f| f.display_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FilterType::ALL.len());
    }

    #[test]
    fn from_str_roundtrips_display_names() {
        for filter in FilterType::ALL {
            let parsed: FilterType = filter.display_name().parse().unwrap();
            assert_eq!(parsed, filter);
        }
        assert!("plasma".parse::<FilterType>().is_err());
    }
}

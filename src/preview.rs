//! Scaled live preview.
//!
//! The base image is fitted into a container of a given width and the
//! watermark is placed with the same [`place`](crate::placement::place)
//! formula as at export, using preview-scale dimensions. Text sizes are
//! expressed relative to a 1000 px wide image.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::debug;

use crate::color::Color;
use crate::engine::{CompositeOptions, Compositor};
use crate::text;

/// Image width at which preview text is drawn at its nominal font size.
pub const TEXT_REFERENCE_WIDTH: f32 = 1000.0;

/// Font size of the preview caption.
pub const CAPTION_FONT_SIZE: f32 = 16.0;

const CAPTION_OPACITY: f32 = 0.7;
const CAPTION_LEFT: f32 = 10.0;
const CAPTION_BOTTOM_OFFSET: f32 = 30.0;

/// Options for [`Compositor::preview`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOptions {
    /// Container width in pixels; the preview is exactly this wide.
    pub width: u32,
    /// Optional label drawn near the bottom-left corner.
    pub caption: Option<String>,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            width: 600,
            caption: None,
        }
    }
}

/// Preview dimensions for a `base_width` x `base_height` image shown in a
/// container `container_width` pixels wide.
///
/// The height follows the base aspect ratio but never exceeds the width, so
/// tall images are squashed into a square frame.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn preview_size(base_width: u32, base_height: u32, container_width: u32) -> (u32, u32) {
    if base_width == 0 {
        return (container_width, 0);
    }
    let height = f64::from(container_width) * f64::from(base_height) / f64::from(base_width);
    let height = (height.round() as u32).min(container_width);
    (container_width, height)
}

/// Multiplier applied to text font sizes in a preview `preview_width` wide.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn text_scale(preview_width: u32) -> f32 {
    preview_width as f32 / TEXT_REFERENCE_WIDTH
}

impl Compositor {
    /// Render a preview of the watermark on `base`.
    ///
    /// The result is `preview.width` pixels wide, sized by [`preview_size`].
    /// Image watermarks scale with the preview width and text sizes with
    /// [`text_scale`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn preview(
        &self,
        base: &DynamicImage,
        options: &CompositeOptions<'_>,
        preview: &PreviewOptions,
    ) -> RgbaImage {
        let (width, height) = preview_size(base.width(), base.height(), preview.width);
        if width == 0 || height == 0 {
            return RgbaImage::new(width, height);
        }
        debug!(width, height, "rendering preview");

        let mut canvas = imageops::resize(&base.to_rgba8(), width, height, FilterType::Triangle);
        self.stamp(
            &mut canvas,
            options.anchor,
            &options.watermark,
            text_scale(width),
        );

        if let Some(caption) = preview.caption.as_deref().filter(|c| !c.is_empty()) {
            text::draw_text(
                &mut canvas,
                self.fonts().face(false, false),
                CAPTION_FONT_SIZE,
                CAPTION_LEFT,
                height as f32 - CAPTION_BOTTOM_OFFSET,
                caption,
                Color::BLACK,
                CAPTION_OPACITY,
            );
        }
        canvas
    }
}

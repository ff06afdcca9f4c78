//! Source-over compositing and PNG encoding.
//!
//! Every draw takes its opacity as an argument. The effective alpha of a
//! layer pixel is `pixel_alpha * opacity`, composited with the Porter-Duff
//! "over" operator onto the target.

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

use crate::error::{Error, Result};

/// Resampling filter used when a watermark is scaled to its draw size.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Composite `src` over `dst` in place, multiplying `src` alpha by `opacity`.
///
/// `opacity` is clamped to `[0, 1]`.
pub fn blend_pixel(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let src_alpha = f32::from(src[3]) / 255.0 * opacity.clamp(0.0, 1.0);
    if src_alpha <= 0.0 {
        return;
    }
    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    for ch in 0..3 {
        let s = f32::from(src[ch]);
        let d = f32::from(dst[ch]);
        let value = (s * src_alpha + d * dst_alpha * (1.0 - src_alpha)) / out_alpha;
        dst[ch] = to_channel(value);
    }
    dst[3] = to_channel(out_alpha * 255.0);
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Draw `layer` resampled to `width` x `height` with its top-left corner at
/// (`x`, `y`) on `target`.
///
/// The destination rectangle is snapped to whole pixels. Parts falling
/// outside the target are clipped; a rectangle that rounds to zero width or
/// height draws nothing. A rectangle larger than the target is sampled only
/// where it is visible, so memory stays bounded by the target size.
#[allow(clippy::cast_possible_truncation)]
pub fn overlay_scaled(
    target: &mut RgbaImage,
    layer: &RgbaImage,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    opacity: f32,
) {
    if layer.width() == 0 || layer.height() == 0 {
        return;
    }
    if !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite()) {
        return;
    }

    let left = x.round() as i64;
    let top = y.round() as i64;
    let right = (x + width).round() as i64;
    let bottom = (y + height).round() as i64;
    if right <= left || bottom <= top {
        return;
    }

    let (tw, th) = (i64::from(target.width()), i64::from(target.height()));
    if right <= 0 || bottom <= 0 || left >= tw || top >= th {
        return;
    }

    let draw = DrawRect {
        left,
        top,
        width: right - left,
        height: bottom - top,
    };
    if draw.width <= tw && draw.height <= th {
        let (Ok(draw_w), Ok(draw_h)) = (u32::try_from(draw.width), u32::try_from(draw.height))
        else {
            return;
        };
        let resized;
        let scaled = if (draw_w, draw_h) == layer.dimensions() {
            layer
        } else {
            resized = imageops::resize(layer, draw_w, draw_h, RESIZE_FILTER);
            &resized
        };
        draw_layer(target, scaled, left, top, opacity);
    } else {
        draw_sampled(target, layer, draw, opacity);
    }
}

/// Whole-pixel destination rectangle of a scaled layer.
#[derive(Debug, Clone, Copy)]
struct DrawRect {
    left: i64,
    top: i64,
    width: i64,
    height: i64,
}

/// Bilinearly sample `layer` for each visible pixel of `draw`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn draw_sampled(target: &mut RgbaImage, layer: &RgbaImage, draw: DrawRect, opacity: f32) {
    let x_start = draw.left.max(0);
    let y_start = draw.top.max(0);
    let x_end = (draw.left + draw.width).min(i64::from(target.width()));
    let y_end = (draw.top + draw.height).min(i64::from(target.height()));

    let step_x = f64::from(layer.width()) / draw.width as f64;
    let step_y = f64::from(layer.height()) / draw.height as f64;

    for ty in y_start..y_end {
        let sy = ((ty - draw.top) as f64 + 0.5) * step_y - 0.5;
        for tx in x_start..x_end {
            let sx = ((tx - draw.left) as f64 + 0.5) * step_x - 0.5;
            let src = sample_bilinear(layer, sx, sy);
            blend_pixel(target.get_pixel_mut(tx as u32, ty as u32), src, opacity);
        }
    }
}

/// Interpolate `layer` at the fractional pixel centre (`sx`, `sy`).
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn sample_bilinear(layer: &RgbaImage, sx: f64, sy: f64) -> Rgba<u8> {
    let max_x = f64::from(layer.width() - 1);
    let max_y = f64::from(layer.height() - 1);
    let sx = sx.clamp(0.0, max_x);
    let sy = sy.clamp(0.0, max_y);

    let x0 = sx.floor() as u32;
    let y0 = sy.floor() as u32;
    let x1 = (x0 + 1).min(layer.width() - 1);
    let y1 = (y0 + 1).min(layer.height() - 1);
    let fx = (sx - f64::from(x0)) as f32;
    let fy = (sy - f64::from(y0)) as f32;

    let p00 = layer.get_pixel(x0, y0);
    let p10 = layer.get_pixel(x1, y0);
    let p01 = layer.get_pixel(x0, y1);
    let p11 = layer.get_pixel(x1, y1);

    let mut out = Rgba([0; 4]);
    for ch in 0..4 {
        let top = f32::from(p00[ch]) * (1.0 - fx) + f32::from(p10[ch]) * fx;
        let bottom = f32::from(p01[ch]) * (1.0 - fx) + f32::from(p11[ch]) * fx;
        out[ch] = to_channel(top * (1.0 - fy) + bottom * fy);
    }
    out
}

/// Composite `layer` at native size with its top-left corner at (`left`, `top`).
// Loop bounds are clipped to the target, so the casts stay within u32.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn draw_layer(target: &mut RgbaImage, layer: &RgbaImage, left: i64, top: i64, opacity: f32) {
    let x_start = left.max(0);
    let y_start = top.max(0);
    let x_end = (left + i64::from(layer.width())).min(i64::from(target.width()));
    let y_end = (top + i64::from(layer.height())).min(i64::from(target.height()));

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let src = *layer.get_pixel((tx - left) as u32, (ty - top) as u32);
            blend_pixel(target.get_pixel_mut(tx as u32, ty as u32), src, opacity);
        }
    }
}

/// Encode an RGBA raster as PNG bytes.
///
/// # Errors
///
/// Returns [`Error::Encode`] if the encoder rejects the image.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(Error::Encode)?;
    Ok(bytes)
}

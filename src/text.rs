//! Single-line text layout and drawing.
//!
//! Font sizes are CSS pixels: the em square of the face spans `font_size`
//! pixels. Text is laid out left to right on one line with its top edge at
//! the requested `y`. Widths come from the face's advance and kerning
//! metrics, so they differ slightly between font families.

use ab_glyph::{point, Font, FontArc, GlyphId, OutlinedGlyph, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::blending::blend_pixel;
use crate::color::Color;
use crate::error::{Error, Result};

const DEJAVU_SANS: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");
const DEJAVU_SANS_BOLD: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");
const DEJAVU_SANS_OBLIQUE: &[u8] = include_bytes!("fonts/DejaVuSans-Oblique.ttf");
const DEJAVU_SANS_BOLD_OBLIQUE: &[u8] = include_bytes!("fonts/DejaVuSans-BoldOblique.ttf");

/// The four style faces used to render text watermarks.
#[derive(Clone)]
pub struct FontFamily {
    regular: FontArc,
    bold: FontArc,
    italic: FontArc,
    bold_italic: FontArc,
}

impl FontFamily {
    /// The embedded sans-serif family (DejaVu Sans).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Font`] if an embedded face fails to parse.
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            regular: parse_static(DEJAVU_SANS)?,
            bold: parse_static(DEJAVU_SANS_BOLD)?,
            italic: parse_static(DEJAVU_SANS_OBLIQUE)?,
            bold_italic: parse_static(DEJAVU_SANS_BOLD_OBLIQUE)?,
        })
    }

    /// A family that uses one face for every style.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Font`] if `data` is not a TrueType/OpenType font.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let face = FontArc::try_from_vec(data).map_err(|e| Error::Font(e.to_string()))?;
        Ok(Self {
            regular: face.clone(),
            bold: face.clone(),
            italic: face.clone(),
            bold_italic: face,
        })
    }

    /// The face for the given style flags.
    #[must_use]
    pub fn face(&self, bold: bool, italic: bool) -> &FontArc {
        match (bold, italic) {
            (false, false) => &self.regular,
            (true, false) => &self.bold,
            (false, true) => &self.italic,
            (true, true) => &self.bold_italic,
        }
    }
}

impl std::fmt::Debug for FontFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFamily")
            .field("glyphs", &self.regular.glyph_count())
            .finish_non_exhaustive()
    }
}

fn parse_static(data: &'static [u8]) -> Result<FontArc> {
    FontArc::try_from_slice(data).map_err(|e| Error::Font(e.to_string()))
}

/// Scale at which the em square of `font` is `font_size` pixels tall.
fn em_scale(font: &FontArc, font_size: f32) -> PxScale {
    match font.units_per_em() {
        Some(units) if units > 0.0 => PxScale::from(font_size * font.height_unscaled() / units),
        _ => PxScale::from(font_size),
    }
}

fn usable_size(font_size: f32) -> bool {
    font_size.is_finite() && font_size > 0.0
}

/// Whitespace control characters are drawn as plain spaces.
fn normalize(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().map(|c| match c {
        '\t' | '\n' | '\r' | '\u{000C}' => ' ',
        other => other,
    })
}

/// Advance width of `text` drawn at `font_size`, including kerning.
#[must_use]
pub fn measure_width(font: &FontArc, font_size: f32, text: &str) -> f32 {
    if !usable_size(font_size) {
        return 0.0;
    }
    let scaled = font.as_scaled(em_scale(font, font_size));
    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;

    for ch in normalize(text) {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

fn outline(font: &FontArc, font_size: f32, x: f32, y: f32, text: &str) -> Vec<OutlinedGlyph> {
    let scale = em_scale(font, font_size);
    let scaled = font.as_scaled(scale);
    let baseline = y + scaled.ascent();
    let mut cursor = x;
    let mut prev: Option<GlyphId> = None;
    let mut glyphs = Vec::new();

    for ch in normalize(text) {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            cursor += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, point(cursor, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            glyphs.push(outlined);
        }
        cursor += scaled.h_advance(id);
        prev = Some(id);
    }
    glyphs
}

/// Draw `text` with its top-left corner at (`x`, `y`).
///
/// Glyph coverage is accumulated into one mask before blending, so
/// overlapping glyphs are not darkened twice. Pixels outside `target` are
/// clipped.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::too_many_arguments
)]
pub fn draw_text(
    target: &mut RgbaImage,
    font: &FontArc,
    font_size: f32,
    x: f32,
    y: f32,
    text: &str,
    color: Color,
    opacity: f32,
) {
    if !usable_size(font_size) || !x.is_finite() || !y.is_finite() {
        return;
    }
    let (tw, th) = (i64::from(target.width()), i64::from(target.height()));
    let glyphs: Vec<OutlinedGlyph> = outline(font, font_size, x, y, text)
        .into_iter()
        .filter(|g| {
            let b = g.px_bounds();
            b.max.x > 0.0 && b.max.y > 0.0 && (b.min.x as i64) < tw && (b.min.y as i64) < th
        })
        .collect();
    let Some(first) = glyphs.first() else {
        return;
    };

    let mut bounds = first.px_bounds();
    for g in &glyphs[1..] {
        let b = g.px_bounds();
        bounds.min.x = bounds.min.x.min(b.min.x);
        bounds.min.y = bounds.min.y.min(b.min.y);
        bounds.max.x = bounds.max.x.max(b.max.x);
        bounds.max.y = bounds.max.y.max(b.max.y);
    }

    let Some(clip) = visible_rect(bounds, tw, th) else {
        return;
    };

    let mut mask = vec![0.0f32; clip.width * clip.height];
    for g in &glyphs {
        let b = g.px_bounds();
        let gx = b.min.x as i64 - clip.left;
        let gy = b.min.y as i64 - clip.top;
        g.draw(|px, py, coverage| {
            let mx = gx + i64::from(px);
            let my = gy + i64::from(py);
            if mx >= 0 && my >= 0 && (mx as usize) < clip.width && (my as usize) < clip.height {
                let cell = &mut mask[my as usize * clip.width + mx as usize];
                *cell = (*cell + coverage).min(1.0);
            }
        });
    }

    let fill: Rgba<u8> = color.into();
    for (i, &coverage) in mask.iter().enumerate() {
        if coverage <= 0.0 {
            continue;
        }
        let tx = clip.left + (i % clip.width) as i64;
        let ty = clip.top + (i / clip.width) as i64;
        blend_pixel(
            target.get_pixel_mut(tx as u32, ty as u32),
            fill,
            opacity * coverage,
        );
    }
}

/// Pixel rectangle of glyph ink that lands on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clip {
    left: i64,
    top: i64,
    width: usize,
    height: usize,
}

/// Intersect glyph `bounds` with a `target_width` x `target_height` canvas.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn visible_rect(bounds: ab_glyph::Rect, target_width: i64, target_height: i64) -> Option<Clip> {
    let left = (bounds.min.x.floor() as i64).max(0);
    let top = (bounds.min.y.floor() as i64).max(0);
    let right = (bounds.max.x.ceil() as i64).min(target_width);
    let bottom = (bounds.max.y.ceil() as i64).min(target_height);
    if right <= left || bottom <= top {
        return None;
    }
    Some(Clip {
        left,
        top,
        width: (right - left) as usize,
        height: (bottom - top) as usize,
    })
}

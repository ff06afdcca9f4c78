//! Core compositing engine.

use std::borrow::Borrow;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

use crate::blending;
use crate::color::Color;
use crate::error::{Error, Result};
use crate::placement::{place, Anchor};
use crate::text::{self, FontFamily};

/// Suffix appended to the input file stem to name each output.
pub const OUTPUT_SUFFIX: &str = "_processed";

/// An image watermark drawn scaled relative to the base image width.
#[derive(Debug, Clone, Copy)]
pub struct ImageWatermark<'a> {
    /// The watermark raster. `None` draws nothing.
    pub image: Option<&'a DynamicImage>,
    /// Fraction of the base image width the watermark occupies.
    pub scale: f32,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f32,
}

/// A single-line text watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct TextWatermark {
    /// Literal text. Empty text draws nothing.
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    /// Fill color.
    pub color: Color,
    /// Use the bold face.
    pub bold: bool,
    /// Use the italic face.
    pub italic: bool,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Default for TextWatermark {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 24.0,
            color: Color::WHITE,
            bold: false,
            italic: false,
            opacity: 0.8,
        }
    }
}

/// The overlay content composited onto each base image.
#[derive(Debug, Clone)]
pub enum WatermarkSpec<'a> {
    /// Overlay another image.
    Image(ImageWatermark<'a>),
    /// Overlay styled text.
    Text(TextWatermark),
}

impl WatermarkSpec<'_> {
    /// Whether this watermark has nothing to draw (no image, or empty text).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            WatermarkSpec::Image(wm) => wm.image.is_none_or(|img| img.width() == 0),
            WatermarkSpec::Text(wm) => wm.text.is_empty(),
        }
    }
}

/// Everything besides the base image that a composite call needs.
#[derive(Debug, Clone)]
pub struct CompositeOptions<'a> {
    /// Where the watermark is placed.
    pub anchor: Anchor,
    /// What is drawn.
    pub watermark: WatermarkSpec<'a>,
}

/// An encoded input image with the filename it came from.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Input filename, used to derive the output name.
    pub name: String,
    /// Encoded image bytes in any format the `image` crate can decode.
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Read a file from disk, keeping only its file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, bytes })
    }
}

/// A decoded input image with the filename it came from.
#[derive(Debug, Clone)]
pub struct NamedImage {
    /// Input filename.
    pub name: String,
    /// Decoded raster.
    pub image: DynamicImage,
}

/// Decode an encoded input into a raster.
///
/// # Errors
///
/// Returns [`Error::Decode`] naming the input if decoding fails.
pub fn decode(source: &SourceFile) -> Result<NamedImage> {
    let image = image::load_from_memory(&source.bytes).map_err(|e| Error::Decode {
        name: source.name.clone(),
        source: e,
    })?;
    Ok(NamedImage {
        name: source.name.clone(),
        image,
    })
}

/// One composited output: derived filename plus PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    /// Output filename, always ending in `_processed.png`.
    pub name: String,
    /// PNG-encoded image.
    pub png: Vec<u8>,
}

impl ProcessedResult {
    /// The payload as a `data:image/png;base64,...` URI.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }

    /// Write the payload into `dir` under [`ProcessedResult::name`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created or the file
    /// cannot be written.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        let path = dir.join(&self.name);
        std::fs::write(&path, &self.png)?;
        Ok(path)
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Derive the output filename for an input filename.
///
/// A trailing extension (a final `.` followed by at least one character that
/// is neither `.` nor `/`) is removed, then `_processed.png` is appended.
///
/// Example: `"photo.jpg"` becomes `"photo_processed.png"`.
#[must_use]
pub fn output_name(input: &str) -> String {
    let stem = match input.rfind('.') {
        Some(dot) if dot + 1 < input.len() && !input[dot + 1..].contains('/') => &input[..dot],
        _ => input,
    };
    format!("{stem}{OUTPUT_SUFFIX}.png")
}

/// The compositing engine holding the font faces for text watermarks.
///
/// Create once with [`Compositor::new()`] and reuse for every image. The
/// engine holds no per-call state; each call allocates and discards its own
/// output raster.
#[derive(Debug, Clone)]
pub struct Compositor {
    fonts: FontFamily,
}

impl Compositor {
    /// Create an engine using the embedded sans-serif family.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Font`] if the embedded fonts cannot be parsed.
    pub fn new() -> Result<Self> {
        Ok(Self::with_fonts(FontFamily::embedded()?))
    }

    /// Create an engine with a custom font family.
    #[must_use]
    pub fn with_fonts(fonts: FontFamily) -> Self {
        Self { fonts }
    }

    /// The fonts used for text watermarks.
    #[must_use]
    pub fn fonts(&self) -> &FontFamily {
        &self.fonts
    }

    /// Width of `wm.text` as it would be drawn at `font_size`.
    #[must_use]
    pub fn measure_text(&self, wm: &TextWatermark, font_size: f32) -> f32 {
        text::measure_width(self.fonts.face(wm.bold, wm.italic), font_size, &wm.text)
    }

    /// Draw `watermark` onto `canvas` at `anchor`.
    ///
    /// Image watermarks are sized from the canvas width. Text font sizes are
    /// multiplied by `text_scale` (1.0 at export resolution). An empty watermark
    /// leaves the canvas untouched.
    #[allow(clippy::cast_precision_loss)]
    pub fn stamp(
        &self,
        canvas: &mut RgbaImage,
        anchor: Anchor,
        watermark: &WatermarkSpec<'_>,
        text_scale: f32,
    ) {
        if watermark.is_empty() {
            debug!("watermark has no content, skipping draw");
            return;
        }
        let (cw, ch) = (canvas.width() as f32, canvas.height() as f32);

        match watermark {
            WatermarkSpec::Image(wm) => {
                let Some(overlay) = wm.image else {
                    return;
                };
                let ow = cw * wm.scale;
                let oh = overlay.height() as f32 * ow / overlay.width() as f32;
                let (x, y) = place(anchor, cw, ch, ow, oh);
                debug!(x, y, width = ow, height = oh, %anchor, "drawing image watermark");
                blending::overlay_scaled(canvas, &overlay.to_rgba8(), x, y, ow, oh, wm.opacity);
            }
            WatermarkSpec::Text(wm) => {
                let font_size = wm.font_size * text_scale;
                let face = self.fonts.face(wm.bold, wm.italic);
                let width = text::measure_width(face, font_size, &wm.text);
                let (x, y) = place(anchor, cw, ch, width, font_size);
                debug!(x, y, width, font_size, %anchor, "drawing text watermark");
                text::draw_text(canvas, face, font_size, x, y, &wm.text, wm.color, wm.opacity);
            }
        }
    }

    /// Composite the watermark onto `base` without encoding.
    ///
    /// The output has exactly the base dimensions; the base is copied at
    /// native resolution.
    #[must_use]
    pub fn render(&self, base: &DynamicImage, options: &CompositeOptions<'_>) -> RgbaImage {
        let mut canvas = base.to_rgba8();
        self.stamp(&mut canvas, options.anchor, &options.watermark, 1.0);
        canvas
    }

    /// Composite one image and encode it as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if PNG encoding fails.
    pub fn composite(
        &self,
        name: &str,
        base: &DynamicImage,
        options: &CompositeOptions<'_>,
    ) -> Result<ProcessedResult> {
        let canvas = self.render(base, options);
        let png = blending::encode_png(&canvas)?;
        Ok(ProcessedResult {
            name: output_name(name),
            png,
        })
    }

    fn process(
        &self,
        source: &SourceFile,
        options: &CompositeOptions<'_>,
    ) -> Result<ProcessedResult> {
        let decoded = decode(source)?;
        debug!(name = %decoded.name, "compositing");
        self.composite(&decoded.name, &decoded.image, options)
    }

    /// Lazily decode and composite each source in order.
    ///
    /// Each item is produced only when the iterator is advanced, so at most
    /// one decoded image is alive at a time.
    pub fn composite_iter<'s, I>(
        &'s self,
        sources: I,
        options: &'s CompositeOptions<'s>,
    ) -> impl Iterator<Item = Result<ProcessedResult>> + 's
    where
        I: IntoIterator + 's,
        I::IntoIter: 's,
        I::Item: Borrow<SourceFile>,
    {
        sources
            .into_iter()
            .map(move |source| {
                self.process(<I::Item as Borrow<SourceFile>>::borrow(&source), options)
            })
    }

    /// Composite already-decoded images, sequentially and in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Encode`] encountered; no partial results
    /// are returned.
    pub fn composite_decoded(
        &self,
        images: &[NamedImage],
        options: &CompositeOptions<'_>,
    ) -> Result<Vec<ProcessedResult>> {
        images
            .iter()
            .map(|named| {
                debug!(name = %named.name, "compositing");
                self.composite(&named.name, &named.image, options)
            })
            .collect()
    }

    /// Decode and composite every source, sequentially and in order.
    ///
    /// All sources are decoded before any is composited, so a decode failure
    /// anywhere in the batch is reported without compositing work. Stops at
    /// the first failure and returns only that error.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Decode`], then the first [`Error::Encode`].
    pub fn composite_all(
        &self,
        sources: &[SourceFile],
        options: &CompositeOptions<'_>,
    ) -> Result<Vec<ProcessedResult>> {
        let images = sources.iter().map(decode).collect::<Result<Vec<_>>>()?;
        self.composite_decoded(&images, options)
    }
}

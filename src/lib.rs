//! Batch-apply image or text watermarks with anchored placement.
//!
//! The engine copies each base image at native resolution, draws one
//! watermark (a scaled image or a single line of styled text) at one of five
//! anchors, and encodes the result as PNG. The same placement formula drives
//! the scaled live preview.
//!
//! # Quick Start
//!
//! ```no_run
//! use batch_watermark::{Anchor, CompositeOptions, Compositor, ImageWatermark, WatermarkSpec};
//!
//! let engine = Compositor::new().expect("failed to init engine");
//! let base = image::open("photo.jpg").unwrap();
//! let logo = image::open("logo.png").unwrap();
//! let options = CompositeOptions {
//!     anchor: Anchor::BottomRight,
//!     watermark: WatermarkSpec::Image(ImageWatermark {
//!         image: Some(&logo),
//!         scale: 0.2,
//!         opacity: 0.8,
//!     }),
//! };
//! let result = engine.composite("photo.jpg", &base, &options).unwrap();
//! assert_eq!(result.name, "photo_processed.png");
//! std::fs::write(&result.name, &result.png).unwrap();
//! ```
//!
//! # Batches
//!
//! [`Compositor::composite_all`] decodes and composites a list of encoded
//! inputs in order and fails on the first input that cannot be decoded.
//! [`Compositor::composite_iter`] does the same lazily, one image at a time.
//! [`Compositor::composite_decoded`] takes rasters that are already decoded.
//!
//! ```no_run
//! use batch_watermark::{Color, CompositeOptions, Compositor, SourceFile, TextWatermark, WatermarkSpec};
//!
//! let engine = Compositor::new().expect("failed to init engine");
//! let sources = vec![SourceFile::read("beach.png".as_ref()).unwrap()];
//! let options = CompositeOptions {
//!     anchor: Default::default(),
//!     watermark: WatermarkSpec::Text(TextWatermark {
//!         text: "Sample".into(),
//!         color: Color::parse("#000000").unwrap(),
//!         ..TextWatermark::default()
//!     }),
//! };
//! for result in engine.composite_all(&sources, &options).unwrap() {
//!     println!("{}: {} bytes", result.name, result.png.len());
//! }
//! ```

#![deny(missing_docs)]

pub mod blending;
pub mod color;
mod engine;
pub mod error;
pub mod placement;
pub mod preview;
pub mod text;

pub use color::Color;
pub use engine::{
    decode, is_supported_image, output_name, CompositeOptions, Compositor, ImageWatermark, NamedImage,
    ProcessedResult, SourceFile, TextWatermark, WatermarkSpec, OUTPUT_SUFFIX,
};
pub use error::{Error, Result};
pub use placement::{place, Anchor, PADDING};
pub use preview::{preview_size, PreviewOptions};
pub use text::FontFamily;

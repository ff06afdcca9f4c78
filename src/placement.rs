//! Anchored placement of an overlay rectangle inside a container.
//!
//! The same formula serves export-resolution compositing and the scaled
//! preview; callers differ only in the dimensions they pass.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Distance from the nearest edges for the four corner anchors.
pub const PADDING: f32 = 20.0;

/// Named placement of the watermark inside the base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Anchor {
    /// `PADDING` from the top and left edges.
    TopLeft,
    /// `PADDING` from the top and right edges.
    TopRight,
    /// `PADDING` from the bottom and left edges.
    BottomLeft,
    /// `PADDING` from the bottom and right edges.
    #[default]
    BottomRight,
    /// Centered on both axes, padding ignored.
    Center,
}

impl Anchor {
    /// All anchors, in the order they are listed to users.
    pub const ALL: [Anchor; 5] = [
        Anchor::TopLeft,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomRight,
        Anchor::Center,
    ];

    /// The literal tag for this anchor (`"top-left"`, `"center"`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::TopLeft => "top-left",
            Anchor::TopRight => "top-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomRight => "bottom-right",
            Anchor::Center => "center",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Anchor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Anchor::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| Error::InvalidAnchor(s.to_string()))
    }
}

/// Top-left corner at which to draw an `overlay_width` x `overlay_height`
/// rectangle inside a `container_width` x `container_height` container.
///
/// Coordinates are not clamped: an overlay larger than the container minus
/// padding yields negative values, and drawing clips.
#[must_use]
pub fn place(
    anchor: Anchor,
    container_width: f32,
    container_height: f32,
    overlay_width: f32,
    overlay_height: f32,
) -> (f32, f32) {
    match anchor {
        Anchor::TopLeft => (PADDING, PADDING),
        Anchor::TopRight => (container_width - overlay_width - PADDING, PADDING),
        Anchor::BottomLeft => (PADDING, container_height - overlay_height - PADDING),
        Anchor::BottomRight => (
            container_width - overlay_width - PADDING,
            container_height - overlay_height - PADDING,
        ),
        Anchor::Center => (
            (container_width - overlay_width) / 2.0,
            (container_height - overlay_height) / 2.0,
        ),
    }
}

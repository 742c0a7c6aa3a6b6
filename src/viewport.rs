//! Viewport definition.
//!
//! A [`Viewport`] describes the visible area of the document a
//! [`VarietyEngine`](crate::VarietyEngine) is choosing image varieties for.
//! Only the width takes part in variety selection; the height is carried so
//! hosts can forward complete resize notifications.
//!
//! ```
//! use variety_engine::Viewport;
//!
//! let mut vp = Viewport::new(800, 600);
//! vp.resize(1024, 768);
//! assert_eq!(vp.width, 1024);
//! assert_eq!(vp.width_px(), 1024.0);
//! ```

/// Size of the visible document area in CSS pixels.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1024, height: 768 }
    }
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Viewport {{ width: {}, height: {} }}", self.width, self.height)
    }
}

impl Viewport {
    /// Creates a new [`Viewport`] with the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Resizes the viewport to the given width and height.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Width as used by the variety matcher.
    pub fn width_px(&self) -> f64 {
        self.width as f64
    }
}

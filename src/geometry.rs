//! Rectangle projection between the three pixel spaces a barcode lives in.
//!
//! Preview, native and print coordinates are all projections of one logical
//! rectangle. Both the editor and the batch pipeline go through [`scale`] and
//! [`clamp_to_bounds`] so their results never diverge.

use crate::OVERSIZE_MARGIN;

/// Pixel dimensions of a coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Size { width, height }
    }
}

/// Axis-aligned rectangle in some pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    /// True when the rectangle is non-negative and fully inside `bounds`.
    pub fn fits_within(&self, bounds: Size) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width >= 0
            && self.height >= 0
            && self.right() <= bounds.width as i64
            && self.bottom() <= bounds.height as i64
    }
}

/// Project `rect` from `source` space into `target` space.
///
/// Each axis scales independently and every coordinate is rounded on its own,
/// so width is not derived from rounded edges.
pub fn scale(rect: Rect, source: Size, target: Size) -> Rect {
    let scale_x = target.width as f64 / source.width as f64;
    let scale_y = target.height as f64 / source.height as f64;

    Rect {
        x: round_px(rect.x as f64 * scale_x),
        y: round_px(rect.y as f64 * scale_y),
        width: round_px(rect.width as f64 * scale_x),
        height: round_px(rect.height as f64 * scale_y),
    }
}

/// Repair `rect` so it lies inside a `bounds` container.
///
/// Size is fixed before position: oversized sides shrink to the bound minus a
/// fixed margin, undersized ones grow to `min_size`, then the origin is pulled
/// back inside. Requires both bound sides to be at least `min_size + 10`.
pub fn clamp_to_bounds(rect: Rect, bounds: Size, min_size: i64) -> Rect {
    let bound_w = bounds.width as i64;
    let bound_h = bounds.height as i64;
    let mut out = rect;

    if out.width > bound_w {
        out.width = bound_w - OVERSIZE_MARGIN;
    }
    if out.height > bound_h {
        out.height = bound_h - OVERSIZE_MARGIN;
    }
    out.width = out.width.max(min_size);
    out.height = out.height.max(min_size);

    if out.x < 0 {
        out.x = 0;
    }
    if out.y < 0 {
        out.y = 0;
    }
    if out.right() > bound_w {
        out.x = bound_w - out.width;
    }
    if out.bottom() > bound_h {
        out.y = bound_h - out.height;
    }

    out
}

fn round_px(v: f64) -> i64 {
    v.round() as i64
}

//! Barcode placement state for an interactive editing surface.
//!
//! The placer works in preview pixels over a scaled-down template and only
//! leaves that space through [`BarcodePlacer::to_native`], which uses the same
//! [`scale`] the batch pipeline applies on the way to print space.

use crate::geometry::{clamp_to_bounds, scale, Rect, Size};
use crate::MIN_BARCODE_SIZE;

/// Widest preview the editor draws
pub const MAX_PREVIEW_WIDTH: u32 = 700;

/// Snap grid for drag and resize results
pub const GRID_SIZE: i64 = 5;

/// Minimum barcode side on small touch screens
pub const COMPACT_MIN_SIZE: i64 = 40;

/// Smallest lock zone side the operator can draw
pub const MIN_LOCK_SIZE: i64 = 50;

/// Barcode may take at most this share of the lock zone
const LOCK_FILL_RATIO: f64 = 0.8;

const INITIAL_BARCODE: Rect = Rect::new(0, 0, 263, 263);
const UNLOCKED_RESET: Rect = Rect::new(20, 20, 120, 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementWarning {
    TooWide,
    TooTall,
}

impl std::fmt::Display for PlacementWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlacementWarning::TooWide => write!(f, "Barcode too wide, scaled down automatically"),
            PlacementWarning::TooTall => write!(f, "Barcode too tall, scaled down automatically"),
        }
    }
}

/// Preview size for a template: native width capped at `MAX_PREVIEW_WIDTH`.
pub fn preview_size(native: Size) -> Size {
    if native.width > MAX_PREVIEW_WIDTH {
        let factor = MAX_PREVIEW_WIDTH as f64 / native.width as f64;
        let height = (native.height as f64 * factor).round().max(1.0) as u32;
        Size::new(MAX_PREVIEW_WIDTH, height)
    } else {
        native
    }
}

pub fn snap(v: i64) -> i64 {
    (v as f64 / GRID_SIZE as f64).round() as i64 * GRID_SIZE
}

fn fraction(v: u32, f: f64) -> i64 {
    (v as f64 * f).round() as i64
}

fn default_lock_zone(preview: Size) -> Rect {
    Rect::new(
        fraction(preview.width, 0.7),
        fraction(preview.height, 0.2),
        fraction(preview.width, 0.3),
        fraction(preview.height, 0.6),
    )
}

pub struct BarcodePlacer {
    native: Size,
    preview: Size,
    rect: Rect,
    lock_zone: Rect,
    lock_enabled: bool,
    min_size: i64,
    warning: Option<PlacementWarning>,
}

impl BarcodePlacer {
    pub fn new(native: Size) -> Self {
        Self::with_min_size(native, MIN_BARCODE_SIZE)
    }

    /// Placer for compact surfaces with a larger touch target.
    pub fn compact(native: Size) -> Self {
        Self::with_min_size(native, COMPACT_MIN_SIZE)
    }

    pub fn with_min_size(native: Size, min_size: i64) -> Self {
        let preview = preview_size(native);
        let mut placer = BarcodePlacer {
            native,
            preview,
            rect: INITIAL_BARCODE,
            lock_zone: default_lock_zone(preview),
            lock_enabled: true,
            min_size,
            warning: None,
        };
        placer.constrain();
        placer
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn lock_zone(&self) -> Rect {
        self.lock_zone
    }

    pub fn preview(&self) -> Size {
        self.preview
    }

    pub fn native(&self) -> Size {
        self.native
    }

    pub fn lock_enabled(&self) -> bool {
        self.lock_enabled
    }

    pub fn warning(&self) -> Option<PlacementWarning> {
        self.warning
    }

    pub fn set_lock_enabled(&mut self, enabled: bool) {
        self.lock_enabled = enabled;
        self.constrain();
    }

    /// Move the barcode, keeping its size.
    pub fn drag_to(&mut self, x: i64, y: i64) {
        let mut next = Rect::new(snap(x), snap(y), self.rect.width, self.rect.height);
        if self.lock_enabled {
            let lock = self.lock_zone;
            next.x = next.x.max(lock.x);
            next.y = next.y.max(lock.y);
            if next.right() > lock.right() {
                next.x = lock.right() - next.width;
            }
            if next.bottom() > lock.bottom() {
                next.y = lock.bottom() - next.height;
            }
        }
        self.rect = next;
        self.constrain();
    }

    /// Replace the barcode rectangle after a resize gesture.
    pub fn resize_to(&mut self, rect: Rect) {
        let mut next = Rect::new(snap(rect.x), snap(rect.y), snap(rect.width), snap(rect.height));
        if self.lock_enabled {
            self.fit_into_lock(&mut next);
        }
        self.rect = next;
        self.constrain();
    }

    /// Redraw the lock zone; it stays inside the preview and at least 50px a side.
    pub fn set_lock_zone(&mut self, zone: Rect) {
        let snapped = Rect::new(snap(zone.x), snap(zone.y), snap(zone.width), snap(zone.height));
        self.lock_zone = clamp_to_bounds(snapped, self.preview, MIN_LOCK_SIZE);
        self.constrain();
    }

    pub fn reset_lock_zone(&mut self) {
        let p = self.preview;
        self.lock_zone = Rect::new(
            fraction(p.width, 0.7),
            fraction(p.height, 0.3),
            fraction(p.width, 0.3),
            fraction(p.height, 0.4),
        );
        self.constrain();
    }

    /// Centre the barcode in the lock zone at 80% of its size.
    pub fn center(&mut self) {
        let lock = self.lock_zone;
        self.rect = Rect::new(
            lock.x + (lock.width as f64 * 0.1).round() as i64,
            lock.y + (lock.height as f64 * 0.1).round() as i64,
            (lock.width as f64 * LOCK_FILL_RATIO).round() as i64,
            (lock.height as f64 * LOCK_FILL_RATIO).round() as i64,
        );
        self.constrain();
    }

    pub fn reset(&mut self) {
        if self.lock_enabled {
            self.center();
        } else {
            self.rect = UNLOCKED_RESET;
            self.constrain();
        }
    }

    /// The rectangle as submitted to the batch pipeline, in native pixels.
    pub fn to_native(&self) -> Rect {
        scale(self.rect, self.preview, self.native)
    }

    /// Pull the origin into the zone, leaving room for a minimum-size
    /// barcode, then cut the far edges at the zone border.
    fn fit_into_lock(&self, rect: &mut Rect) {
        let lock = self.lock_zone;
        rect.x = rect.x.max(lock.x).min((lock.right() - self.min_size).max(lock.x));
        rect.y = rect.y.max(lock.y).min((lock.bottom() - self.min_size).max(lock.y));
        if rect.right() > lock.right() {
            rect.width = lock.right() - rect.x;
        }
        if rect.bottom() > lock.bottom() {
            rect.height = lock.bottom() - rect.y;
        }
    }

    /// Runs after every mutation: lock zone first, then size limits, then the
    /// preview edges.
    fn constrain(&mut self) {
        let mut rect = self.rect;
        if self.lock_enabled {
            self.fit_into_lock(&mut rect);
        }

        let max_w = (self.lock_zone.width as f64 * LOCK_FILL_RATIO).round() as i64;
        let max_h = (self.lock_zone.height as f64 * LOCK_FILL_RATIO).round() as i64;
        let mut warning = None;

        rect.width = rect.width.max(self.min_size);
        rect.height = rect.height.max(self.min_size);
        if rect.width > max_w {
            rect.width = max_w;
            warning = Some(PlacementWarning::TooWide);
        }
        if rect.height > max_h {
            rect.height = max_h;
            warning = Some(PlacementWarning::TooTall);
        }

        let rect = clamp_to_bounds(rect, self.preview, self.min_size);
        if let Some(w) = warning {
            log::warn!("{}: {:?}", w, rect);
        }
        self.rect = rect;
        self.warning = warning;
    }
}

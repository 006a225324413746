// offline-tickets: Composite barcoded event tickets onto printable A4 pages

pub mod barcode;
pub mod batch;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod pdf;
pub mod placer;
pub mod template;

pub use batch::{generate_batch, BatchRequest, Participant};
pub use error::{ErrorPayload, TicketError};
pub use geometry::{Rect, Size};

// ============================================================================
// Constants
// ============================================================================

/// A4 page at 300 dpi, in pixels
pub const PAGE_W: u32 = 2480;
pub const PAGE_H: u32 = 3508;

/// Print resolution used to map pixels onto PDF millimetres
pub const PRINT_DPI: f32 = 300.0;

/// Single ticket size in print space
pub const TICKET_W: u32 = 1240;
pub const TICKET_H: u32 = 702;

/// Ticket grid per page
pub const COLS: u32 = 2;
pub const ROWS: u32 = 5;
pub const TICKETS_PER_PAGE: usize = (COLS * ROWS) as usize;

/// Cell spacing
pub const MARGIN_X: u32 = 10;
pub const MARGIN_Y: u32 = 10;

/// Barcode rectangle limits in native template space
pub const MIN_BARCODE_SIZE: i64 = 30;
pub const MAX_BARCODE_SIZE: i64 = 2000;

/// Upper bound on participants per batch
pub const MAX_BATCH_SIZE: usize = 2000;

/// Fixed margin subtracted when an oversized rectangle is shrunk to fit
pub const OVERSIZE_MARGIN: i64 = 10;

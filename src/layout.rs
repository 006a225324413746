//! Row-major grid pagination of ticket rasters onto fixed-size pages.

use image::{imageops, Rgb, RgbImage};

use crate::error::{Result, TicketError};
use crate::template::TicketImage;
use crate::{COLS, MARGIN_X, MARGIN_Y, PAGE_H, PAGE_W, ROWS, TICKETS_PER_PAGE, TICKET_H, TICKET_W};

/// A ticket pinned to its cell origin on a page, in page pixels
pub struct PlacedTicket {
    pub x: u32,
    pub y: u32,
    pub ticket: TicketImage,
}

/// One A4 canvas holding up to `TICKETS_PER_PAGE` tickets
pub struct Page {
    pub cells: Vec<PlacedTicket>,
}

/// Ordered pages, the final output before PDF encoding
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn ticket_count(&self) -> usize {
        self.pages.iter().map(|p| p.cells.len()).sum()
    }
}

/// Where the `index`-th ticket of a batch lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub page: usize,
    pub x: u32,
    pub y: u32,
}

/// Page and cell origin for the `index`-th ticket (0-based).
pub fn cell_for(index: usize) -> Cell {
    let (x, y) = cell_origin(index % TICKETS_PER_PAGE);
    Cell {
        page: index / TICKETS_PER_PAGE,
        x,
        y,
    }
}

/// Top-left corner of grid cell `slot` (0-based, row-major within a page).
pub fn cell_origin(slot: usize) -> (u32, u32) {
    let col = slot as u32 % COLS;
    let row = slot as u32 / COLS;
    (
        col * (TICKET_W + MARGIN_X) + MARGIN_X,
        row * (TICKET_H + MARGIN_Y) + MARGIN_Y,
    )
}

/// Lay tickets out `COLS` across then `ROWS` down, one page per full grid.
///
/// The last page may be partial; empty cells are left blank.
pub fn paginate(tickets: Vec<TicketImage>) -> Result<Document> {
    if tickets.is_empty() {
        return Err(TicketError::EmptyBatchError);
    }

    let mut pages: Vec<Page> = Vec::with_capacity(tickets.len().div_ceil(TICKETS_PER_PAGE));
    for (i, ticket) in tickets.into_iter().enumerate() {
        let cell = cell_for(i);
        if cell.page == pages.len() {
            pages.push(Page {
                cells: Vec::with_capacity(TICKETS_PER_PAGE),
            });
        }
        if let Some(page) = pages.last_mut() {
            page.cells.push(PlacedTicket {
                x: cell.x,
                y: cell.y,
                ticket,
            });
        }
    }

    debug_assert!(pages.iter().all(|p| p.cells.len() <= (COLS * ROWS) as usize));
    Ok(Document { pages })
}

impl Page {
    /// Draw the page as a white raster with every ticket at its cell origin.
    ///
    /// Cells reaching past the page edge are clipped.
    pub fn rasterize(&self) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(PAGE_W, PAGE_H, Rgb([255, 255, 255]));
        for cell in &self.cells {
            imageops::overlay(&mut canvas, cell.ticket.image(), cell.x as i64, cell.y as i64);
        }
        canvas
    }
}

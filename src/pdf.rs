//! PDF encoding of ticket pages.
//!
//! Tickets are embedded one image XObject each, Flate-compressed as soon as
//! they arrive so a batch fed through [`PdfBuilder`] never holds more than one
//! raw raster at a time.
//! Nothing time- or randomness-dependent is written: the trailer `/ID` is a
//! fixed pair and there are no dates in the info dictionary.

use lopdf::{dictionary, Dictionary, Document as LoDocument, Object, ObjectId, Stream, StringFormat};

use crate::error::{Result, TicketError};
use crate::layout::{Cell, Document};
use crate::template::TicketImage;
use crate::{PAGE_H, PAGE_W, PRINT_DPI, TICKET_H};

// ============================================================================
// PDF Generation
// ============================================================================

const PDF_VERSION: &str = "1.5";
const DOCUMENT_TITLE: &str = "Offline Tickets";
const PRODUCER: &str = "offline-tickets";

/// Fixed trailer id so identical batches produce identical bytes
const DOCUMENT_ID: &[u8] = b"OFFLINETICKETSBATCHDOCUMENT00000";

/// Page pixels to PDF points at print resolution.
pub fn px_to_pt(px: i64) -> f32 {
    px as f32 * 72.0 / PRINT_DPI
}

/// Page being filled; closed into a page object when the next one starts.
struct OpenPage {
    index: usize,
    xobjects: Dictionary,
    content: String,
}

/// Incremental PDF writer fed one ticket at a time, in page order.
pub struct PdfBuilder {
    doc: LoDocument,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    open: Option<OpenPage>,
    tickets: usize,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = LoDocument::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        PdfBuilder {
            doc,
            pages_id,
            page_ids: Vec::new(),
            open: None,
            tickets: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(self.open.is_some())
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets
    }

    /// Compress `ticket` into the document at `cell`. The raw raster is
    /// dropped before this returns.
    pub fn add_ticket(&mut self, cell: Cell, ticket: TicketImage) -> Result<()> {
        if self.open.as_ref().map(|p| p.index) != Some(cell.page) {
            if let Some(previous) = self.open.take() {
                if cell.page <= previous.index {
                    return Err(TicketError::RenderError(format!(
                        "page {} arrived after page {}",
                        cell.page, previous.index
                    )));
                }
                self.close_page(previous);
            }
            self.open = Some(OpenPage {
                index: cell.page,
                xobjects: Dictionary::new(),
                content: String::new(),
            });
        }

        let image_id = self.embed_image(ticket)?;
        if let Some(page) = self.open.as_mut() {
            let name = format!("T{}", page.xobjects.len());
            page.content.push_str(&place_image(&name, cell, image_id.1));
            page.xobjects.set(name, image_id.0);
        }
        self.tickets += 1;
        Ok(())
    }

    /// Close the last page and serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if let Some(last) = self.open.take() {
            self.close_page(last);
        }
        if self.page_ids.is_empty() {
            return Err(TicketError::EmptyBatchError);
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal(DOCUMENT_TITLE),
            "Producer" => Object::string_literal(PRODUCER),
        });

        let id = Object::String(DOCUMENT_ID.to_vec(), StringFormat::Literal);
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.trailer.set("ID", vec![id.clone(), id]);

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| TicketError::RenderError(format!("Failed to write PDF: {}", e)))?;
        Ok(bytes)
    }

    /// Returns the XObject id and the image size in pixels.
    fn embed_image(&mut self, ticket: TicketImage) -> Result<(ObjectId, (u32, u32))> {
        let rgb = ticket.into_image();
        let (width, height) = rgb.dimensions();

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        );
        stream
            .compress()
            .map_err(|e| TicketError::RenderError(format!("Failed to compress ticket: {}", e)))?;

        Ok((self.doc.add_object(stream), (width, height)))
    }

    fn close_page(&mut self, page: OpenPage) {
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), page.content.into_bytes()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                px_to_pt(PAGE_W as i64).into(),
                px_to_pt(PAGE_H as i64).into(),
            ],
            "Resources" => dictionary! {
                "XObject" => page.xobjects,
            },
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
    }
}

/// Content stream operators drawing XObject `name` at its cell.
///
/// PDF origin is bottom-left, cell origins are top-left. Cells reaching past
/// the page edge are clipped by the MediaBox.
fn place_image(name: &str, cell: Cell, (width, height): (u32, u32)) -> String {
    let bottom = PAGE_H as i64 - (cell.y + TICKET_H) as i64;
    format!(
        "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /{} Do Q\n",
        px_to_pt(width as i64),
        px_to_pt(height as i64),
        px_to_pt(cell.x as i64),
        px_to_pt(bottom),
        name
    )
}

/// Encode every page of an already composed `document`.
pub fn write_pdf(document: Document) -> Result<Vec<u8>> {
    let mut builder = PdfBuilder::new();
    for (index, page) in document.pages.into_iter().enumerate() {
        for placed in page.cells {
            let cell = Cell {
                page: index,
                x: placed.x,
                y: placed.y,
            };
            builder.add_ticket(cell, placed.ticket)?;
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{cell_for, paginate};
    use crate::template::{composite_one, prepare, Template};
    use crate::Rect;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn tickets(n: usize) -> Vec<TicketImage> {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, Rgb([30, 120, 200])))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let resized = prepare(&Template::from_bytes(&png).unwrap());
        let bar = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        (0..n)
            .map(|_| composite_one(&resized, &bar, Rect::new(100, 100, 40, 40)))
            .collect()
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn a4_at_print_resolution() {
        assert!((px_to_pt(PAGE_W as i64) - 595.2).abs() < 0.01);
        assert!((px_to_pt(PAGE_H as i64) - 841.92).abs() < 0.01);
    }

    #[test]
    fn trailer_id_is_fixed() {
        let bytes = write_pdf(paginate(tickets(1)).unwrap()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(contains(&bytes, b"/ID"));
        assert!(contains(&bytes, DOCUMENT_ID));
        assert!(!contains(&bytes, b"CreationDate"));
    }

    #[test]
    fn ticket_images_are_flate_compressed() {
        // 10 raw tickets would be over 26MB
        let bytes = write_pdf(paginate(tickets(10)).unwrap()).unwrap();
        assert!(contains(&bytes, b"FlateDecode"));
        assert!(bytes.len() < 1_000_000, "PDF is {} bytes", bytes.len());
    }

    #[test]
    fn builder_counts_pages_as_cells_arrive() {
        let mut builder = PdfBuilder::new();
        for (i, ticket) in tickets(11).into_iter().enumerate() {
            builder.add_ticket(cell_for(i), ticket).unwrap();
        }
        assert_eq!(builder.page_count(), 2);
        assert_eq!(builder.ticket_count(), 11);
        assert!(builder.finish().unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn pages_must_arrive_in_order() {
        let mut builder = PdfBuilder::new();
        let mut t = tickets(2).into_iter();
        builder.add_ticket(cell_for(10), t.next().unwrap()).unwrap();
        assert!(matches!(
            builder.add_ticket(cell_for(0), t.next().unwrap()),
            Err(TicketError::RenderError(_))
        ));
    }

    #[test]
    fn empty_builder_has_nothing_to_write() {
        assert!(matches!(
            PdfBuilder::new().finish(),
            Err(TicketError::EmptyBatchError)
        ));
    }

    #[test]
    fn bottom_row_is_placed_from_page_bottom() {
        let ops = place_image("T9", cell_for(9), (crate::TICKET_W, TICKET_H));
        // cell 9 at y = 2858 ends at 3560, 52px past the 3508px page
        assert_eq!(ops, "q 297.60 0 0 168.48 302.40 -12.48 cm /T9 Do Q\n");
    }
}

//! One batch job: template + native barcode rect + participants in, PDF out.
//!
//! Participants are processed strictly in order. The first token that cannot
//! be encoded aborts the whole batch; a partial document is never returned.
//! Tickets go into the PDF as they are rendered instead of being collected
//! first.

use serde::Deserialize;
use uuid::Uuid;

use crate::barcode;
use crate::error::{Result, TicketError};
use crate::geometry::Rect;
use crate::layout::{self, Document, Page, PlacedTicket};
use crate::pdf::PdfBuilder;
use crate::template::{self, ResizedTemplate, Template, TicketImage};

/// Ticket holder as supplied by the ticket store
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Participant {
    pub name: String,
    pub token: String,
}

/// Everything the pipeline needs for one document
pub struct BatchRequest {
    pub template: Vec<u8>,
    /// Barcode rectangle in native template pixels
    pub barcode: Rect,
    pub participants: Vec<Participant>,
}

/// Parse a JSON array of `{name, token}` objects.
pub fn parse_participants(json: &str) -> Result<Vec<Participant>> {
    serde_json::from_str(json)
        .map_err(|e| TicketError::validation(format!("Invalid participant list: {}", e)))
}

/// Outcome of a streamed batch run
pub struct BatchOutput {
    pub pdf: Vec<u8>,
    pub tickets: usize,
    pub pages: usize,
    /// First page kept as rasters when asked for, for previews
    pub first_page: Option<Page>,
}

/// Run the full pipeline and return the finished PDF bytes.
pub fn generate_batch(request: &BatchRequest) -> Result<Vec<u8>> {
    run_batch(request, false).map(|output| output.pdf)
}

/// Render, place and compress tickets one at a time.
///
/// Each raw ticket is dropped once it is in the PDF, so peak memory does not
/// grow with the batch beyond the compressed streams.
pub fn run_batch(request: &BatchRequest, keep_first_page: bool) -> Result<BatchOutput> {
    let batch = PreparedBatch::new(request)?;
    let mut builder = PdfBuilder::new();
    let mut first_page = Vec::new();

    for (i, participant) in request.participants.iter().enumerate() {
        let ticket = batch.render(participant)?;
        let cell = layout::cell_for(i);
        if keep_first_page && cell.page == 0 {
            first_page.push(PlacedTicket {
                x: cell.x,
                y: cell.y,
                ticket: ticket.clone(),
            });
        }
        builder.add_ticket(cell, ticket)?;
    }

    let (tickets, pages) = (builder.ticket_count(), builder.page_count());
    let pdf = builder.finish()?;
    log::info!(
        "batch {}: {} tickets on {} pages, {} bytes",
        batch.id,
        tickets,
        pages,
        pdf.len()
    );

    Ok(BatchOutput {
        pdf,
        tickets,
        pages,
        first_page: keep_first_page.then_some(Page { cells: first_page }),
    })
}

/// Everything up to pagination, leaving the pages as rasters.
pub fn compose_document(request: &BatchRequest) -> Result<Document> {
    let batch = PreparedBatch::new(request)?;
    let tickets = request
        .participants
        .iter()
        .map(|participant| batch.render(participant))
        .collect::<Result<Vec<TicketImage>>>()?;
    let document = layout::paginate(tickets)?;

    log::info!(
        "batch {}: {} tickets on {} pages",
        batch.id,
        document.ticket_count(),
        document.page_count()
    );
    Ok(document)
}

/// A validated request with its template resized to print space.
struct PreparedBatch {
    id: Uuid,
    resized: ResizedTemplate,
    safe: Rect,
}

impl PreparedBatch {
    fn new(request: &BatchRequest) -> Result<Self> {
        let id = Uuid::new_v4();

        template::validate_request(request.barcode, request.participants.len())?;
        let template = Template::from_bytes(&request.template)?;
        template::validate_placement(request.barcode, template.size())?;

        log::info!(
            "batch {}: {} participants, template {}x{}px, barcode {:?}",
            id,
            request.participants.len(),
            template.size().width,
            template.size().height,
            request.barcode
        );

        let resized = template::prepare(&template);
        let safe = resized.safe_rect(request.barcode);
        Ok(PreparedBatch { id, resized, safe })
    }

    fn render(&self, participant: &Participant) -> Result<TicketImage> {
        // clamp_to_bounds keeps both sides at least MIN_BARCODE_SIZE
        let (width, height) = (self.safe.width as u32, self.safe.height as u32);
        let bars = barcode::render(&participant.token, width, height).map_err(|e| {
            log::warn!(
                "batch {}: aborting at participant {:?}: {}",
                self.id,
                participant.name,
                e
            );
            e
        })?;
        Ok(template::composite_one(&self.resized, &bars, self.safe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_participant_list() {
        let list = parse_participants(
            r#"[{"name": "Ayu", "token": "TKT-1"}, {"name": "Budi", "token": "TKT-2"}]"#,
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].token, "TKT-2");
    }

    #[test]
    fn malformed_participant_list_is_a_validation_error() {
        assert!(matches!(
            parse_participants(r#"{"name": "x"}"#),
            Err(TicketError::ValidationError { .. })
        ));
        assert!(parse_participants(r#"[{"name": "no token"}]"#).is_err());
    }

    fn solid_png() -> Vec<u8> {
        use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 120, Rgb([240, 200, 40])))
            .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        png
    }

    fn people(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|i| Participant {
                name: format!("Guest {}", i),
                token: format!("TKT-{:04}", i),
            })
            .collect()
    }

    #[test]
    fn streamed_run_matches_composed_document() {
        let request = BatchRequest {
            template: solid_png(),
            barcode: Rect::new(300, 20, 80, 80),
            participants: people(12),
        };
        let output = run_batch(&request, true).unwrap();
        let document = compose_document(&request).unwrap();

        assert_eq!(output.tickets, document.ticket_count());
        assert_eq!(output.pages, document.page_count());
        let first = output.first_page.unwrap();
        assert_eq!(first.cells.len(), 10);
        assert_eq!(
            first.rasterize().into_raw(),
            document.pages[0].rasterize().into_raw()
        );
        assert_eq!(output.pdf, crate::pdf::write_pdf(document).unwrap());
    }

    #[test]
    fn first_page_only_kept_on_request() {
        let request = BatchRequest {
            template: solid_png(),
            barcode: Rect::new(300, 20, 80, 80),
            participants: people(1),
        };
        assert!(run_batch(&request, false).unwrap().first_page.is_none());
    }

    #[test]
    fn empty_batch_fails_before_decoding() {
        let request = BatchRequest {
            template: b"not even an image".to_vec(),
            barcode: Rect::new(0, 0, 100, 100),
            participants: Vec::new(),
        };
        assert!(matches!(
            generate_batch(&request),
            Err(TicketError::EmptyBatchError)
        ));
    }
}

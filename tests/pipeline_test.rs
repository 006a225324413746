use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use offline_tickets::batch::{compose_document, run_batch};
use offline_tickets::template::{prepare, Template};
use offline_tickets::{generate_batch, BatchRequest, Participant, Rect, TicketError};
use std::io::Cursor;

fn template_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 233) as u8])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

fn participants(tokens: &[&str]) -> Vec<Participant> {
    tokens
        .iter()
        .enumerate()
        .map(|(i, t)| Participant {
            name: format!("Guest {}", i),
            token: t.to_string(),
        })
        .collect()
}

fn request(count: usize) -> BatchRequest {
    let tokens: Vec<String> = (0..count).map(|i| format!("EVT7-{:04}", i)).collect();
    let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
    BatchRequest {
        template: template_bytes(2000, 600, ImageFormat::Png),
        barcode: Rect::new(1700, 100, 263, 263),
        participants: participants(&refs),
    }
}

#[test]
fn same_batch_twice_gives_identical_pdf() {
    let req = request(3);
    let first = generate_batch(&req).unwrap();
    let second = generate_batch(&req).unwrap();
    assert!(first.starts_with(b"%PDF"));
    assert_eq!(first, second);
}

/// Flat-colour template that compresses well, for large batches
fn small_request(count: usize) -> BatchRequest {
    let mut template = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 120, Rgb([250, 230, 180])))
        .write_to(&mut Cursor::new(&mut template), ImageFormat::Png)
        .unwrap();
    let tokens: Vec<String> = (0..count).map(|i| format!("GATE-{:05}", i)).collect();
    let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
    BatchRequest {
        template,
        barcode: Rect::new(300, 20, 80, 80),
        participants: participants(&refs),
    }
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

#[test]
fn largest_allowed_batch_renders_every_ticket() {
    let output = run_batch(&small_request(2000), false).unwrap();
    assert_eq!(output.tickets, 2000);
    assert_eq!(output.pages, 200);
    assert!(output.pdf.starts_with(b"%PDF"));
    assert_eq!(count(&output.pdf, b"/Type/Page/Parent"), 200);
    assert_eq!(count(&output.pdf, b"/Subtype/Image"), 2000);
    // 2000 raw tickets would be over 5GB
    assert!(output.pdf.len() < 200_000_000, "PDF is {} bytes", output.pdf.len());
}

#[test]
fn pages_hold_ten_tickets_each() {
    let doc = compose_document(&request(21)).unwrap();
    assert_eq!(doc.page_count(), 3);
    assert_eq!(doc.pages[0].cells.len(), 10);
    assert_eq!(doc.pages[2].cells.len(), 1);
}

#[test]
fn barcode_lands_at_safe_rect() {
    let req = request(1);
    let doc = compose_document(&req).unwrap();
    let cell = &doc.pages[0].cells[0];
    assert_eq!((cell.x, cell.y), (10, 10));

    // Safe rect is (1054, 117, 163, 308); the template shows through outside it
    let template = Template::from_bytes(&req.template).unwrap();
    let resized = prepare(&template);
    let img = cell.ticket.image();
    let column: Vec<_> = (117..425).map(|y| *img.get_pixel(1054, y)).collect();
    assert!(column.iter().all(|p| *p == column[0]), "barcode column is not a solid stripe");
    assert!(column[0] == Rgb([0, 0, 0]) || column[0] == Rgb([255, 255, 255]));
    assert_eq!(img.get_pixel(1053, 200), resized.image().get_pixel(1053, 200));
    assert_eq!(img.get_pixel(1100, 116), resized.image().get_pixel(1100, 116));
}

#[test]
fn first_bad_token_aborts_the_batch() {
    let mut req = request(0);
    req.participants = participants(&["OK-1", "NOT\u{2603}OK", "ALSO\u{e9}BAD", "OK-4"]);
    match generate_batch(&req) {
        Err(TicketError::EncodingError { token, .. }) => assert_eq!(token, "NOT\u{2603}OK"),
        Err(other) => panic!("expected EncodingError, got {:?}", other),
        Ok(_) => panic!("batch with an unencodable token must fail"),
    }
}

#[test]
fn jpeg_template_runs_through_png_pipeline() {
    let mut req = request(2);
    req.template = template_bytes(2000, 600, ImageFormat::Jpeg);
    let template = Template::from_bytes(&req.template).unwrap();
    assert_eq!(template.source_format(), ImageFormat::Jpeg);
    assert!(generate_batch(&req).unwrap().starts_with(b"%PDF"));
}

#[test]
fn batch_size_ceiling() {
    let mut req = request(1);
    let one = req.participants[0].clone();
    req.participants = vec![one; 2001];
    assert!(matches!(
        generate_batch(&req),
        Err(TicketError::ValidationError { .. })
    ));

    req.participants.clear();
    assert!(matches!(generate_batch(&req), Err(TicketError::EmptyBatchError)));
}

#[test]
fn rect_outside_template_is_rejected_before_rendering() {
    let mut req = request(1);
    req.barcode = Rect::new(1800, 100, 263, 263);
    match generate_batch(&req) {
        Err(e @ TicketError::ValidationError { .. }) => {
            assert_eq!(e.status_code(), 400);
            let payload = e.to_payload();
            assert_eq!(payload.template_width, Some(2000));
            assert_eq!(payload.barcode_x, Some(1800));
        }
        Err(other) => panic!("expected ValidationError, got {:?}", other),
        Ok(_) => panic!("rect outside the template must be rejected"),
    }
}

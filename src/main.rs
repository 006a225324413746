// offline-tickets: Generate printable offline tickets for an event

use clap::Parser;
use image::ImageFormat;
use offline_tickets::batch::{parse_participants, run_batch};
use offline_tickets::geometry::scale;
use offline_tickets::placer::preview_size;
use offline_tickets::template::read_dimensions;
use offline_tickets::{BatchRequest, Rect, TicketError};
use std::io::Read;

/// Overrides the log filter, e.g. `OFFLINE_TICKETS_LOG=debug`
const LEVEL_ENV: &str = "OFFLINE_TICKETS_LOG";

/// Exit status for caller faults (bad template, geometry or participant list)
const EXIT_INVALID_INPUT: i32 = 2;
/// Exit status for internal failures
const EXIT_FAILURE: i32 = 1;

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate printable offline tickets with Code128 barcodes")]
struct Args {
    /// Ticket template image (PNG or JPEG, file path or URL)
    #[arg(short, long)]
    template: String,

    /// Participant list (JSON array of {"name", "token"})
    #[arg(short, long)]
    participants: String,

    /// Barcode left edge
    #[arg(short = 'x', long, allow_negative_numbers = true)]
    barcode_x: i64,

    /// Barcode top edge
    #[arg(short = 'y', long, allow_negative_numbers = true)]
    barcode_y: i64,

    /// Barcode width
    #[arg(short = 'W', long)]
    barcode_width: i64,

    /// Barcode height
    #[arg(short = 'H', long)]
    barcode_height: i64,

    /// Barcode rectangle is in editor preview pixels rather than template pixels
    #[arg(long)]
    preview_space: bool,

    /// Output filename
    #[arg(short, long, default_value = "offline-tickets.pdf")]
    output: String,

    /// Also write the first page as a PNG preview
    #[arg(long)]
    preview_png: Option<String>,

    /// Print a JSON error payload on stdout when generation fails
    #[arg(long)]
    error_json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LEVEL_ENV, default_level))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        if args.error_json {
            let payload = e.to_payload();
            match serde_json::to_string(&payload) {
                Ok(json) => println!("{}", json),
                Err(err) => eprintln!("Failed to serialize error payload: {}", err),
            }
        }
        let code = if e.status_code() == 400 {
            EXIT_INVALID_INPUT
        } else {
            EXIT_FAILURE
        };
        std::process::exit(code);
    }
}

fn run(args: &Args) -> Result<(), TicketError> {
    let template = load_template(&args.template)?;
    let participants = load_participants(&args.participants)?;

    let drawn = Rect::new(
        args.barcode_x,
        args.barcode_y,
        args.barcode_width,
        args.barcode_height,
    );
    let barcode = if args.preview_space {
        to_native_space(&template, drawn)?
    } else {
        drawn
    };

    let request = BatchRequest {
        template,
        barcode,
        participants,
    };
    let output = run_batch(&request, args.preview_png.is_some())?;

    if let (Some(path), Some(first)) = (&args.preview_png, &output.first_page) {
        first
            .rasterize()
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| TicketError::RenderError(format!("{}: {}", path, e)))?;
    }

    std::fs::write(&args.output, &output.pdf)?;

    println!("✓ Generated: {}", args.output);
    println!("  Tickets: {}", output.tickets);
    println!("  Pages: {}", output.pages);
    println!(
        "  Barcode: ({}, {}, {}x{}) template px",
        barcode.x, barcode.y, barcode.width, barcode.height
    );

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Project an editor rectangle onto the template the way the editor does on submit.
///
/// Only the image header is read; the pipeline decodes the template once.
fn to_native_space(template_bytes: &[u8], drawn: Rect) -> Result<Rect, TicketError> {
    let native = read_dimensions(template_bytes)?;
    let preview = preview_size(native);
    let projected = scale(drawn, preview, native);
    log::debug!(
        "preview {:?} in {}x{} -> native {:?}",
        drawn,
        preview.width,
        preview.height,
        projected
    );
    Ok(projected)
}

fn load_participants(path: &str) -> Result<Vec<offline_tickets::Participant>, TicketError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TicketError::validation(format!("{}: {}", path, e)))?;
    parse_participants(&content)
}

fn load_template(path: &str) -> Result<Vec<u8>, TicketError> {
    if path.starts_with("http://") || path.starts_with("https://") {
        let response = ureq::get(path)
            .call()
            .map_err(|e| TicketError::validation(format!("Failed to fetch template: {}", e)))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| TicketError::validation(format!("Failed to read template: {}", e)))?;
        Ok(bytes)
    } else {
        std::fs::read(path).map_err(|e| TicketError::validation(format!("{}: {}", path, e)))
    }
}

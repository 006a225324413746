use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::{Result, TicketError};
use crate::geometry::{clamp_to_bounds, scale, Rect, Size};
use crate::{MAX_BARCODE_SIZE, MAX_BATCH_SIZE, MIN_BARCODE_SIZE, TICKET_H, TICKET_W};

/// Print-space size every template is resized to
pub const PRINT_SIZE: Size = Size::new(TICKET_W, TICKET_H);

// ============================================================================
// Template Loading
// ============================================================================

/// Decoded template, always sourced from a PNG byte stream
pub struct Template {
    image: DynamicImage,
    size: Size,
    source_format: ImageFormat,
}

impl Template {
    /// Normalize `bytes` to PNG, then decode the PNG to read native dimensions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (png, source_format) = normalize_to_png(bytes)?;
        let image = ::image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| TicketError::ConversionError(format!("Failed to decode PNG: {}", e)))?;
        let size = Size::new(image.width(), image.height());

        log::debug!(
            "template decoded from {:?}: {}x{}px",
            source_format,
            size.width,
            size.height
        );

        Ok(Template {
            image,
            size,
            source_format,
        })
    }

    /// Native pixel dimensions
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn source_format(&self) -> ImageFormat {
        self.source_format
    }
}

/// Re-encode a JPEG template as PNG; PNG input passes through untouched.
pub fn normalize_to_png(bytes: &[u8]) -> Result<(Vec<u8>, ImageFormat)> {
    let format = ::image::guess_format(bytes)
        .map_err(|_| TicketError::validation("Template must be a PNG or JPEG image"))?;

    match format {
        ImageFormat::Png => Ok((bytes.to_vec(), format)),
        ImageFormat::Jpeg => {
            let img = ::image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
                .map_err(|e| TicketError::ConversionError(format!("Failed to decode JPEG: {}", e)))?;
            let mut png = Vec::new();
            img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| TicketError::ConversionError(format!("Failed to encode PNG: {}", e)))?;
            Ok((png, format))
        }
        other => Err(TicketError::validation(format!(
            "Template must be a PNG or JPEG image, got {:?}",
            other
        ))),
    }
}

/// Native size from the image header alone, without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> Result<Size> {
    let format = ::image::guess_format(bytes)
        .map_err(|_| TicketError::validation("Template must be a PNG or JPEG image"))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(TicketError::validation(format!(
            "Template must be a PNG or JPEG image, got {:?}",
            format
        )));
    }

    let (width, height) = ::image::ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| TicketError::ConversionError(format!("Failed to read template size: {}", e)))?;
    Ok(Size::new(width, height))
}

// ============================================================================
// Validation
// ============================================================================

/// Checks that need no template: barcode size limits and batch size.
pub fn validate_request(barcode: Rect, participant_count: usize) -> Result<()> {
    if participant_count == 0 {
        return Err(TicketError::EmptyBatchError);
    }
    if barcode.width < MIN_BARCODE_SIZE || barcode.height < MIN_BARCODE_SIZE {
        return Err(TicketError::placement(
            format!(
                "Barcode too small (min {}x{} px)",
                MIN_BARCODE_SIZE, MIN_BARCODE_SIZE
            ),
            None,
            barcode,
        ));
    }
    if barcode.width > MAX_BARCODE_SIZE || barcode.height > MAX_BARCODE_SIZE {
        return Err(TicketError::placement(
            format!(
                "Barcode too large (max {}x{} px)",
                MAX_BARCODE_SIZE, MAX_BARCODE_SIZE
            ),
            None,
            barcode,
        ));
    }
    if participant_count > MAX_BATCH_SIZE {
        return Err(TicketError::validation(format!(
            "Too many tickets: {} requested, at most {} per batch",
            participant_count, MAX_BATCH_SIZE
        )));
    }
    Ok(())
}

/// The barcode must sit entirely inside the native template.
pub fn validate_placement(barcode: Rect, native: Size) -> Result<()> {
    if barcode.width <= 0 || barcode.height <= 0 || !barcode.fits_within(native) {
        return Err(TicketError::placement(
            format!(
                "Barcode exceeds template bounds. Template: {}x{}px, barcode: ({},{},{},{})",
                native.width, native.height, barcode.x, barcode.y, barcode.width, barcode.height
            ),
            Some(native),
            barcode,
        ));
    }
    Ok(())
}

// ============================================================================
// Compositing
// ============================================================================

/// Template resized once to print space, shared read-only across a batch
pub struct ResizedTemplate {
    image: RgbImage,
    native: Size,
}

impl ResizedTemplate {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Project a native-space barcode rectangle into print space and repair it.
    pub fn safe_rect(&self, native_rect: Rect) -> Rect {
        let scaled = scale(native_rect, self.native, PRINT_SIZE);
        let safe = clamp_to_bounds(scaled, PRINT_SIZE, MIN_BARCODE_SIZE);
        log::debug!(
            "barcode native {:?} -> print {:?} -> safe {:?}",
            native_rect,
            scaled,
            safe
        );
        safe
    }
}

/// One finished ticket raster in print space
#[derive(Clone)]
pub struct TicketImage(RgbImage);

impl TicketImage {
    pub fn image(&self) -> &RgbImage {
        &self.0
    }

    pub fn into_image(self) -> RgbImage {
        self.0
    }
}

/// Resize the template to print space and flatten any transparency onto white.
pub fn prepare(template: &Template) -> ResizedTemplate {
    let rgba = template.image.to_rgba8();
    let resized = imageops::resize(&rgba, TICKET_W, TICKET_H, FilterType::Lanczos3);

    ResizedTemplate {
        image: flatten_onto_white(&resized),
        native: template.size,
    }
}

/// Overlay a barcode raster onto a copy of the resized template.
pub fn composite_one(resized: &ResizedTemplate, barcode: &RgbImage, safe: Rect) -> TicketImage {
    let mut ticket = resized.image.clone();
    imageops::overlay(&mut ticket, barcode, safe.x, safe.y);
    TicketImage(ticket)
}

fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        rgb.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    rgb
}

//! Code128 barcode rasterization.
//!
//! Encoding goes through `barcoders` and accepts all of ASCII. Character set B
//! is the default; set A is switched in for control characters, which set B
//! cannot carry. The module pattern is then stretched to the exact requested
//! pixel size with a plain nearest-module mapping so identical input gives
//! identical pixels.

use barcoders::sym::code128::Code128;
use image::{Rgb, RgbImage};

use crate::error::{Result, TicketError};

/// Character set selectors understood by `barcoders`
const CHARSET_A: char = '\u{00C0}';
const CHARSET_B: char = '\u{0181}';
/// How `barcoders` spells DEL in set B
const DEL_B: char = '\u{00F7}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
}

impl CodeSet {
    fn selector(self) -> char {
        match self {
            CodeSet::A => CHARSET_A,
            CodeSet::B => CHARSET_B,
        }
    }

    /// The set `c` forces, if only one of A and B has it.
    fn required_for(c: char) -> Option<CodeSet> {
        match c {
            '\0'..='\x1f' => Some(CodeSet::A),
            '`'..='\x7f' => Some(CodeSet::B),
            _ => None,
        }
    }
}

const BAR: Rgb<u8> = Rgb([0, 0, 0]);
const SPACE: Rgb<u8> = Rgb([255, 255, 255]);

/// Encode `text` into Code128 modules (1 = bar, 0 = space).
pub fn encode_modules(text: &str) -> Result<Vec<u8>> {
    if text.is_empty() {
        return Err(encoding_error(text, "token is empty"));
    }
    if let Some(c) = text.chars().find(|c| !c.is_ascii()) {
        return Err(encoding_error(
            text,
            &format!("character {:?} is outside the Code128 set", c),
        ));
    }

    let barcode =
        Code128::new(with_code_sets(text)).map_err(|e| encoding_error(text, &e.to_string()))?;

    Ok(barcode.encode())
}

/// Prefix `text` with its starting set and insert a switch wherever the next
/// character is only in the other set. Text must already be ASCII.
fn with_code_sets(text: &str) -> String {
    let mut current = text
        .chars()
        .find_map(CodeSet::required_for)
        .unwrap_or(CodeSet::B);

    let mut out = String::with_capacity(text.len() + 2);
    out.push(current.selector());
    for c in text.chars() {
        if let Some(set) = CodeSet::required_for(c) {
            if set != current {
                out.push(set.selector());
                current = set;
            }
        }
        out.push(if c == '\x7f' { DEL_B } else { c });
    }
    out
}

/// Render `text` as a black-on-white Code128 raster of exactly `width` x `height`.
///
/// No human-readable line and no extra quiet zone are drawn.
pub fn render(text: &str, width: u32, height: u32) -> Result<RgbImage> {
    if width < 1 || height < 1 {
        return Err(encoding_error(
            text,
            &format!("barcode size {}x{} is empty", width, height),
        ));
    }

    let modules = encode_modules(text)?;
    let count = modules.len() as u64;
    if (width as u64) < count {
        log::debug!(
            "barcode for {:?} is {}px wide, narrower than its {} modules",
            text,
            width,
            count
        );
    }

    let columns: Vec<Rgb<u8>> = (0..width as u64)
        .map(|px| {
            let module = (px * count / width as u64) as usize;
            if modules[module] == 1 {
                BAR
            } else {
                SPACE
            }
        })
        .collect();

    Ok(RgbImage::from_fn(width, height, |x, _| columns[x as usize]))
}

fn encoding_error(token: &str, reason: &str) -> TicketError {
    TicketError::EncodingError {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

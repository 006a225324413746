use serde::Serialize;
use thiserror::Error;

use crate::geometry::{Rect, Size};

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Error, Debug)]
pub enum TicketError {
    #[error("{message}")]
    ValidationError {
        message: String,
        template: Option<Size>,
        barcode: Option<Rect>,
    },
    #[error("Failed to convert template to PNG: {0}")]
    ConversionError(String),
    #[error("Failed to encode barcode for token {token:?}: {reason}")]
    EncodingError { token: String, reason: String },
    #[error("Failed to render ticket document: {0}")]
    RenderError(String),
    #[error("Batch contains no participants, at least one ticket is required")]
    EmptyBatchError,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TicketError {
    pub fn validation(message: impl Into<String>) -> Self {
        TicketError::ValidationError {
            message: message.into(),
            template: None,
            barcode: None,
        }
    }

    /// Validation failure that reports the geometry the caller submitted.
    pub fn placement(message: impl Into<String>, template: Option<Size>, barcode: Rect) -> Self {
        TicketError::ValidationError {
            message: message.into(),
            template,
            barcode: Some(barcode),
        }
    }

    /// HTTP-style status: 400 for caller faults, 500 for internal ones.
    pub fn status_code(&self) -> u16 {
        match self {
            TicketError::ValidationError { .. }
            | TicketError::ConversionError(_)
            | TicketError::EmptyBatchError => 400,
            TicketError::EncodingError { .. }
            | TicketError::RenderError(_)
            | TicketError::IoError(_) => 500,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        let mut payload = ErrorPayload {
            error: self.summary().to_string(),
            detail: Some(self.to_string()),
            ..Default::default()
        };

        match self {
            TicketError::ValidationError {
                template, barcode, ..
            } => {
                if let Some(size) = template {
                    payload.template_width = Some(size.width);
                    payload.template_height = Some(size.height);
                }
                if let Some(rect) = barcode {
                    payload.barcode_x = Some(rect.x);
                    payload.barcode_y = Some(rect.y);
                    payload.barcode_width = Some(rect.width);
                    payload.barcode_height = Some(rect.height);
                }
            }
            TicketError::EncodingError { token, reason } => {
                payload.detail = Some(reason.clone());
                payload.token = Some(token.clone());
            }
            _ => {}
        }

        payload
    }

    fn summary(&self) -> &'static str {
        match self {
            TicketError::ValidationError { .. } => "Invalid ticket batch",
            TicketError::ConversionError(_) => "Template conversion failed",
            TicketError::EncodingError { .. } => "Failed to generate barcode/ticket",
            TicketError::RenderError(_) => "Failed to generate tickets",
            TicketError::EmptyBatchError => "No tickets to generate",
            TicketError::IoError(_) => "Failed to generate tickets",
        }
    }
}

/// Structured failure report handed back to the batch submitter
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_x: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_y: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_height: Option<i64>,
}

pub type Result<T> = std::result::Result<T, TicketError>;

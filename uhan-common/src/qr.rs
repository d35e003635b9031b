//! QR encoder
//!
//! Pages put a compact verification payload (identity, score summary,
//! timestamp) into a 120 px QR code at error-correction level H. Rendering goes
//! through [`QrRenderer`]; any failure is logged and replaced by a placeholder
//! slot so the rest of the preview is unaffected.

use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Text shown in the QR slot when rendering fails
pub const QR_PLACEHOLDER: &str = "QR Code";

/// Rendered side length in pixels
pub const QR_SIZE_PX: u32 = 120;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("Payload too large for a QR symbol ({0} bytes)")]
    TooLarge(usize),

    #[error("QR encoding failed: {0}")]
    Encode(String),
}

/// Colors and size of a rendered code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrStyle {
    pub size_px: u32,
    pub dark: &'static str,
    pub light: &'static str,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            size_px: QR_SIZE_PX,
            dark: "#000000",
            light: "#ffffff",
        }
    }
}

/// Payload placed in a QR code
#[derive(Debug, Clone, PartialEq)]
pub enum QrPayload {
    /// Compact JSON object
    Json(serde_json::Value),
    /// Pre-formatted text (`ULCI:..|ULP:..` or a URL)
    Text(String),
}

impl QrPayload {
    pub fn to_text(&self) -> String {
        match self {
            QrPayload::Json(value) => value.to_string(),
            QrPayload::Text(text) => text.clone(),
        }
    }
}

/// Adapter over the QR library
pub trait QrRenderer: Send + Sync {
    /// Render `data` as an SVG document
    fn render(&self, data: &str, style: &QrStyle) -> Result<String, QrError>;
}

/// SVG renderer backed by the `qrcode` crate, always at level H
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgQrRenderer;

impl QrRenderer for SvgQrRenderer {
    fn render(&self, data: &str, style: &QrStyle) -> Result<String, QrError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H).map_err(|e| match e {
            qrcode::types::QrError::DataTooLong => QrError::TooLarge(data.len()),
            other => QrError::Encode(other.to_string()),
        })?;

        Ok(code
            .render::<svg::Color>()
            .min_dimensions(style.size_px, style.size_px)
            .dark_color(svg::Color(style.dark))
            .light_color(svg::Color(style.light))
            .build())
    }
}

/// What the QR position of a preview holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QrSlot {
    Rendered { svg: String },
    Placeholder { text: String },
}

impl QrSlot {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, QrSlot::Placeholder { .. })
    }
}

/// Render `payload`, falling back to the placeholder on any error
pub fn encode_or_placeholder(renderer: &dyn QrRenderer, payload: &QrPayload, style: &QrStyle) -> QrSlot {
    let data = payload.to_text();
    match renderer.render(&data, style) {
        Ok(svg) => QrSlot::Rendered { svg },
        Err(e) => {
            warn!("QR code generation failed, showing placeholder: {}", e);
            QrSlot::Placeholder {
                text: QR_PLACEHOLDER.to_string(),
            }
        }
    }
}

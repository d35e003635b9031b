//! Export adapter: preview bitmap to PDF
//!
//! A preview node is rasterized at 2x scale, laid out on one or more pages,
//! and packed into a PDF with a deterministic file name. Rasterization runs in
//! the browser; this side only validates the bitmap and builds the document.

mod filename;
mod layout;
mod pdf;
mod rasterizer;

pub use filename::{export_file_name, sanitize_subject, FileStamp};
pub use layout::{
    layout_pages, page_count, PageFormat, PagePlacement, A4_HEIGHT_PT, A4_WIDTH_PT,
    MAX_EXPORT_PAGES,
};
pub use pdf::{DocumentPacker, LopdfPacker};
pub use rasterizer::{ClientBitmapRasterizer, ClientCapture};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Device scale used for every capture
pub const EXPORT_SCALE: f64 = 2.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Preview element '{0}' not found")]
    MissingTarget(String),

    #[error("Preview contains images that cannot be captured (tainted canvas)")]
    Tainted,

    #[error("Invalid bitmap: {0}")]
    InvalidBitmap(String),

    #[error("Could not generate PDF: {0}")]
    Pack(String),

    #[error("An export is already in progress")]
    InProgress,
}

/// Opaque RGB image, 8 bits per channel, rows top to bottom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ExportError> {
        if width == 0 || height == 0 {
            return Err(ExportError::InvalidBitmap("bitmap has zero size".to_string()));
        }
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(ExportError::InvalidBitmap(format!(
                "expected {} bytes of RGB data, got {}",
                expected,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Solid white bitmap
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width as usize * height as usize * 3],
        }
    }
}

/// Turns a rendered preview node into a bitmap
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, target: &str, scale: f64) -> Result<Bitmap, ExportError>;
}

/// Finished PDF
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub page_count: usize,
    pub bytes: Vec<u8>,
}

/// Rasterize `target` and pack it into a PDF named `file_name`
///
/// Captures that would need more than [`MAX_EXPORT_PAGES`] pages are refused
/// before any page is built.
pub async fn export_preview(
    rasterizer: &dyn Rasterizer,
    packer: &dyn DocumentPacker,
    target: &str,
    format: PageFormat,
    file_name: String,
) -> Result<ExportedDocument, ExportError> {
    let bitmap = rasterizer.rasterize(target, EXPORT_SCALE).await?;
    debug!("Rasterized '{}' at {}x{}", target, bitmap.width, bitmap.height);

    let count = page_count(format, bitmap.width, bitmap.height);
    if count > MAX_EXPORT_PAGES {
        warn!("Refusing to export '{}': {} pages needed", target, count);
        return Err(ExportError::InvalidBitmap(format!(
            "capture of {}x{} would need {} pages (limit {})",
            bitmap.width, bitmap.height, count, MAX_EXPORT_PAGES
        )));
    }

    let pages = layout_pages(format, bitmap.width, bitmap.height);
    let bytes = packer.pack(&bitmap, &pages)?;

    info!("Exported {} ({} page(s), {} bytes)", file_name, pages.len(), bytes.len());
    Ok(ExportedDocument {
        file_name,
        page_count: pages.len(),
        bytes,
    })
}

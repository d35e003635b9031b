//! Rasterizer fed by a capture the browser already made

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Bitmap, ExportError, Rasterizer};

/// Pixels of a preview node as captured client side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCapture {
    /// Display target the capture was taken from
    pub target: String,
    pub width: u32,
    pub height: u32,
    /// Base64 RGBA bytes, row-major, top row first
    pub rgba: String,
    /// Canvas was tainted by a cross-origin image
    #[serde(default)]
    pub tainted: bool,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    super::EXPORT_SCALE
}

/// Serves one client capture as the rasterization of its target
///
/// Transparent pixels are composited over white.
pub struct ClientBitmapRasterizer {
    capture: Option<ClientCapture>,
}

impl ClientBitmapRasterizer {
    pub fn new(capture: Option<ClientCapture>) -> Self {
        Self { capture }
    }
}

/// Blend RGBA over a white background into RGB
fn flatten_rgba(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let alpha = u16::from(px[3]);
        for &channel in &px[..3] {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

#[async_trait]
impl Rasterizer for ClientBitmapRasterizer {
    async fn rasterize(&self, target: &str, scale: f64) -> Result<Bitmap, ExportError> {
        let capture = self
            .capture
            .as_ref()
            .filter(|c| c.target == target)
            .ok_or_else(|| ExportError::MissingTarget(target.to_string()))?;

        if capture.tainted {
            return Err(ExportError::Tainted);
        }
        if (capture.scale - scale).abs() > f64::EPSILON {
            debug!("Capture of '{}' taken at scale {} (requested {})", target, capture.scale, scale);
        }

        let rgba = B64
            .decode(capture.rgba.trim())
            .map_err(|e| ExportError::InvalidBitmap(format!("pixel data is not base64: {}", e)))?;
        let expected = capture.width as usize * capture.height as usize * 4;
        if rgba.len() != expected {
            return Err(ExportError::InvalidBitmap(format!(
                "expected {} bytes of RGBA data for {}x{}, got {}",
                expected,
                capture.width,
                capture.height,
                rgba.len()
            )));
        }

        Bitmap::new(capture.width, capture.height, flatten_rgba(&rgba))
    }
}

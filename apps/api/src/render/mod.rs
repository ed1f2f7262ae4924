//! Document Converter — renders the first page of an uploaded PDF to a PNG
//! for vision inference.
//!
//! pdfium wraps a C++ library with thread-local state and must not run on
//! the async workers, so the actual rendering happens inside
//! `tokio::task::spawn_blocking`. The output edge length is capped by
//! `max_pixels` (a config value, not a constant): large enough for the model
//! to read body text, small enough to keep the request payload bounded.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The bytes are not a document the renderer supports.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("page rendering failed: {0}")]
    RenderFailed(String),

    #[error("PNG encoding failed: {0}")]
    EncodeFailed(String),
}

/// Turns an uploaded document into a single raster image. Stateless, no
/// side effects — nothing is persisted here.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert_first_page(&self, document: Bytes) -> Result<Vec<u8>, ConvertError>;
}

/// Production converter backed by pdfium. Deterministic for a given
/// document and pixel cap.
pub struct PdfiumConverter {
    max_pixels: u32,
}

impl PdfiumConverter {
    pub fn new(max_pixels: u32) -> Self {
        Self { max_pixels }
    }
}

#[async_trait]
impl DocumentConverter for PdfiumConverter {
    async fn convert_first_page(&self, document: Bytes) -> Result<Vec<u8>, ConvertError> {
        let max_pixels = self.max_pixels;
        tokio::task::spawn_blocking(move || convert_blocking(&document, max_pixels))
            .await
            .map_err(|e| ConvertError::RenderFailed(format!("render task panicked: {e}")))?
    }
}

fn convert_blocking(document: &[u8], max_pixels: u32) -> Result<Vec<u8>, ConvertError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_byte_slice(document, None)
        .map_err(|e| ConvertError::UnsupportedFormat(format!("{e:?}")))?;

    let pages = document.pages();
    let page = pages
        .first()
        .map_err(|e| ConvertError::RenderFailed(format!("document has no pages: {e:?}")))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| ConvertError::RenderFailed(format!("{e:?}")))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered first page -> {}x{} px",
        image.width(),
        image.height()
    );

    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ConvertError::EncodeFailed(e.to_string()))?;

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anything touching Pdfium needs the pdfium shared library on the test
    // machine, so these are ignored by default. Run with
    // `cargo test -- --ignored` where libpdfium is installed.

    #[tokio::test]
    #[ignore = "requires the pdfium shared library"]
    async fn test_non_pdf_bytes_are_unsupported_format() {
        let converter = PdfiumConverter::new(2048);
        let result = converter
            .convert_first_page(Bytes::from_static(b"this is not a pdf"))
            .await;
        assert!(matches!(result, Err(ConvertError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    #[ignore = "requires the pdfium shared library"]
    async fn test_minimal_pdf_renders_to_png() {
        // Smallest well-formed single-page PDF that pdfium will open.
        let pdf: &[u8] = b"%PDF-1.4\n1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj\n3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]>>endobj\nxref\n0 4\n0000000000 65535 f \n0000000009 00000 n \n0000000055 00000 n \n0000000106 00000 n \ntrailer<</Size 4/Root 1 0 R>>\nstartxref\n170\n%%EOF";
        let converter = PdfiumConverter::new(1024);
        let png = converter
            .convert_first_page(Bytes::from_static(pdf))
            .await
            .unwrap();
        // PNG magic header
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}

//! Page image rendering hook
//!
//! Rendering is best-effort: the pipeline logs failures and carries on. No
//! renderer is installed unless one is supplied with
//! [`ExtractionPipeline::with_renderer`](super::ExtractionPipeline::with_renderer).

use super::error::PipelineError;

/// An image of one source page
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub page_number: u32,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl PageImage {
    pub fn extension(&self) -> &'static str {
        match self.content_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "bin",
        }
    }

    /// Object key for this image, e.g. `pages/<document_id>/3.jpg`
    pub fn storage_path(&self, document_id: &str) -> String {
        format!("pages/{}/{}.{}", document_id, self.page_number, self.extension())
    }
}

/// Produces page images from a PDF
pub trait PageRenderer: Send + Sync {
    /// Pages the renderer cannot produce an image for are omitted
    fn render(&self, pdf: &[u8]) -> Result<Vec<PageImage>, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_path() {
        let image = PageImage {
            page_number: 12,
            bytes: Vec::new(),
            content_type: "image/png",
        };
        assert_eq!(image.storage_path("doc-1"), "pages/doc-1/12.png");

        let unknown = PageImage {
            content_type: "application/octet-stream",
            ..image
        };
        assert_eq!(unknown.extension(), "bin");
    }
}

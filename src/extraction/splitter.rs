//! PDF page counting and splitting
//!
//! Documents larger than the OCR page limit are cut into sequential chunks,
//! each a standalone PDF holding a contiguous page range.

use lopdf::Document;

use super::error::PipelineError;
use super::types::ExtractionChunk;

/// Splits PDFs into page-range chunks
pub trait PdfSplitter: Send + Sync {
    /// Split into chunks of at most `max_pages` pages, in page order.
    /// The chunks' page counts sum to the document's page count.
    fn split(&self, bytes: &[u8], max_pages: u32) -> Result<Vec<ExtractionChunk>, PipelineError>;
}

/// Plan `(page_offset, page_count)` ranges covering `total_pages`
pub fn plan_chunks(total_pages: u32, max_pages: u32) -> Vec<(u32, u32)> {
    let max_pages = max_pages.max(1);
    let mut ranges = Vec::new();
    let mut offset = 0;

    while offset < total_pages {
        let count = max_pages.min(total_pages - offset);
        ranges.push((offset, count));
        offset += count;
    }

    ranges
}

/// [`PdfSplitter`] built on `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfSplitter;

impl LopdfSplitter {
    fn load(bytes: &[u8]) -> Result<Document, PipelineError> {
        Document::load_mem(bytes).map_err(|e| PipelineError::InvalidPdf(e.to_string()))
    }

    fn count_pages(doc: &Document) -> u32 {
        doc.get_pages().len() as u32
    }

    /// Keep only pages `first..=last` of `source`
    fn extract_range(source: &Document, first: u32, last: u32) -> Result<Vec<u8>, PipelineError> {
        let mut doc = source.clone();
        let drop: Vec<u32> = doc
            .get_pages()
            .keys()
            .copied()
            .filter(|n| *n < first || *n > last)
            .collect();

        doc.delete_pages(&drop);
        doc.prune_objects();

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| PipelineError::InvalidPdf(format!("failed to write pages {}-{}: {}", first, last, e)))?;
        Ok(out)
    }
}

impl PdfSplitter for LopdfSplitter {
    fn split(&self, bytes: &[u8], max_pages: u32) -> Result<Vec<ExtractionChunk>, PipelineError> {
        let doc = Self::load(bytes)?;
        let total = Self::count_pages(&doc);

        if total == 0 {
            return Err(PipelineError::InvalidPdf("document has no pages".to_string()));
        }

        if total <= max_pages {
            return Ok(vec![ExtractionChunk {
                bytes: bytes.to_vec(),
                page_offset: 0,
                page_count: total,
            }]);
        }

        let ranges = plan_chunks(total, max_pages);
        tracing::debug!(total_pages = total, chunks = ranges.len(), "Splitting PDF");

        ranges
            .into_iter()
            .map(|(page_offset, page_count)| {
                let bytes = Self::extract_range(&doc, page_offset + 1, page_offset + page_count)?;
                Ok(ExtractionChunk {
                    bytes,
                    page_offset,
                    page_count,
                })
            })
            .collect()
    }
}

/// Build an in-memory PDF with `pages` empty pages
#[cfg(test)]
pub(crate) fn blank_pdf(pages: u32) -> Vec<u8> {
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages as i64),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

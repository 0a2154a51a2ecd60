//! PDF text extraction via `pdf-extract`, run off the async executor.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::loader::{DocumentFormat, LoadError, RawExtraction};

/// Extracts text from an in-memory PDF in reading order.
///
/// `pdf-extract` is CPU-bound and may panic on malformed fonts, so it runs
/// inside `spawn_blocking`; a panic is reported as a parse error.
pub async fn extract_pdf(data: Bytes) -> Result<RawExtraction, LoadError> {
    if !data.starts_with(b"%PDF") {
        return Err(LoadError::Parse {
            format: DocumentFormat::Pdf,
            message: "missing %PDF header".to_string(),
        });
    }

    let result = tokio::task::spawn_blocking(move || {
        let page_count = lopdf::Document::load_mem(&data)
            .map(|doc| doc.get_pages().len())
            .ok();
        let text = pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string());
        (text, page_count)
    })
    .await;

    let (text, page_count) = result.map_err(|e| {
        warn!("PDF extraction task failed: {e}");
        LoadError::Parse {
            format: DocumentFormat::Pdf,
            message: format!("extraction aborted: {e}"),
        }
    })?;

    let text = text.map_err(|message| LoadError::Parse {
        format: DocumentFormat::Pdf,
        message,
    })?;

    debug!(
        "pdf-extract produced {} chars across {:?} pages",
        text.len(),
        page_count
    );

    Ok(RawExtraction {
        text,
        format: DocumentFormat::Pdf,
        page_count,
    })
}

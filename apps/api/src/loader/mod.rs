//! Document loader: turns a CV source (local PDF/DOCX, published remote document,
//! or an uploaded byte buffer) into plain text plus lightweight structure hints.
//!
//! Parsing itself is delegated: `pdf-extract` for PDF, `docx-rs` for DOCX,
//! `scraper` for HTML. This module only decides which extractor runs and
//! enforces the "never silently empty" rule.

pub mod docx;
pub mod express;
pub mod html;
pub mod pdf;
pub mod remote;

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::loader::remote::RemoteLoader;

/// Lines that mark a CV section when they stand alone.
const SECTION_KEYWORDS: &[&str] = &[
    "summary",
    "professional summary",
    "profile",
    "objective",
    "experience",
    "work experience",
    "professional experience",
    "employment history",
    "education",
    "skills",
    "technical skills",
    "projects",
    "certifications",
    "languages",
    "awards",
    "publications",
    "interests",
    "references",
];

const MAX_HEADER_LEN: usize = 40;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Declared or detected format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Html,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    /// Maps a `Content-Type` header value (parameters ignored) to a format.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "application/pdf" => Some(DocumentFormat::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(DocumentFormat::Docx)
            }
            "text/html" | "application/xhtml+xml" | "text/plain" => Some(DocumentFormat::Html),
            _ => None,
        }
    }
}

/// A CV source as received from the caller. Consumed once by [`DocumentLoader::load`].
#[derive(Debug, Clone)]
pub enum SourceDocument {
    Path(PathBuf),
    Url(String),
    Bytes {
        data: Bytes,
        format: DocumentFormat,
        name: Option<String>,
    },
}

impl SourceDocument {
    /// Interprets a user-supplied reference: `http(s)://…` is a URL, anything else a path.
    pub fn from_reference(reference: &str) -> Self {
        let trimmed = reference.trim();
        if is_http_url(trimmed) {
            SourceDocument::Url(trimmed.to_string())
        } else {
            SourceDocument::Path(PathBuf::from(trimmed))
        }
    }

    pub fn label(&self) -> String {
        match self {
            SourceDocument::Path(path) => path.display().to_string(),
            SourceDocument::Url(url) => url.clone(),
            SourceDocument::Bytes { name, format, .. } => name
                .clone()
                .unwrap_or_else(|| format!("upload.{}", format_extension(*format))),
        }
    }
}

/// How a path or URL reference will be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    LocalPdf,
    LocalDocx,
    /// Published Adobe Express document. Structured API first, static page as fallback.
    PublishedExpress,
    /// Any other http(s) URL. The response `Content-Type` decides the format.
    RemoteUrl,
}

/// Text extracted from a source document. Never empty.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedContent {
    pub text: String,
    pub format: DocumentFormat,
    pub source: String,
    pub section_headers: Vec<String>,
    pub page_count: Option<usize>,
}

/// Raw extractor output before normalization and the emptiness check.
#[derive(Debug, Clone)]
pub struct RawExtraction {
    pub text: String,
    pub format: DocumentFormat,
    pub page_count: Option<usize>,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("No usable text could be extracted from {0}")]
    EmptyDocument(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format:?} document: {message}")]
    Parse {
        format: DocumentFormat,
        message: String,
    },
}

impl LoadError {
    /// Stable error code. Unreadable local files count as fetch failures and
    /// undecodable documents as yielding no usable text.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            LoadError::Fetch { .. } | LoadError::Io { .. } => "FETCH_ERROR",
            LoadError::EmptyDocument(_) | LoadError::Parse { .. } => "EMPTY_DOCUMENT",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loader
// ────────────────────────────────────────────────────────────────────────────

/// Entry point for document ingestion. Holds the HTTP client used for remote sources.
#[derive(Clone)]
pub struct DocumentLoader {
    remote: RemoteLoader,
}

impl DocumentLoader {
    pub fn new(fetch_timeout: Duration) -> Result<Self, LoadError> {
        Ok(Self {
            remote: RemoteLoader::new(fetch_timeout)?,
        })
    }

    pub fn with_remote(remote: RemoteLoader) -> Self {
        Self { remote }
    }

    /// Loads a source document and returns its non-empty text.
    ///
    /// No retries: a transient network failure surfaces as `LoadError::Fetch`.
    pub async fn load(&self, source: &SourceDocument) -> Result<ExtractedContent, LoadError> {
        let label = source.label();
        info!("Loading CV document from {label}");

        let raw = match source {
            SourceDocument::Path(path) => self.load_path(path).await?,
            SourceDocument::Url(url) => match detect_source_kind(url)? {
                SourceKind::PublishedExpress => self.remote.load_express(url).await?,
                _ => self.remote.load_url(url).await?,
            },
            SourceDocument::Bytes { data, format, .. } => {
                extract_bytes(data.clone(), *format, &label).await?
            }
        };

        let content = finalize(raw, label)?;
        info!(
            "Loaded {} chars ({:?}, {} section headers) from {}",
            content.text.len(),
            content.format,
            content.section_headers.len(),
            content.source
        );
        debug!(
            "CV content preview: {}",
            content.text.chars().take(200).collect::<String>()
        );
        Ok(content)
    }

    async fn load_path(&self, path: &Path) -> Result<RawExtraction, LoadError> {
        let reference = path.to_string_lossy();
        let format = match detect_source_kind(&reference)? {
            SourceKind::LocalPdf => DocumentFormat::Pdf,
            SourceKind::LocalDocx => DocumentFormat::Docx,
            SourceKind::PublishedExpress | SourceKind::RemoteUrl => {
                return Err(LoadError::UnsupportedFormat(reference.into_owned()))
            }
        };

        let data = tokio::fs::read(path).await.map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;

        extract_bytes(Bytes::from(data), format, &reference).await
    }
}

/// Classifies a path or URL reference by host and extension.
pub fn detect_source_kind(reference: &str) -> Result<SourceKind, LoadError> {
    let trimmed = reference.trim();

    if is_http_url(trimmed) {
        if express::is_published_express_url(trimmed) {
            return Ok(SourceKind::PublishedExpress);
        }
        return Ok(SourceKind::RemoteUrl);
    }
    if trimmed.contains("://") {
        return Err(LoadError::UnsupportedFormat(trimmed.to_string()));
    }

    let extension = Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(DocumentFormat::from_extension);

    match extension {
        Some(DocumentFormat::Pdf) => Ok(SourceKind::LocalPdf),
        Some(DocumentFormat::Docx) => Ok(SourceKind::LocalDocx),
        _ => Err(LoadError::UnsupportedFormat(trimmed.to_string())),
    }
}

/// Runs the extractor for an in-memory document.
pub(crate) async fn extract_bytes(
    data: Bytes,
    format: DocumentFormat,
    label: &str,
) -> Result<RawExtraction, LoadError> {
    match format {
        DocumentFormat::Pdf => pdf::extract_pdf(data).await,
        DocumentFormat::Docx => docx::extract_docx(&data),
        DocumentFormat::Html => {
            let html = String::from_utf8_lossy(&data);
            debug!("Extracting visible text from HTML source {label}");
            Ok(RawExtraction {
                text: html::extract_visible_text(&html),
                format: DocumentFormat::Html,
                page_count: None,
            })
        }
    }
}

fn finalize(raw: RawExtraction, source: String) -> Result<ExtractedContent, LoadError> {
    let text = normalize_text(&raw.text);
    if text.trim().is_empty() {
        return Err(LoadError::EmptyDocument(source));
    }

    Ok(ExtractedContent {
        section_headers: detect_section_headers(&text),
        text,
        format: raw.format,
        source,
        page_count: raw.page_count,
    })
}

/// Normalizes extractor output: ligatures and typographic spaces become plain
/// characters, lines are trimmed, and runs of blank lines collapse to one.
pub fn normalize_text(text: &str) -> String {
    let cleaned = text
        .replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace('\u{000C}', "\n");

    let mut out = String::with_capacity(cleaned.len());
    let mut blank_run = 0usize;
    for line in cleaned.lines().map(str::trim) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
            continue;
        }
        blank_run = 0;
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// Heuristic section-header detection over normalized text.
pub fn detect_section_headers(text: &str) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.len() > MAX_HEADER_LEN || line.ends_with('.') {
            continue;
        }
        let normalized = line.trim_end_matches(':').trim().to_lowercase();
        let is_keyword = SECTION_KEYWORDS.contains(&normalized.as_str());
        let has_letters = line.chars().any(|c| c.is_alphabetic());
        let is_caps = has_letters
            && line
                .chars()
                .filter(|c| c.is_alphabetic())
                .all(|c| c.is_uppercase())
            && line.split_whitespace().count() <= 4;

        if (is_keyword || is_caps) && !headers.iter().any(|h| h == line) {
            headers.push(line.to_string());
        }
    }

    headers
}

pub(crate) fn is_http_url(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn format_extension(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::Pdf => "pdf",
        DocumentFormat::Docx => "docx",
        DocumentFormat::Html => "html",
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a PDF with one page per entry, each page holding one line per string.
    pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for lines in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
            ];
            for (i, line) in lines.iter().enumerate() {
                if i > 0 {
                    operations.push(Operation::new("Td", vec![0.into(), (-18).into()]));
                }
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(*line)],
                ));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content stream"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("serialize pdf");
        buf
    }
}

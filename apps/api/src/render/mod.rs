//! Renderer: enhanced markup → branded HTML page → optional PDF.
//!
//! HTML is always produced. PDF conversion failures never escape this
//! module: they are logged and turned into an HTML-only `RenderOutput`
//! carrying a warning.

pub mod markup;
pub mod pdf;
pub mod template;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use pdf::{CommandPdfConverter, PdfConverter, PdfError};
use template::{PageContext, PageTemplate};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(String),
}

impl RenderError {
    pub fn kind(&self) -> &'static str {
        "RENDER_ERROR"
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub include_logo: bool,
    /// `None` or an empty path disables the logo regardless of `include_logo`.
    pub logo_path: Option<PathBuf>,
    pub generate_pdf: bool,
}

/// HTML always; PDF bytes only when conversion was requested and succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutput {
    pub html: String,
    #[serde(skip)]
    pub pdf: Option<Vec<u8>>,
    pub is_pdf: bool,
    /// Set when a requested PDF could not be produced.
    pub warning: Option<String>,
}

/// The artifact a caller should hand to the user.
#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub bytes: &'a [u8],
    pub mime: &'static str,
    pub extension: &'static str,
}

impl RenderOutput {
    fn html_only(html: String, warning: Option<String>) -> Self {
        Self {
            html,
            pdf: None,
            is_pdf: false,
            warning,
        }
    }

    /// PDF bytes when present, otherwise the HTML.
    pub fn primary_artifact(&self) -> Artifact<'_> {
        match &self.pdf {
            Some(pdf) => Artifact {
                bytes: pdf,
                mime: "application/pdf",
                extension: "pdf",
            },
            None => Artifact {
                bytes: self.html.as_bytes(),
                mime: "text/html; charset=utf-8",
                extension: "html",
            },
        }
    }
}

pub struct Renderer {
    template: PageTemplate,
    converter: Arc<dyn PdfConverter>,
}

impl Renderer {
    pub fn new(converter: Arc<dyn PdfConverter>) -> Result<Self, RenderError> {
        Ok(Self {
            template: PageTemplate::new()?,
            converter,
        })
    }

    /// Fills the page template. Identical inputs yield byte-identical HTML.
    pub async fn render_html(
        &self,
        enhanced_text: &str,
        options: &RenderOptions,
    ) -> Result<String, RenderError> {
        let cv_body = markup::body_html(enhanced_text);
        let logo_src = if options.include_logo {
            load_logo(options.logo_path.as_deref()).await
        } else {
            None
        };

        self.template.render(&PageContext {
            include_logo: logo_src.is_some(),
            logo_src: logo_src.as_deref().unwrap_or(""),
            cv_body: &cv_body,
        })
    }

    pub async fn render(
        &self,
        enhanced_text: &str,
        options: &RenderOptions,
    ) -> Result<RenderOutput, RenderError> {
        let html = self.render_html(enhanced_text, options).await?;
        info!("HTML rendered ({} bytes)", html.len());

        if !options.generate_pdf {
            return Ok(RenderOutput::html_only(html, None));
        }

        match self.converter.convert(&html).await {
            Ok(pdf) => Ok(RenderOutput {
                html,
                pdf: Some(pdf),
                is_pdf: true,
                warning: None,
            }),
            Err(e) => {
                warn!("PDF generation failed, using HTML: {e}");
                Ok(RenderOutput::html_only(
                    html,
                    Some(format!("PDF unavailable, HTML provided instead: {e}")),
                ))
            }
        }
    }
}

/// Reads the logo into a `data:` URI. Any problem omits the logo with a warning.
async fn load_logo(path: Option<&Path>) -> Option<String> {
    let path = path.filter(|p| !p.as_os_str().is_empty())?;

    let Some(mime) = logo_mime(path) else {
        warn!("Unsupported logo file type, omitting logo: {}", path.display());
        return None;
    };

    match tokio::fs::read(path).await {
        Ok(bytes) if !bytes.is_empty() => {
            Some(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
        }
        Ok(_) => {
            warn!("Logo file is empty, omitting logo: {}", path.display());
            None
        }
        Err(e) => {
            warn!("Logo not readable, omitting logo: {} ({e})", path.display());
            None
        }
    }
}

fn logo_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "svg" => Some("image/svg+xml"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

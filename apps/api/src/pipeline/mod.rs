//! Orchestrator: Loader → (Prompt Builder + Enhancement Client) → Renderer.
//!
//! A run is a value of `PipelineState`. `Pipeline::advance` performs exactly
//! one transition; `Pipeline::process` drives a request to `Rendered` or
//! `Failed`. Stage errors are carried unchanged, so the caller always sees
//! the originating kind.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::enhancement::{EnhancementPreferences, EnhancementRequest};
use crate::llm_client::{EnhancementResult, Enhancer, LlmClient, LlmError};
use crate::loader::{DocumentLoader, ExtractedContent, LoadError, SourceDocument};
use crate::render::{CommandPdfConverter, RenderError, RenderOptions, RenderOutput, Renderer};

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Stable code of the originating error.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "VALIDATION_ERROR",
            PipelineError::Load(e) => e.kind(),
            PipelineError::Llm(e) => e.kind(),
            PipelineError::Render(e) => e.kind(),
            PipelineError::Output { .. } => "RENDER_ERROR",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / output / state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub source: SourceDocument,
    pub job_description: String,
    pub preferences: EnhancementPreferences,
    /// Artifact path without extension; `.html` / `.pdf` are appended.
    pub output_path: Option<PathBuf>,
    pub generate_pdf: bool,
    pub include_logo: bool,
}

impl ProcessRequest {
    pub fn new(source: SourceDocument, job_description: impl Into<String>) -> Self {
        Self {
            source,
            job_description: job_description.into(),
            preferences: EnhancementPreferences::default(),
            output_path: None,
            generate_pdf: false,
            include_logo: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub enhanced_text: String,
    pub render: RenderOutput,
    pub html_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum PipelineState {
    Pending(ProcessRequest),
    Loaded {
        request: ProcessRequest,
        content: ExtractedContent,
    },
    Enhanced {
        request: ProcessRequest,
        result: EnhancementResult,
    },
    Rendered(ProcessOutput),
    Failed(PipelineError),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Pending(_) => "pending",
            PipelineState::Loaded { .. } => "loaded",
            PipelineState::Enhanced { .. } => "enhanced",
            PipelineState::Rendered(_) => "rendered",
            PipelineState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Rendered(_) | PipelineState::Failed(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Shared, stateless between runs: every request gets its own state value.
pub struct Pipeline {
    loader: DocumentLoader,
    enhancer: Arc<dyn Enhancer>,
    renderer: Renderer,
    logo_path: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        loader: DocumentLoader,
        enhancer: Arc<dyn Enhancer>,
        renderer: Renderer,
        logo_path: Option<PathBuf>,
    ) -> Self {
        Self {
            loader,
            enhancer,
            renderer,
            logo_path,
        }
    }

    /// Production wiring: HTTP loader, chat-completions client, command PDF engine.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let loader = DocumentLoader::new(config.fetch_timeout)?;
        let client = LlmClient::new(config)?;
        info!("LLM client initialized (model: {})", client.model());
        let enhancer = Arc::new(client);
        let converter = Arc::new(CommandPdfConverter::new(
            config.pdf_engine.clone(),
            config.pdf_timeout,
        ));
        let renderer = Renderer::new(converter)?;
        Ok(Self::new(loader, enhancer, renderer, config.logo_path.clone()))
    }

    /// Runs every stage in order and returns the terminal result.
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessOutput, PipelineError> {
        info!("Starting CV enhancement for {}", request.source.label());

        let mut state = PipelineState::Pending(request);
        while !state.is_terminal() {
            state = self.advance(state).await;
        }

        match state {
            PipelineState::Rendered(output) => {
                info!("CV enhancement completed (is_pdf={})", output.render.is_pdf);
                Ok(output)
            }
            PipelineState::Failed(e) => {
                error!("CV enhancement failed [{}]: {e}", e.kind());
                Err(e)
            }
            other => Err(PipelineError::InvalidRequest(format!(
                "pipeline stopped in non-terminal state {}",
                other.name()
            ))),
        }
    }

    /// Performs one transition. Terminal states are returned unchanged.
    pub async fn advance(&self, state: PipelineState) -> PipelineState {
        match state {
            PipelineState::Pending(request) => {
                if request.job_description.trim().is_empty() {
                    return PipelineState::Failed(PipelineError::InvalidRequest(
                        "job description must not be empty".to_string(),
                    ));
                }
                match self.loader.load(&request.source).await {
                    Ok(content) => PipelineState::Loaded { request, content },
                    Err(e) => PipelineState::Failed(e.into()),
                }
            }

            PipelineState::Loaded { request, content } => {
                let enhancement = EnhancementRequest {
                    content,
                    job_description: request.job_description.clone(),
                    preferences: request.preferences.clone(),
                };
                let prompt = enhancement.prompt();
                info!(
                    "Requesting enhancement ({} prompt chars, {} section headers detected)",
                    prompt.len(),
                    enhancement.content.section_headers.len()
                );

                match self.enhancer.enhance(&prompt).await {
                    Ok(result) => PipelineState::Enhanced { request, result },
                    Err(e) => PipelineState::Failed(e.into()),
                }
            }

            PipelineState::Enhanced { request, result } => {
                let options = RenderOptions {
                    include_logo: request.include_logo,
                    logo_path: self.logo_path.clone(),
                    generate_pdf: request.generate_pdf,
                };
                let render = match self.renderer.render(&result.text, &options).await {
                    Ok(render) => render,
                    Err(e) => return PipelineState::Failed(e.into()),
                };

                let (html_path, pdf_path) = match &request.output_path {
                    Some(base) => match write_artifacts(base, &render).await {
                        Ok(paths) => paths,
                        Err(e) => return PipelineState::Failed(e),
                    },
                    None => (None, None),
                };

                PipelineState::Rendered(ProcessOutput {
                    enhanced_text: result.text,
                    render,
                    html_path,
                    pdf_path,
                })
            }

            terminal => terminal,
        }
    }
}

/// Writes `<base>.html` always and `<base>.pdf` only when a PDF was produced.
async fn write_artifacts(
    base: &Path,
    render: &RenderOutput,
) -> Result<(Option<PathBuf>, Option<PathBuf>), PipelineError> {
    if let Some(parent) = base.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| output_error(parent, source))?;
    }

    let html_path = with_appended_extension(base, "html");
    tokio::fs::write(&html_path, &render.html)
        .await
        .map_err(|source| output_error(&html_path, source))?;
    info!("HTML file created: {}", html_path.display());

    let pdf_path = match &render.pdf {
        Some(pdf) => {
            let pdf_path = with_appended_extension(base, "pdf");
            tokio::fs::write(&pdf_path, pdf)
                .await
                .map_err(|source| output_error(&pdf_path, source))?;
            info!("PDF file created: {}", pdf_path.display());
            Some(pdf_path)
        }
        None => {
            if let Some(warning) = &render.warning {
                warn!("Only HTML written: {warning}");
            }
            None
        }
    };

    Ok((Some(html_path), pdf_path))
}

/// `out/cv.v2` + `html` → `out/cv.v2.html` (never replaces an existing dot suffix).
fn with_appended_extension(base: &Path, extension: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn output_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Output {
        path: path.display().to_string(),
        source,
    }
}

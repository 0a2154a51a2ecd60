//! HTML → PDF conversion through an external engine.
//!
//! Conversion is the one recoverable failure in the pipeline: every error
//! here is a `PdfError`, and the renderer downgrades it to an HTML-only
//! result instead of propagating it.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

const MAX_STDERR_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF engine '{engine}' could not be started: {source}")]
    EngineUnavailable {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("PDF engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("PDF engine produced invalid output: {0}")]
    InvalidOutput(String),

    #[error("PDF scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// The conversion seam. Tests substitute converters that fail or record calls.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(&self, html: &str) -> Result<Vec<u8>, PdfError>;
}

/// Runs `<engine> <args…> <input.html> <output.pdf>` in a scratch directory
/// that is removed when the conversion ends, whatever the outcome.
#[derive(Debug, Clone)]
pub struct CommandPdfConverter {
    engine: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPdfConverter {
    /// Defaults to wkhtmltopdf's calling convention (`--quiet in out`).
    pub fn new(engine: impl Into<String>, timeout: Duration) -> Self {
        Self {
            engine: engine.into(),
            args: vec!["--quiet".to_string()],
            timeout,
        }
    }

    /// Replaces the arguments placed before the input and output paths.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    async fn run_engine(&self, input: &Path, output: &Path) -> Result<(), PdfError> {
        let child = Command::new(&self.engine)
            .args(&self.args)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PdfError::EngineUnavailable {
                engine: self.engine.clone(),
                source,
            })?;

        // Dropping the pending future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| PdfError::Timeout(self.timeout))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(PdfError::Failed {
                status: result.status.to_string(),
                stderr: stderr.trim().chars().take(MAX_STDERR_CHARS).collect(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PdfConverter for CommandPdfConverter {
    async fn convert(&self, html: &str) -> Result<Vec<u8>, PdfError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("resume.html");
        let output = scratch.path().join("resume.pdf");
        tokio::fs::write(&input, html).await?;

        debug!("Running PDF engine {} on {}", self.engine, input.display());
        self.run_engine(&input, &output).await?;

        let pdf = tokio::fs::read(&output).await.map_err(|e| {
            PdfError::InvalidOutput(format!("no output file written: {e}"))
        })?;
        if !pdf.starts_with(b"%PDF") {
            return Err(PdfError::InvalidOutput(format!(
                "{} bytes without a %PDF header",
                pdf.len()
            )));
        }

        info!("PDF generated ({} bytes)", pdf.len());
        Ok(pdf)
    }
}

/// Looks `engine` up on `PATH` (or checks it directly when it contains a separator).
pub fn engine_on_path(engine: &str) -> bool {
    let candidate = Path::new(engine);
    if candidate.components().count() > 1 {
        return candidate.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(engine).is_file()))
        .unwrap_or(false)
}

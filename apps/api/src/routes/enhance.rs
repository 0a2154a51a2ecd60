use std::path::Path;

use anyhow::Context;
use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::Serialize;
use tempfile::TempDir;
use tracing::info;
use uuid::Uuid;

use crate::enhancement::EnhancementPreferences;
use crate::errors::AppError;
use crate::loader::{DocumentFormat, LoadError, SourceDocument};
use crate::pipeline::{PipelineError, ProcessRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EnhanceResponse {
    pub enhanced_text: String,
    pub html: String,
    pub is_pdf: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

struct Upload {
    data: Bytes,
    file_name: Option<String>,
    content_type: Option<String>,
}

/// Raw multipart fields. Checkbox fields are absent when unchecked.
#[derive(Default)]
struct EnhanceForm {
    file: Option<Upload>,
    url: Option<String>,
    job_description: Option<String>,
    preferences: EnhancementPreferences,
    generate_pdf: bool,
    include_logo: bool,
}

/// POST /api/v1/enhance
pub async fn handle_enhance(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EnhanceResponse>, AppError> {
    let form = read_form(multipart).await?;

    let job_description = form
        .job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("job_description is required".to_string()))?;

    let source = match (form.file, form.url) {
        (Some(_), Some(_)) => {
            return Err(AppError::Validation(
                "provide either a file or a url, not both".to_string(),
            ))
        }
        (Some(upload), None) => upload_source(upload)?,
        // Local paths are for in-process callers only, never for web clients.
        (None, Some(url)) => match SourceDocument::from_reference(&url) {
            source @ SourceDocument::Url(_) => source,
            _ => {
                return Err(AppError::Validation(
                    "url must be an http or https URL".to_string(),
                ))
            }
        },
        (None, None) => {
            return Err(AppError::Validation(
                "a CV file or url is required".to_string(),
            ))
        }
    };

    // Artifacts live only as long as the request; the response carries them inline.
    let request_id = Uuid::new_v4();
    let scratch = scratch_dir(&state.config.output_dir).await?;

    let request = ProcessRequest {
        source,
        job_description,
        preferences: form.preferences,
        output_path: Some(scratch.path().join(format!("enhanced-cv-{request_id}"))),
        generate_pdf: form.generate_pdf,
        include_logo: form.include_logo,
    };

    let output = state.pipeline.process(request).await?;
    let artifact = output.render.primary_artifact();
    info!(
        "Enhance request {request_id} served ({}, {} bytes, warning={})",
        artifact.mime,
        artifact.bytes.len(),
        output.render.warning.is_some()
    );

    Ok(Json(EnhanceResponse {
        pdf_base64: output.render.pdf.as_ref().map(|pdf| BASE64.encode(pdf)),
        is_pdf: output.render.is_pdf,
        warning: output.render.warning,
        html: output.render.html,
        enhanced_text: output.enhanced_text,
    }))
}

/// Per-request directory under `output_dir`, removed when dropped.
async fn scratch_dir(output_dir: &Path) -> anyhow::Result<TempDir> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;
    tempfile::Builder::new()
        .prefix("enhance-")
        .tempdir_in(output_dir)
        .context("failed to create request output directory")
}

async fn read_form(mut multipart: Multipart) -> Result<EnhanceForm, AppError> {
    let mut form = EnhanceForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            // Browsers send an empty part when no file was chosen.
            if !data.is_empty() {
                form.file = Some(Upload {
                    data,
                    file_name: file_name.filter(|n| !n.is_empty()),
                    content_type,
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read field '{name}': {e}")))?;
        let non_empty = Some(value.trim().to_string()).filter(|v| !v.is_empty());

        match name.as_str() {
            "url" => form.url = non_empty,
            "job_description" => form.job_description = Some(value),
            "focus_areas" => {
                form.preferences.focus_areas = value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            "target_company_type" => form.preferences.target_company_type = non_empty,
            "custom_instructions" => form.preferences.custom_instructions = non_empty,
            "add_leadership_experience" => {
                form.preferences.add_leadership_experience = Some(parse_flag(&name, &value)?)
            }
            "emphasize_scalability" => {
                form.preferences.emphasize_scalability = Some(parse_flag(&name, &value)?)
            }
            "include_metrics" => form.preferences.include_metrics = Some(parse_flag(&name, &value)?),
            "generate_pdf" => form.generate_pdf = parse_flag(&name, &value)?,
            "include_logo" => form.include_logo = parse_flag(&name, &value)?,
            other => tracing::debug!("Ignoring unknown form field '{other}'"),
        }
    }

    Ok(form)
}

/// Accepts checkbox (`on`) and API-style boolean spellings.
fn parse_flag(name: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Ok(true),
        "false" | "off" | "0" | "no" | "" => Ok(false),
        other => Err(AppError::Validation(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

/// Uploads are PDF or DOCX, judged by file extension first, then declared content type.
fn upload_source(upload: Upload) -> Result<SourceDocument, AppError> {
    let by_extension = upload
        .file_name
        .as_deref()
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .and_then(DocumentFormat::from_extension);
    let format = by_extension.or_else(|| {
        upload
            .content_type
            .as_deref()
            .and_then(DocumentFormat::from_content_type)
            .filter(|f| *f != DocumentFormat::Html)
    });

    let Some(format) = format else {
        let label = upload
            .file_name
            .or(upload.content_type)
            .unwrap_or_else(|| "upload".to_string());
        return Err(PipelineError::from(LoadError::UnsupportedFormat(label)).into());
    };

    Ok(SourceDocument::Bytes {
        data: upload.data,
        format,
        name: upload.file_name,
    })
}

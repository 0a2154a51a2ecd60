//! Prompt builder: deterministic composition of the enhancement prompt from
//! CV text, a job description and the optional preference bundle.
//!
//! No I/O happens here. Free-text preference values are neutralized and
//! fenced as data so they cannot rewrite the anonymization instructions.

pub mod preferences;
pub mod prompts;

use serde::Serialize;

pub use preferences::EnhancementPreferences;
use prompts::{
    ENHANCEMENT_PROMPT_TEMPLATE, LEADERSHIP_EMPHASIS, METRICS_EMPHASIS, PREFERENCES_BLOCK_TEMPLATE,
    PREFERENCE_GUARD, SCALABILITY_EMPHASIS,
};

use crate::loader::ExtractedContent;

/// Everything the model needs for one enhancement run.
#[derive(Debug, Clone, Serialize)]
pub struct EnhancementRequest {
    pub content: ExtractedContent,
    pub job_description: String,
    pub preferences: EnhancementPreferences,
}

impl EnhancementRequest {
    pub fn prompt(&self) -> String {
        build_prompt(&self.content.text, &self.job_description, &self.preferences)
    }
}

/// Builds the full enhancement prompt. Identical inputs give identical output.
pub fn build_prompt(
    cv_text: &str,
    job_description: &str,
    preferences: &EnhancementPreferences,
) -> String {
    let preference_section = build_preference_section(preferences);

    fill_template(
        ENHANCEMENT_PROMPT_TEMPLATE,
        &[
            ("cv_content", cv_text.trim()),
            ("job_description", job_description.trim()),
            ("preferences", &preference_section),
        ],
    )
}

/// Returns an empty string when no preference applies.
fn build_preference_section(preferences: &EnhancementPreferences) -> String {
    if preferences.is_empty() {
        return String::new();
    }

    let mut data_lines: Vec<String> = Vec::new();
    let focus_areas = preferences.focus_areas();
    if !focus_areas.is_empty() {
        data_lines.push(format!("- Focus areas: {}", focus_areas.join("; ")));
    }
    if let Some(company_type) = preferences.target_company_type() {
        data_lines.push(format!("- Target company type: {company_type}"));
    }
    if let Some(custom) = preferences.custom_instructions() {
        data_lines.push(format!("- Additional instructions: {custom}"));
    }

    let mut section = String::new();
    if !data_lines.is_empty() {
        section.push_str(&fill_template(
            PREFERENCES_BLOCK_TEMPLATE,
            &[("preference_lines", &data_lines.join("\n"))],
        ));
    }

    let emphasis: Vec<&str> = [
        (preferences.add_leadership_experience, LEADERSHIP_EMPHASIS),
        (preferences.emphasize_scalability, SCALABILITY_EMPHASIS),
        (preferences.include_metrics, METRICS_EMPHASIS),
    ]
    .into_iter()
    .filter(|(flag, _)| *flag == Some(true))
    .map(|(_, line)| line)
    .collect();
    if !emphasis.is_empty() {
        section.push_str("\n## Additional Emphasis\n");
        section.push_str(&emphasis.join("\n"));
        section.push('\n');
    }

    section.push('\n');
    section.push_str(PREFERENCE_GUARD);
    section.push('\n');
    section
}

/// Replaces `{key}` placeholders in one left-to-right pass. Substituted
/// values are never scanned again; unknown `{…}` text is copied as-is.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let matched = values.iter().find_map(|(key, value)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*key))
                .and_then(|t| t.strip_prefix('}'))
                .map(|after| (after, *value))
        });

        match matched {
            Some((after, value)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

//! The page template: a single-logo header band above the CV body.

use handlebars::Handlebars;
use serde::Serialize;

use crate::render::RenderError;

const TEMPLATE_NAME: &str = "resume";
const RESUME_TEMPLATE: &str = include_str!("templates/resume.hbs");

/// The template's only three substitution points.
#[derive(Debug, Serialize)]
pub struct PageContext<'a> {
    pub include_logo: bool,
    /// Empty when no logo is shown.
    pub logo_src: &'a str,
    /// Sanitized HTML, inserted unescaped.
    pub cv_body: &'a str,
}

/// Compiled page template, registered once at construction.
pub struct PageTemplate {
    registry: Handlebars<'static>,
}

impl PageTemplate {
    pub fn new() -> Result<Self, RenderError> {
        Self::from_source(RESUME_TEMPLATE)
    }

    pub fn from_source(source: &str) -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| RenderError::Template(e.to_string()))?;
        Ok(Self { registry })
    }

    pub fn render(&self, context: &PageContext<'_>) -> Result<String, RenderError> {
        self.registry
            .render(TEMPLATE_NAME, context)
            .map_err(|e| RenderError::Template(e.to_string()))
    }
}

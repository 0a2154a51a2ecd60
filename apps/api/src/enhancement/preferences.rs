//! Optional preference bundle and the neutralization applied to its free text.

use serde::{Deserialize, Serialize};

pub const MAX_SHORT_FIELD_CHARS: usize = 120;
pub const MAX_CUSTOM_INSTRUCTIONS_CHARS: usize = 1000;

/// Characters that carry markdown or markup structure inside a prompt.
const STRUCTURE_CHARS: &[char] = &['#', '`', '<', '>'];

/// Every field is optional; an absent field applies no preference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementPreferences {
    pub focus_areas: Vec<String>,
    pub add_leadership_experience: Option<bool>,
    pub emphasize_scalability: Option<bool>,
    pub include_metrics: Option<bool>,
    pub target_company_type: Option<String>,
    pub custom_instructions: Option<String>,
}

impl EnhancementPreferences {
    /// Focus areas after neutralization, blanks and duplicates removed, input order kept.
    pub fn focus_areas(&self) -> Vec<String> {
        let mut areas: Vec<String> = Vec::new();
        for area in &self.focus_areas {
            if let Some(clean) = neutralize(area, MAX_SHORT_FIELD_CHARS) {
                if !areas.iter().any(|a| a.eq_ignore_ascii_case(&clean)) {
                    areas.push(clean);
                }
            }
        }
        areas
    }

    pub fn target_company_type(&self) -> Option<String> {
        self.target_company_type
            .as_deref()
            .and_then(|v| neutralize(v, MAX_SHORT_FIELD_CHARS))
    }

    pub fn custom_instructions(&self) -> Option<String> {
        self.custom_instructions
            .as_deref()
            .and_then(|v| neutralize(v, MAX_CUSTOM_INSTRUCTIONS_CHARS))
    }

    /// True when nothing in the bundle would change the prompt.
    pub fn is_empty(&self) -> bool {
        self.focus_areas().is_empty()
            && self.target_company_type().is_none()
            && self.custom_instructions().is_none()
            && self.add_leadership_experience != Some(true)
            && self.emphasize_scalability != Some(true)
            && self.include_metrics != Some(true)
    }
}

/// Makes a free-text value safe to embed as a single line of prompt data:
/// control characters become spaces, structure characters are dropped,
/// whitespace collapses, and the result is capped at `max_chars`.
/// Returns `None` when nothing printable is left.
pub fn neutralize(value: &str, max_chars: usize) -> Option<String> {
    let replaced: String = value
        .chars()
        .filter(|c| !STRUCTURE_CHARS.contains(c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(max_chars).collect();
    let capped = capped.trim_end();

    if capped.is_empty() {
        None
    } else {
        Some(capped.to_string())
    }
}

// System prompts shared by every enhancement call.
// The task-specific instruction set lives in `enhancement/prompts.rs`.

/// Persona sent as the system message of every chat completion.
pub const CV_SPECIALIST_SYSTEM: &str = "You are an expert CV enhancement specialist \
    with deep knowledge of recruitment, ATS systems, and professional presentation.";

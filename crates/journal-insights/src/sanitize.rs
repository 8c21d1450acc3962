//! Helpers for sanitizing data before it enters log lines and span fields.
//!
//! Journal text is health data. Logs carry identifiers, lengths and file
//! names, never entry content or full storage locations.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Reduces an audio URL to its file name, dropping host, directories and
/// any query string (which may carry a signed token).
///
/// - `http://localhost:3001/uploads/audio/a.webm?sig=x` → `a.webm`
pub fn redact_audio_url(url: &str) -> String {
    crate::analysis::transcription::audio_filename(url)
        .unwrap_or("<unknown>")
        .to_string()
}

/// Describes a piece of journal text without revealing it.
pub fn describe_content(content: &str) -> String {
    if content.trim().is_empty() {
        "<empty>".to_string()
    } else {
        format!("<{} chars>", content.chars().count())
    }
}

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::path::Path;
use validator::ValidationErrors;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Declared content types accepted for summaries
pub const ALLOWED_MIME_TYPES: [&str; 2] = [MIME_PDF, MIME_DOCX];

/// First human readable message of a failed `validator` check
pub fn first_validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "שגיאות בנתונים שהוזנו".to_string())
}

/// Strips parameters and case from a declared content type, returning it only
/// when it is on the allowlist.
pub fn normalize_allowed_mime(content_type: &str) -> Option<&'static str> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    ALLOWED_MIME_TYPES
        .iter()
        .copied()
        .find(|allowed| *allowed == normalized)
}

/// Extension used for a staged file: the original one when it is a plain
/// short alphanumeric suffix, otherwise derived from the MIME type.
pub fn staged_extension(original_filename: &str, mime_type: &str) -> String {
    let original = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    original.unwrap_or_else(|| extension_for_mime(mime_type).to_string())
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        MIME_PDF => "pdf",
        MIME_DOCX => "docx",
        _ => "bin",
    }
}

/// Makes a title safe to use as a download filename, keeping Hebrew and other
/// Unicode letters. The transform is idempotent.
pub fn sanitize_title(title: &str) -> String {
    let mut replaced = String::with_capacity(title.len());
    let mut in_whitespace = false;

    for c in title.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                replaced.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => replaced.push('_'),
            c if c.is_control() => replaced.push('_'),
            c => replaced.push(c),
        }
    }

    let trimmed = replaced.trim_start_matches(['.', '_', '-']);
    let safe = trimmed.replace("..", "_");

    if safe.is_empty() {
        "file".to_string()
    } else {
        safe
    }
}

/// Builds a `Content-Disposition` header for a locally stored summary.
pub fn content_disposition(title: &str, stored_path: &str) -> String {
    let extension = Path::new(stored_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let stem = sanitize_title(title);
    let filename = format!("{}.{}", stem, extension);

    let ascii_stem = stem
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .take(64)
        .collect::<String>();
    let fallback_filename = if ascii_stem.trim_matches(['.', '_', '-']).is_empty() {
        format!("file.{}", extension)
    } else {
        format!("{}.{}", ascii_stem, extension)
    };

    let encoded_filename = utf8_percent_encode(&filename, NON_ALPHANUMERIC).to_string();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    )
}

/// Checks that sniffed content is not an executable in disguise
pub fn is_executable_content(header: &[u8]) -> bool {
    infer::is_app(header)
}

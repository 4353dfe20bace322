use caption_core::JobId;

const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".tmp"];

/// Artifact name for one caption variant: `{job_id}.{language}.{extension}`.
pub fn artifact_file_name(job_id: &JobId, language: &str, extension: &str) -> String {
    let language = sanitize_component(language, "und");
    let extension = sanitize_component(extension, "txt");
    format!("{job_id}.{language}.{extension}")
}

/// Output template handed to yt-dlp; it inserts the language before the extension.
pub fn output_template(job_id: &JobId) -> String {
    format!("{job_id}.%(ext)s")
}

/// Language component of an artifact name belonging to `job_id`.
pub fn language_of<'a>(file_name: &'a str, job_id: &str) -> Option<&'a str> {
    let rest = file_name.strip_prefix(job_id)?.strip_prefix('.')?;
    let (language, _extension) = rest.rsplit_once('.')?;
    if language.is_empty() {
        None
    } else {
        Some(language)
    }
}

/// Whether `file_name` is named after `prefix`: equal to it, or `prefix.` followed by anything.
pub(crate) fn matches_prefix(file_name: &str, prefix: &str) -> bool {
    match file_name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Downloads still in flight; never treated as artifacts.
pub(crate) fn is_partial(file_name: &str) -> bool {
    PARTIAL_SUFFIXES
        .iter()
        .any(|suffix| file_name.ends_with(suffix))
}

fn sanitize_component(input: &str, fallback: &str) -> String {
    let cleaned: String = input
        .trim()
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '.' | ' ' | '\0'..='\u{1F}'
    )
}

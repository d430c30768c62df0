use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

pub const PDF_MIME: &str = "application/pdf";

/// Where a document comes from. Only URLs and in-memory bytes are accepted.
#[derive(Clone, PartialEq)]
pub enum DocumentSource {
    Url(String),
    Bytes {
        data: Arc<[u8]>,
        mime: Option<String>,
    },
}

// Manual Debug impl so byte sources don't dump their whole payload into logs
impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Bytes { data, mime } => f
                .debug_struct("Bytes")
                .field("len", &data.len())
                .field("mime", mime)
                .finish(),
        }
    }
}

impl DocumentSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn bytes(data: impl Into<Arc<[u8]>>, mime: Option<&str>) -> Self {
        Self::Bytes {
            data: data.into(),
            mime: mime.map(str::to_owned),
        }
    }

    /// Short description used in logs and by test fakes.
    pub fn label(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Bytes { data, .. } => format!("<{} bytes>", data.len()),
        }
    }

    pub fn mime(&self) -> Option<&str> {
        match self {
            Self::Url(_) => None,
            Self::Bytes { mime, .. } => mime.as_deref(),
        }
    }
}

impl From<&str> for DocumentSource {
    fn from(url: &str) -> Self {
        Self::url(url)
    }
}

impl From<String> for DocumentSource {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(data: Vec<u8>) -> Self {
        Self::bytes(data, None)
    }
}

/// File name a download of `source` should be saved under.
///
/// Uses the last path segment of a URL, ignoring query and fragment, and falls
/// back to `fallback` when there is nothing usable.
pub fn suggested_file_name(source: &DocumentSource, fallback: &str) -> String {
    let candidate = match source {
        DocumentSource::Url(url) => {
            let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default()
        }
        DocumentSource::Bytes { .. } => "",
    };
    let name = sanitize_file_name(candidate);
    if name.is_empty() {
        sanitize_file_name(fallback)
    } else {
        name
    }
}

/// Longest file name handed to the platform, in characters.
pub const MAX_FILE_NAME_CHARS: usize = 200;

fn invalid_chars() -> &'static Regex {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("invalid-char pattern compiles"))
}

fn reserved_names() -> &'static Regex {
    static RESERVED: OnceLock<Regex> = OnceLock::new();
    RESERVED.get_or_init(|| {
        Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])(\..*)?$").expect("reserved-name pattern compiles")
    })
}

/// Make `name` safe to save under on Windows, macOS and Linux.
///
/// Invalid and control characters become `_`, surrounding spaces and dots are
/// trimmed, reserved device names (`CON`, `LPT1.pdf`, ...) get a `_` prefix and
/// the result is capped at [`MAX_FILE_NAME_CHARS`]. Returns an empty string
/// when nothing usable is left.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced = invalid_chars().replace_all(name, "_");
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');

    let named = if reserved_names().is_match(trimmed) {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    };

    match named.char_indices().nth(MAX_FILE_NAME_CHARS) {
        Some((cut, _)) => named[..cut].to_string(),
        None => named,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_url_path() {
        let source = DocumentSource::url("https://cdn.example.com/files/report.pdf");
        assert_eq!(suggested_file_name(&source, "document.pdf"), "report.pdf");
    }

    #[test]
    fn file_name_ignores_query_and_fragment() {
        let source = DocumentSource::url("https://example.com/a/b/invoice.pdf?token=abc#page=2");
        assert_eq!(suggested_file_name(&source, "document.pdf"), "invoice.pdf");
    }

    #[test]
    fn file_name_falls_back_for_trailing_slash_and_bytes() {
        let url = DocumentSource::url("https://example.com/files/");
        assert_eq!(suggested_file_name(&url, "document.pdf"), "document.pdf");

        let bytes = DocumentSource::bytes(vec![1, 2, 3], Some(PDF_MIME));
        assert_eq!(suggested_file_name(&bytes, "document.pdf"), "document.pdf");
    }

    #[test]
    fn sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize_file_name("Q3: results?.pdf"), "Q3_ results_.pdf");
        assert_eq!(sanitize_file_name("  ..hidden.pdf "), "hidden.pdf");
    }

    #[test]
    fn sanitize_strips_control_characters() {
        assert_eq!(sanitize_file_name("tab\there\u{7}.pdf"), "tab_here_.pdf");
    }

    #[test]
    fn reserved_device_names_are_prefixed() {
        assert_eq!(sanitize_file_name("CON"), "_CON");
        assert_eq!(sanitize_file_name("nul"), "_nul");
        assert_eq!(sanitize_file_name("COM1"), "_COM1");
        assert_eq!(sanitize_file_name("LPT9.pdf"), "_LPT9.pdf");
        assert_eq!(sanitize_file_name("CONSOLE.pdf"), "CONSOLE.pdf");
        assert_eq!(sanitize_file_name("COM0"), "COM0");
    }

    #[test]
    fn reserved_url_segment_is_not_passed_through() {
        let source = DocumentSource::url("https://x/files/CON");
        assert_eq!(suggested_file_name(&source, "document.pdf"), "_CON");
    }

    #[test]
    fn long_names_are_capped() {
        let long = "a".repeat(300) + ".pdf";
        assert_eq!(sanitize_file_name(&long).chars().count(), MAX_FILE_NAME_CHARS);

        let wide = "é".repeat(250);
        let capped = sanitize_file_name(&wide);
        assert_eq!(capped.chars().count(), MAX_FILE_NAME_CHARS);
        assert!(capped.chars().all(|c| c == 'é'));
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let source = DocumentSource::bytes(vec![0u8; 4096], Some(PDF_MIME));
        let debug = format!("{source:?}");
        assert!(debug.contains("len: 4096"));
        assert!(debug.len() < 100);
    }
}

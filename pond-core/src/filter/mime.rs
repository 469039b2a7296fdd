use super::AcceptFilter;
use crate::domain::SourceHandle;

const OCTET_STREAM: &str = "application/octet-stream";

const BY_EXTENSION: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("json", "application/json"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
];

fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Best-effort MIME type from the file name; unknown falls back to octet-stream.
pub fn guess_mime(name: &str) -> &'static str {
    extension(name)
        .and_then(|ext| {
            BY_EXTENSION
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, m)| *m)
        })
        .unwrap_or(OCTET_STREAM)
}

/// Accepts files matching any of the configured patterns:
/// `image/*`, an exact `application/pdf`, or an extension like `.png`.
pub struct MimeTypeFilter {
    patterns: Vec<String>,
}

impl MimeTypeFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    fn matches(&self, pattern: &str, source: &SourceHandle) -> bool {
        if let Some(ext) = pattern.strip_prefix('.') {
            return extension(&source.name).is_some_and(|e| e == ext);
        }
        let mime = source.mime.to_ascii_lowercase();
        match pattern.strip_suffix("/*") {
            Some(top) => mime.split('/').next() == Some(top),
            None => mime == pattern,
        }
    }
}

impl AcceptFilter for MimeTypeFilter {
    fn name(&self) -> &str {
        "mime-type"
    }

    fn check(&self, source: &SourceHandle) -> Result<(), String> {
        if self.patterns.is_empty() || self.patterns.iter().any(|p| self.matches(p, source)) {
            return Ok(());
        }
        Err(format!(
            "type {} is not one of [{}]",
            source.mime,
            self.patterns.join(", ")
        ))
    }
}

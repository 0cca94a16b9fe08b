//! Playlist entry helpers: extension filtering and URI normalisation.

use url::Url;

use crate::vlc::types::BrowseElement;

/// Accepts URIs whose file name ends with one of the configured extensions.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    suffixes: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            suffixes: extensions
                .iter()
                .map(|ext| format!(".{}", ext.as_ref().trim_start_matches('.').to_lowercase()))
                .collect(),
        }
    }

    /// Case-insensitive suffix match.
    pub fn matches(&self, uri: &str) -> bool {
        let uri = uri.to_lowercase();
        self.suffixes.iter().any(|suffix| uri.ends_with(suffix))
    }

    /// URIs of the files in `elements` that pass the filter.
    pub fn file_uris(&self, elements: &[BrowseElement]) -> Vec<String> {
        elements
            .iter()
            .filter(|element| element.is_file() && self.matches(&element.uri))
            .map(|element| element.uri.clone())
            .collect()
    }
}

/// Normalises a playlist entry to a URI VLC accepts.
///
/// Absolute URIs are kept as they are. Anything else is treated as a local
/// path and becomes a `file:///` URI with percent-encoded segments.
pub fn to_uri(item: &str) -> String {
    if is_absolute_uri(item) {
        return item.to_string();
    }

    let normalized = item.replace('\\', "/");
    let mut url = match Url::parse("file:///") {
        Ok(url) => url,
        Err(_) => return item.to_string(),
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear();
        segments.extend(normalized.trim_start_matches('/').split('/'));
    }
    url.to_string()
}

/// A single-letter scheme is a Windows drive, not a URI.
fn is_absolute_uri(item: &str) -> bool {
    Url::parse(item)
        .map(|url| url.scheme().len() > 1)
        .unwrap_or(false)
}

//! Objects moving between storage, injectors, cache and responses.

use bytes::Bytes;

/// Encodings the edge stores pre-compressed variants in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    Brotli,
}

impl ContentEncoding {
    /// Header value and cache-key suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Brotli => "br",
        }
    }
}

/// Raw result of a backing-storage fetch.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub status: u16,
    pub status_text: String,
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A file ready to be served, injected or cached.
///
/// The body is buffered once; clones share the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedFile {
    pub body: Option<Bytes>,
    pub content_type: Option<String>,
    pub content_encoding: Option<ContentEncoding>,
}

impl ServedFile {
    /// An identity-encoded file.
    pub fn plain(body: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            body: Some(body.into()),
            content_type,
            content_encoding: None,
        }
    }

    /// Same metadata, different body.
    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        Self {
            body: Some(body.into()),
            content_type: self.content_type.clone(),
            content_encoding: self.content_encoding,
        }
    }

    pub fn body_bytes(&self) -> Bytes {
        self.body.clone().unwrap_or_default()
    }
}

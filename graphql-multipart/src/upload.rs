use bytes::Bytes;
use serde::Serialize;

/// A file part received in a multipart request.
///
/// The content is buffered once while the form is read and shared between
/// every variable the file is mapped to, so cloning is cheap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    size: u64,
    #[serde(skip)]
    content: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, content: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            size: content.len() as u64,
            content,
        }
    }

    /// Filename as sent by the client in the part's `Content-Disposition`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

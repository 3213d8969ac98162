//! Reads a `multipart/form-data` body into its `operations` and `map` fields
//! and its file parts.

use axum::body::Body;
use bytesize::ByteSize;
use indexmap::IndexMap;
use multer::Constraints;
use multer::Multipart;
use multer::SizeLimit;

use crate::configuration::MultipartRequestLimits;
use crate::error::MultipartRequestError;
use crate::upload::Upload;

const OPERATIONS_FIELD: &str = "operations";
const MAP_FIELD: &str = "map";

#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    pub(crate) operations: Option<String>,
    pub(crate) map: Option<String>,
    pub(crate) files: IndexMap<String, Upload>,
}

impl MultipartForm {
    /// Reads every part of `body`.
    ///
    /// Parts may come in any order. A part is a file when it carries a
    /// filename; unnamed parts and unknown text fields are skipped.
    pub(crate) async fn read(
        body: Body,
        boundary: String,
        limits: &MultipartRequestLimits,
    ) -> Result<Self, MultipartRequestError> {
        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().whole_stream(limits.max_body_bytes.as_u64()));
        let mut multipart =
            Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                tracing::debug!("skipping unnamed multipart field");
                continue;
            };

            if let Some(filename) = field.file_name().map(str::to_string) {
                if let Some(max_files) = limits.max_files {
                    if form.files.len() >= max_files {
                        return Err(MultipartRequestError::MaxFilesLimitExceeded(max_files));
                    }
                }
                let content_type = field.content_type().map(ToString::to_string);
                let content = field.bytes().await?;
                if let Some(limit) = limits.max_file_size {
                    if content.len() as u64 > limit.as_u64() {
                        return Err(MultipartRequestError::MaxFileSizeLimitExceeded {
                            limit,
                            filename,
                        });
                    }
                }
                tracing::debug!(
                    field = %name,
                    filename = %filename,
                    size = %ByteSize::b(content.len() as u64),
                    "received file"
                );
                form.files
                    .insert(name, Upload::new(filename, content_type, content));
                continue;
            }

            match name.as_str() {
                OPERATIONS_FIELD => form.operations = Some(field.text().await?),
                MAP_FIELD => form.map = Some(field.text().await?),
                _ => tracing::debug!(field = %name, "skipping unknown multipart field"),
            }
        }
        Ok(form)
    }

    pub(crate) fn operations(&self) -> Result<&str, MultipartRequestError> {
        self.operations
            .as_deref()
            .ok_or(MultipartRequestError::MissingOperationsField)
    }

    pub(crate) fn map(&self) -> Result<&str, MultipartRequestError> {
        self.map
            .as_deref()
            .ok_or(MultipartRequestError::MissingMapField)
    }
}

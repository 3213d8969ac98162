//! Errors that end the handling of a request.

use axum::body::Body;
use bytesize::ByteSize;
use http::HeaderValue;
use http::Method;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use thiserror::Error;
use tower::BoxError;

use crate::graphql;
use crate::path::PathError;

pub(crate) static APPLICATION_JSON_UTF8: HeaderValue =
    HeaderValue::from_static("application/json; charset=utf-8");

/// Errors that may occur while turning an HTTP request into operations and
/// running them.
///
/// None of them is retryable: the request is answered with an error response
/// and nothing is kept.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MultipartRequestError {
    #[error("HTTP method {0} is not supported, use GET or POST.")]
    UnsupportedMethod(Method),

    #[error(
        "Content-Type '{0}' is not supported, use 'application/json', 'text/plain' or 'multipart/form-data'."
    )]
    UnsupportedContentType(String),

    #[error("Missing query")]
    MissingQuery,

    #[error("Invalid JSON in the 'variables' parameter: {0}")]
    MalformedVariables(serde_json::Error),

    #[error("Invalid JSON in the request body: {0}")]
    MalformedBody(serde_json::Error),

    #[error("Invalid JSON in the 'map' multipart field: {0}")]
    MalformedMap(serde_json::Error),

    #[error("Invalid JSON in the 'operations' multipart field: {0}")]
    MalformedOperations(serde_json::Error),

    #[error("Invalid path inside 'map' field: {0}")]
    MalformedPath(#[from] PathError),

    #[error("Request body exceeds the limit of {0}.")]
    BodyTooLarge(ByteSize),

    #[error("invalid multipart request: {0}")]
    InvalidMultipartRequest(multer::Error),

    #[error("Missing multipart field 'operations'.")]
    MissingOperationsField,

    #[error("Missing multipart field 'map'.")]
    MissingMapField,

    #[error("Missing files in the request: {0}.")]
    MissingFiles(String),

    #[error("Exceeded the limit of {0} file uploads of files in a single request.")]
    MaxFilesLimitExceeded(usize),

    #[error("Exceeded the limit of {limit} on {filename} file.")]
    MaxFileSizeLimitExceeded { limit: ByteSize, filename: String },

    #[error("Operations must be a JSON object or an array of JSON objects, found {0}.")]
    InvalidOperationsShape(&'static str),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Batch must contain at least one operation.")]
    EmptyBatch,

    #[error("failed to read the request body: {0}")]
    BodyRead(BoxError),

    #[error("failed to execute operation: {0}")]
    ExecutionFailed(BoxError),

    #[error("failed to serialize the response: {0}")]
    ResponseSerialization(serde_json::Error),
}

impl MultipartRequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MultipartRequestError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            MultipartRequestError::UnsupportedContentType(_) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            MultipartRequestError::BodyTooLarge(_)
            | MultipartRequestError::MaxFilesLimitExceeded(_)
            | MultipartRequestError::MaxFileSizeLimitExceeded { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            MultipartRequestError::ExecutionFailed(_)
            | MultipartRequestError::ResponseSerialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn extension_code(&self) -> &'static str {
        match self {
            MultipartRequestError::UnsupportedMethod(_) => "UNSUPPORTED_METHOD",
            MultipartRequestError::UnsupportedContentType(_) => "UNSUPPORTED_CONTENT_TYPE",
            MultipartRequestError::MissingQuery => "MISSING_QUERY",
            MultipartRequestError::MalformedVariables(_) => "MALFORMED_VARIABLES",
            MultipartRequestError::MalformedBody(_) => "MALFORMED_BODY",
            MultipartRequestError::MalformedMap(_) => "MALFORMED_MAP",
            MultipartRequestError::MalformedOperations(_) => "MALFORMED_OPERATIONS",
            MultipartRequestError::MalformedPath(_) => "MALFORMED_PATH",
            MultipartRequestError::BodyTooLarge(_) => "BODY_TOO_LARGE",
            MultipartRequestError::InvalidMultipartRequest(_)
            | MultipartRequestError::MissingOperationsField
            | MultipartRequestError::MissingMapField
            | MultipartRequestError::MissingFiles(_) => "INVALID_MULTIPART_REQUEST",
            MultipartRequestError::MaxFilesLimitExceeded(_) => {
                "FILE_UPLOADS_LIMITS_MAX_FILES_EXCEEDED"
            }
            MultipartRequestError::MaxFileSizeLimitExceeded { .. } => {
                "FILE_UPLOADS_LIMITS_MAX_FILE_SIZE_EXCEEDED"
            }
            MultipartRequestError::InvalidOperationsShape(_)
            | MultipartRequestError::InvalidOperation(_)
            | MultipartRequestError::EmptyBatch => "INVALID_GRAPHQL_REQUEST",
            MultipartRequestError::BodyRead(_) => "BODY_READ_ERROR",
            MultipartRequestError::ExecutionFailed(_) => "EXECUTION_FAILED",
            MultipartRequestError::ResponseSerialization(_) => "RESPONSE_SERIALIZATION_FAILED",
        }
    }

    /// Builds the HTTP response answering the failed request.
    pub fn into_response(self) -> http::Response<Body> {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.extension_code(), "request failed");
        } else {
            tracing::warn!(error = %self, code = self.extension_code(), "request rejected");
        }

        let body = graphql::Response::from_errors(vec![self.into()]);
        // An error response only holds strings, it always serializes.
        let bytes = serde_json::to_vec(&body).unwrap_or_default();

        let mut response = http::Response::new(Body::from(bytes));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, APPLICATION_JSON_UTF8.clone());
        response
    }
}

impl From<MultipartRequestError> for graphql::Error {
    fn from(value: MultipartRequestError) -> Self {
        graphql::Error::new(value.to_string()).with_extension_code(value.extension_code())
    }
}

impl From<multer::Error> for MultipartRequestError {
    fn from(value: multer::Error) -> Self {
        match value {
            multer::Error::StreamSizeExceeded { limit } => {
                MultipartRequestError::BodyTooLarge(ByteSize::b(limit))
            }
            other => MultipartRequestError::InvalidMultipartRequest(other),
        }
    }
}

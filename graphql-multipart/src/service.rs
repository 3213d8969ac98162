//! Turns HTTP requests into operations and answers them with the executor's
//! results.
//!
//! See [`MultipartRequestService`] for the accepted requests.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::Poll;

use axum::body::Body;
use axum::extract::ConnectInfo;
use bytes::Bytes;
use bytesize::ByteSize;
use futures::future::BoxFuture;
use http::HeaderMap;
use http::Method;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use http_body_util::LengthLimitError;
use http_body_util::Limited;
use mediatype::MediaType;
use mediatype::ReadParams;
use mediatype::names::APPLICATION;
use mediatype::names::BOUNDARY;
use mediatype::names::FORM_DATA;
use mediatype::names::JSON;
use mediatype::names::MULTIPART;
use mediatype::names::PLAIN;
use mediatype::names::TEXT;
use tower::BoxError;
use tower::Service;
use tracing::Instrument;

use crate::configuration::MultipartRequestLimits;
use crate::context::RequestContext;
use crate::error::APPLICATION_JSON_UTF8;
use crate::error::MultipartRequestError;
use crate::executor::Executor;
use crate::map_field::FileMap;
use crate::multipart::MultipartForm;
use crate::path;
use crate::request::Operation;
use crate::request::Operations;
use crate::value::Value;

type Result<T> = std::result::Result<T, MultipartRequestError>;

/// Tower service answering GraphQL HTTP requests with an [`Executor`].
///
///  - `GET` reads the operation from the `query`, `variables` and
///    `operationName` search params.
///  - `POST` with `application/json` or `text/plain` reads one operation
///    object or an array of them.
///  - `POST` with `multipart/form-data` reads the `operations` and `map` fields,
///    then places every file part at the paths `map` declares for it.
///
/// Operations of a batch run one after the other, in order, and the response
/// is an array of their results. Any failure answers the whole request with an
/// error: there are no partial batch responses.
pub struct MultipartRequestService<E> {
    executor: Arc<E>,
    limits: Arc<MultipartRequestLimits>,
}

impl<E> Clone for MultipartRequestService<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            limits: self.limits.clone(),
        }
    }
}

impl<E> MultipartRequestService<E>
where
    E: Executor,
{
    pub fn new(executor: E, limits: MultipartRequestLimits) -> Self {
        Self {
            executor: Arc::new(executor),
            limits: Arc::new(limits),
        }
    }
}

impl<E, B> Service<http::Request<B>> for MultipartRequestService<E>
where
    E: Executor,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let executor = self.executor.clone();
        let limits = self.limits.clone();
        let span = tracing::info_span!(
            "multipart_request",
            method = %req.method(),
            content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default(),
        );
        Box::pin(
            async move {
                let response = handle(executor.as_ref(), &limits, req.map(Body::new))
                    .await
                    .unwrap_or_else(MultipartRequestError::into_response);
                Ok(response)
            }
            .instrument(span),
        )
    }
}

async fn handle<E: Executor>(
    executor: &E,
    limits: &MultipartRequestLimits,
    request: http::Request<Body>,
) -> Result<http::Response<Body>> {
    let (parts, body) = request.into_parts();
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let operations = if parts.method == Method::GET {
        Operations::Single(Operation::from_urlencoded_query(
            parts.uri.query().unwrap_or_default(),
        )?)
    } else if parts.method == Method::POST {
        read_post_body(&parts.headers, body, limits).await?
    } else {
        return Err(MultipartRequestError::UnsupportedMethod(parts.method));
    };

    tracing::debug!(batch = operations.is_batch(), "operations decoded");
    let context = RequestContext::new(parts.headers, remote_addr);
    execute(executor, operations, &context).await
}

async fn read_post_body(
    headers: &HeaderMap,
    body: Body,
    limits: &MultipartRequestLimits,
) -> Result<Operations> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let unsupported = || MultipartRequestError::UnsupportedContentType(content_type.to_string());
    let mime = MediaType::parse(content_type).map_err(|_| unsupported())?;

    if (mime.ty == APPLICATION && mime.subty == JSON) || (mime.ty == TEXT && mime.subty == PLAIN) {
        let bytes = read_body(body, limits.max_body_bytes).await?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(MultipartRequestError::MalformedBody)?;
        Operations::try_from(value)
    } else if mime.ty == MULTIPART && mime.subty == FORM_DATA {
        // Boundaries may be quoted: `boundary="abc"` delimits with `--abc`.
        let boundary = mime
            .get_param(BOUNDARY)
            .ok_or(MultipartRequestError::InvalidMultipartRequest(
                multer::Error::NoBoundary,
            ))?
            .unquoted_str()
            .into_owned();
        read_multipart(body, boundary, limits).await
    } else {
        Err(unsupported())
    }
}

async fn read_body(body: Body, limit: ByteSize) -> Result<Bytes> {
    let limit_bytes = usize::try_from(limit.as_u64()).unwrap_or(usize::MAX);
    Limited::new(body, limit_bytes)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|err| {
            if err.is::<LengthLimitError>() {
                MultipartRequestError::BodyTooLarge(limit)
            } else {
                MultipartRequestError::BodyRead(err)
            }
        })
}

async fn read_multipart(
    body: Body,
    boundary: String,
    limits: &MultipartRequestLimits,
) -> Result<Operations> {
    let form = MultipartForm::read(body, boundary, limits).await?;

    let map = FileMap::from_json(form.map()?)?;
    let mut operations: Value = serde_json::from_str(form.operations()?)
        .map_err(MultipartRequestError::MalformedOperations)?;

    let missing: Vec<&str> = map
        .files()
        .filter(|file| !form.files.contains_key(*file))
        .collect();
    if !missing.is_empty() {
        return Err(MultipartRequestError::MissingFiles(missing.join(", ")));
    }

    for (file, paths) in map.iter() {
        let upload = form
            .files
            .get(file)
            .ok_or_else(|| MultipartRequestError::MissingFiles(file.to_string()))?;
        for path in paths {
            path::inject(Value::Upload(upload.clone()), &mut operations, path)?;
            tracing::debug!(file, path = %path, "placed upload");
        }
    }

    Operations::try_from(operations)
}

async fn execute<E: Executor>(
    executor: &E,
    operations: Operations,
    context: &RequestContext,
) -> Result<http::Response<Body>> {
    let body = match operations {
        Operations::Single(operation) => {
            let response = execute_one(executor, operation, context).await?;
            serde_json::to_vec(&response)
        }
        Operations::Batch(operations) => {
            tracing::debug!(size = operations.len(), "executing batch");
            let mut responses = Vec::with_capacity(operations.len());
            for operation in operations {
                responses.push(execute_one(executor, operation, context).await?);
            }
            serde_json::to_vec(&responses)
        }
    }
    .map_err(MultipartRequestError::ResponseSerialization)?;

    let mut response = http::Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, APPLICATION_JSON_UTF8.clone());
    Ok(response)
}

async fn execute_one<E: Executor>(
    executor: &E,
    operation: Operation,
    context: &RequestContext,
) -> Result<E::Response> {
    tracing::debug!(
        operation_name = operation.operation_name.as_deref().unwrap_or_default(),
        "executing operation"
    );
    executor
        .execute(operation, context)
        .await
        .map_err(MultipartRequestError::ExecutionFailed)
}

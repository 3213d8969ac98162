use std::sync::Arc;

use serde::Serialize;
use tower::BoxError;

use crate::context::RequestContext;
use crate::request::Operation;

/// Evaluates one operation.
///
/// The result is passed through to the response encoding untouched. An error
/// fails the whole HTTP request, including every other operation of a batch.
#[async_trait::async_trait]
pub trait Executor: Send + Sync + 'static {
    type Response: Serialize + Send;

    async fn execute(
        &self,
        operation: Operation,
        context: &RequestContext,
    ) -> Result<Self::Response, BoxError>;
}

#[async_trait::async_trait]
impl<E> Executor for Arc<E>
where
    E: Executor,
{
    type Response = E::Response;

    async fn execute(
        &self,
        operation: Operation,
        context: &RequestContext,
    ) -> Result<Self::Response, BoxError> {
        (**self).execute(operation, context).await
    }
}

//! Axum wiring for [`MultipartRequestService`].

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::configuration::Configuration;
use crate::executor::Executor;
use crate::service::MultipartRequestService;

/// Routes `server.path` to a [`MultipartRequestService`] around `executor`.
pub fn router<E: Executor>(configuration: &Configuration, executor: E) -> Router {
    let service = MultipartRequestService::new(executor, configuration.limits.clone());
    Router::new()
        .route_service(&configuration.server.path, service)
        .layer(TraceLayer::new_for_http())
}

/// Serves `router` on `listener` until `shutdown` resolves.
///
/// Connection info is recorded so executors see the peer address.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("GraphQL endpoint exposed at http://{}", listener.local_addr()?);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

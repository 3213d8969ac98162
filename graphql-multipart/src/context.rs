use std::net::SocketAddr;

use http::HeaderMap;

/// Request-scoped values shared by every operation of one HTTP request.
///
/// Executors receive it by reference and cannot alter it, so all the
/// operations of a batch observe the same headers and peer address.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            headers,
            remote_addr,
        }
    }

    /// Headers of the inbound HTTP request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Peer address, when the server recorded connection info.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

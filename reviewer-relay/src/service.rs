use crate::errors::RelayError;
use crate::router::{RelayBody, Router};
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

/// Serves one client connection.
pub struct RelayService {
    router: Router,
    peer_addr: SocketAddr,
}

impl RelayService {
    pub fn new(router: Router, peer_addr: SocketAddr) -> Self {
        Self { router, peer_addr }
    }
}

impl Service<Request<Incoming>> for RelayService {
    type Response = Response<RelayBody>;
    type Error = RelayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        tracing::info!(peer = %self.peer_addr, path = %req.uri().path(), "request");

        let router = self.router.clone();
        Box::pin(async move { Ok(router.route(req).await) })
    }
}

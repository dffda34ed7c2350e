use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Binds `listen` and serves every accepted connection with a fresh service
/// built by `make_service` from the peer address.
pub async fn run_http_service<F, S, E>(listen: &str, make_service: F) -> Result<(), E>
where
    F: Fn(SocketAddr) -> S,
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let listener = TcpListener::bind(normalize_listen_addr(listen)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    serve(listener, make_service).await
}

/// Accept loop over an already bound listener.
pub async fn serve<F, S, E>(listener: TcpListener, make_service: F) -> Result<(), E>
where
    F: Fn(SocketAddr) -> S,
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = make_service(peer_addr);

        // Hand the connection to hyper; auto-detect h1/h2 on this socket
        tokio::spawn(async move {
            if let Err(err) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(%peer_addr, error = %err, "connection closed with error");
            }
        });
    }
}

/// Go-style listen addresses (`:8080`) bind on all interfaces.
pub fn normalize_listen_addr(listen: &str) -> String {
    match listen.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => listen.to_string(),
    }
}

/// Plain text response. The body is terminated with a newline if it does not
/// already end with one.
pub fn make_text_response<E>(status: StatusCode, body: &str) -> Response<BoxBody<Bytes, E>> {
    let mut text = body.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }

    let mut response = Response::new(Full::new(Bytes::from(text)).map_err(|e| match e {}).boxed());
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub fn make_json_response<E>(status: StatusCode, body: Vec<u8>) -> Response<BoxBody<Bytes, E>> {
    let mut response = Response::new(Full::new(Bytes::from(body)).map_err(|e| match e {}).boxed());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

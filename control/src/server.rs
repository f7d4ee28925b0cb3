//! HTTP endpoints
//!
//! Two listeners share one router: the HTTPS admission webhook and the
//! plain-HTTP metrics/health endpoint.

use crate::apis::metrics::gather_controller_metrics;
use crate::error::ControlError;
use crate::webhook::AdmissionValidator;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

pub const VALIDATE_GATEWAY_PATH: &str = "/validate-gateway";

pub struct HttpServer {
    bind_addr: String,
    acceptor: Option<TlsAcceptor>,
    validator: Option<Arc<AdmissionValidator>>,
}

impl HttpServer {
    /// HTTPS server for admission reviews
    pub fn webhook(
        bind_addr: String,
        tls: Arc<rustls::ServerConfig>,
        validator: Arc<AdmissionValidator>,
    ) -> Self {
        Self {
            bind_addr,
            acceptor: Some(TlsAcceptor::from(tls)),
            validator: Some(validator),
        }
    }

    /// Plain HTTP server for /metrics and /healthz
    pub fn metrics(bind_addr: String) -> Self {
        Self {
            bind_addr,
            acceptor: None,
            validator: None,
        }
    }

    /// Accept connections until the task is dropped
    pub async fn serve(self) -> Result<(), ControlError> {
        let listener = TcpListener::bind(&self.bind_addr).await.map_err(|e| {
            ControlError::Config(format!("Failed to bind to {}: {}", self.bind_addr, e))
        })?;

        info!(
            "Listening on {} ({})",
            self.bind_addr,
            if self.acceptor.is_some() { "HTTPS" } else { "HTTP" }
        );

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Accept error on {}: {}", self.bind_addr, e);
                    continue;
                }
            };
            debug!("Accepted connection from {} on {}", peer_addr, self.bind_addr);

            let acceptor = self.acceptor.clone();
            let validator = self.validator.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let validator = validator.clone();
                    async move { Ok::<_, Infallible>(handle(req, validator).await) }
                });

                let result = match acceptor {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(tls_stream) => {
                            http1::Builder::new()
                                .serve_connection(TokioIo::new(tls_stream), service)
                                .await
                        }
                        Err(e) => {
                            debug!("TLS handshake with {} failed: {}", peer_addr, e);
                            return;
                        }
                    },
                    None => {
                        http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                    }
                };

                if let Err(e) = result {
                    debug!("Connection error: {}", e);
                }
            });
        }
    }
}

async fn handle(
    req: Request<hyper::body::Incoming>,
    validator: Option<Arc<AdmissionValidator>>,
) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let body = if method == Method::POST {
        match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return plain(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read body: {}", e),
                )
            }
        }
    } else {
        Bytes::new()
    };

    respond(&method, &path, &body, validator.as_deref())
}

/// Route a request to its endpoint
pub fn respond(
    method: &Method,
    path: &str,
    body: &[u8],
    validator: Option<&AdmissionValidator>,
) -> Response<Full<Bytes>> {
    match (method, path, validator) {
        (&Method::GET, "/healthz", _) => plain(StatusCode::OK, "ok"),
        (&Method::GET, "/metrics", _) => match gather_controller_metrics() {
            Ok(text) => plain(StatusCode::OK, text),
            Err(e) => {
                error!("{}", e);
                plain(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        },
        (&Method::POST, VALIDATE_GATEWAY_PATH, Some(validator)) => {
            match validator.review_bytes(body) {
                Ok(review) => json(review),
                Err(e) => plain(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid admission review: {}", e),
                ),
            }
        }
        _ => plain(StatusCode::NOT_FOUND, "not found"),
    }
}

fn plain(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

fn json(body: Vec<u8>) -> Response<Full<Bytes>> {
    #[allow(clippy::unwrap_used)]
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

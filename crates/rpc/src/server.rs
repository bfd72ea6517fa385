// rpc/src/server.rs
use crate::{ErrorResponse, ImportResponse, RpcError, RpcMethods, RpcResult};
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN,
};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub listen_addr: SocketAddr,
    pub cors_origins: Vec<String>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cors_origins: vec!["*".to_string()],
        }
    }
}

pub struct RpcServer {
    config: RpcConfig,
    methods: Arc<RpcMethods>,
}

impl RpcServer {
    pub fn new(config: RpcConfig, methods: RpcMethods) -> Self {
        Self {
            config,
            methods: Arc::new(methods),
        }
    }

    pub fn methods(&self) -> &RpcMethods {
        &self.methods
    }

    /// Serves until `shutdown` resolves
    pub async fn start<F>(self: Arc<Self>, shutdown: F) -> RpcResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Starting HTTP API on {}", self.config.listen_addr);

        let value = self.clone();
        let make_svc = make_service_fn(move |_| {
            let server = value.clone();
            async move {
                Ok::<_, hyper::Error>(service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                }))
            }
        });

        let server = Server::try_bind(&self.config.listen_addr)
            .map_err(|e| RpcError::ServerError(e.to_string()))?
            .serve(make_svc)
            .with_graceful_shutdown(shutdown);

        tracing::info!("HTTP API listening on {}", self.config.listen_addr);

        server.await
            .map_err(|e| RpcError::ServerError(e.to_string()))?;

        tracing::info!("HTTP API stopped");
        Ok(())
    }

    pub async fn handle_request(&self, req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
        let origin = self.allowed_origin(&req);
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        if method == Method::OPTIONS {
            return Ok(self.finish(Response::new(Body::empty()), origin));
        }

        let body = hyper::body::to_bytes(req.into_body()).await?;
        tracing::debug!("{} {}", method, path);

        let m = &self.methods;
        let response = match (&method, path.as_str()) {
            (&Method::GET, "/health") => json_response(StatusCode::OK, &m.health()),
            (&Method::GET, "/version") => json_response(StatusCode::OK, &m.version()),
            (&Method::GET, "/state") => result_response(m.state()),
            (&Method::POST, "/api/fcp") => json_response(StatusCode::OK, &m.fcp(&body)),
            (&Method::POST, "/import") => match m.import(&body) {
                Ok(resp) => json_response(StatusCode::OK, &resp),
                Err(e) => json_response(
                    StatusCode::BAD_REQUEST,
                    &ImportResponse {
                        ok: false,
                        nodes: None,
                        error: Some(e.to_string()),
                    },
                ),
            },
            (&Method::GET, "/chain") => result_response(m.chain_info()),
            (&Method::GET, "/blocks") => result_response(m.blocks()),
            (&Method::GET, "/validate") => result_response(m.validate()),
            (&Method::POST, "/mine") => result_response(m.mine(&body).await),
            (_, path) => error_response(&RpcError::NotFound(format!("{method} {path}"))),
        };

        Ok(self.finish(response, origin))
    }

    fn allowed_origin(&self, req: &Request<Body>) -> Option<HeaderValue> {
        let origins = &self.config.cors_origins;
        if origins.iter().any(|o| o == "*") {
            return Some(HeaderValue::from_static("*"));
        }
        let origin = req.headers().get(ORIGIN)?;
        let requested = origin.to_str().ok()?;
        origins
            .iter()
            .any(|o| o == requested)
            .then(|| origin.clone())
    }

    fn finish(&self, mut response: Response<Body>, origin: Option<HeaderValue>) -> Response<Body> {
        let headers = response.headers_mut();
        if let Some(origin) = origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, POST, OPTIONS"));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type"));
        response
    }
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    let body = serde_json::to_vec(value).unwrap_or_else(|e| {
        tracing::error!("failed to encode response: {}", e);
        br#"{"ok":false,"error":"encoding failed"}"#.to_vec()
    });
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn result_response<T: Serialize>(result: RpcResult<T>) -> Response<Body> {
    match result {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(e) => error_response(&e),
    }
}

fn error_response(error: &RpcError) -> Response<Body> {
    let status = error.status();
    if status.is_server_error() {
        tracing::warn!("request failed: {}", error);
    }
    json_response(
        status,
        &ErrorResponse {
            ok: false,
            error: error.to_string(),
        },
    )
}

//! HTTP API over a [`LogService`].
//!
//! Routing and error translation live in [`dispatch`], which works on plain
//! request parts so it can be driven without a socket. [`serve`] wraps it in a
//! hyper HTTP/1 accept loop that runs until the shutdown signal fires.
//!
//! | Method   | Path                       | Operation                          |
//! |----------|----------------------------|------------------------------------|
//! | `GET`    | `/health`                  | liveness probe                     |
//! | `GET`    | `/logs/health/test-logs`   | write a health-check record        |
//! | `GET`    | `/logs`                    | list, filtered by query parameters |
//! | `POST`   | `/logs`                    | create                             |
//! | `GET`    | `/logs/{id}`               | fetch by id                        |
//! | `DELETE` | `/logs/{id}`               | delete one record                  |
//! | `DELETE` | `/logs`                    | range delete or truncate           |

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use logkeep_core::{
    DeleteOutcome, DeleteRequest, ErrorKind, LogError, LogFilter, LogRecordStore, LogService,
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use crate::error::{ServerError, ServerResult};

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// Body returned by `GET /logs/health/test-logs` on success.
pub const HEALTH_CHECK_CREATED: &str = "Test log entry created successfully.";

/// Per-server API switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiOptions {
    /// Whether `DELETE /logs?truncate=true` is honoured.
    pub allow_truncate: bool,
}

/// A transport-independent response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Value of the `Content-Type` header.
    pub content_type: &'static str,
    /// Response body.
    pub body: Bytes,
}

impl ApiResponse {
    fn json(status: StatusCode, value: &impl Serialize) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: JSON,
                body: Bytes::from(body),
            },
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                Self::text(StatusCode::INTERNAL_SERVER_ERROR, "failed to serialize response")
            }
        }
    }

    fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT,
            body: Bytes::from(body.into()),
        }
    }

    fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::json(status, &json!({ "error": message.into() }))
    }

    /// Parses the body as JSON. Intended for tests and clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON.
    pub fn json_body(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }

    fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static(self.content_type));
        response
    }
}

impl From<LogError> for ApiResponse {
    fn from(err: LogError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
        } else {
            debug!(error = %err, %status, "request rejected");
        }

        match err.violations() {
            Some(details) => Self::json(
                status,
                &json!({ "error": "log record validation failed", "details": details }),
            ),
            None => Self::error(status, err.to_string()),
        }
    }
}

/// Maps a service error to its HTTP status.
#[must_use]
pub const fn status_for(err: &LogError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation | ErrorKind::InvalidRequest | ErrorKind::Malformed => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Routes one request to the service.
pub async fn dispatch<S: LogRecordStore>(
    service: &LogService<S>,
    options: ApiOptions,
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
) -> ApiResponse {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let params = || form_urlencoded::parse(query.unwrap_or("").as_bytes());

    let result = match (method, segments.as_slice()) {
        (&Method::GET, ["health"]) => Ok(ApiResponse::text(StatusCode::OK, "OK")),
        (&Method::GET, ["logs", "health", "test-logs"]) => {
            let message = params().find(|(k, _)| k == "message").map(|(_, v)| v.into_owned());
            service
                .record_health_check(message.as_deref())
                .await
                .map(|_| ApiResponse::text(StatusCode::OK, HEALTH_CHECK_CREATED))
        }
        (&Method::GET, ["logs"]) => list(service, params()).await,
        (&Method::POST, ["logs"]) => create(service, body).await,
        (&Method::GET, ["logs", id]) => service
            .get_by_id(*id)
            .await
            .map(|record| ApiResponse::json(StatusCode::OK, &record)),
        (&Method::DELETE, ["logs", id]) => delete_one(service, id).await,
        (&Method::DELETE, ["logs"]) => match delete_request(params()) {
            Ok(request) if request.truncate && !options.allow_truncate => {
                warn!("refused truncate request: truncation is disabled");
                Ok(ApiResponse::error(
                    StatusCode::FORBIDDEN,
                    "truncation is disabled on this server",
                ))
            }
            Ok(request) => delete_many(service, request).await,
            Err(e) => Err(e),
        },
        (_, ["health"] | ["logs"] | ["logs", _] | ["logs", "health", "test-logs"]) => Ok(ApiResponse::error(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("method {method} not allowed on {path}"),
        )),
        _ => Ok(ApiResponse::error(
            StatusCode::NOT_FOUND,
            format!("no route for {path}"),
        )),
    };

    result.unwrap_or_else(ApiResponse::from)
}

async fn list<S: LogRecordStore>(
    service: &LogService<S>,
    params: form_urlencoded::Parse<'_>,
) -> Result<ApiResponse, LogError> {
    let filter = LogFilter::from_pairs(params)?;
    let records = service.list(&filter).await?;
    Ok(ApiResponse::json(StatusCode::OK, &records))
}

async fn create<S: LogRecordStore>(
    service: &LogService<S>,
    body: &[u8],
) -> Result<ApiResponse, LogError> {
    let payload: serde_json::Value = serde_json::from_slice(body)?;
    let record = service.create(&payload).await?;
    Ok(ApiResponse::json(StatusCode::CREATED, &record))
}

async fn delete_one<S: LogRecordStore>(
    service: &LogService<S>,
    id: &str,
) -> Result<ApiResponse, LogError> {
    let Ok(parsed) = id.parse::<i64>() else {
        return Err(LogError::NotFound(id.to_string()));
    };

    match service.delete(DeleteRequest::single(parsed)).await? {
        DeleteOutcome::Deleted(0) => Err(LogError::NotFound(id.to_string())),
        _ => Ok(ApiResponse::json(StatusCode::OK, &json!({ "success": true }))),
    }
}

async fn delete_many<S: LogRecordStore>(
    service: &LogService<S>,
    request: DeleteRequest,
) -> Result<ApiResponse, LogError> {
    let body = match service.delete(request).await? {
        DeleteOutcome::Deleted(count) => json!({ "success": true, "deleted": count }),
        DeleteOutcome::Truncated => json!({ "success": true, "truncated": true }),
    };
    Ok(ApiResponse::json(StatusCode::OK, &body))
}

/// Builds a [`DeleteRequest`] from `startId`, `endId` and `truncate` parameters.
fn delete_request(params: form_urlencoded::Parse<'_>) -> Result<DeleteRequest, LogError> {
    let mut request = DeleteRequest::default();

    for (key, value) in params {
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "startId" | "start_id" => request.start_id = Some(parse_id(&key, &value)?),
            "endId" | "end_id" => request.end_id = Some(parse_id(&key, &value)?),
            "truncate" => {
                request.truncate = match value.as_ref() {
                    "true" | "1" => true,
                    "false" | "0" => false,
                    other => {
                        return Err(LogError::InvalidRequest(format!(
                            "truncate must be true or false, got {other}"
                        )));
                    }
                };
            }
            _ => {}
        }
    }

    Ok(request)
}

fn parse_id(key: &str, value: &str) -> Result<i64, LogError> {
    value
        .parse()
        .map_err(|_| LogError::InvalidRequest(format!("{key} must be an integer, got {value}")))
}

/// Binds a listener for [`serve`].
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> ServerResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(addr, e))
}

/// Serves the API on `listener` until `shutdown` is set to `true`.
///
/// Returns the address that was listened on.
pub async fn serve<S>(
    listener: TcpListener,
    service: Arc<LogService<S>>,
    options: ApiOptions,
    mut shutdown: watch::Receiver<bool>,
) -> ServerResult<SocketAddr>
where
    S: LogRecordStore + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, "log API listening");

    loop {
        tokio::select! {
            accept = listener.accept() => {
                match accept {
                    Ok((stream, peer_addr)) => {
                        let service = Arc::clone(&service);
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let svc = service_fn(move |req| {
                                let service = Arc::clone(&service);
                                async move { handle_request(req, &service, options).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, svc)
                                .await
                            {
                                if !e.is_incomplete_message() {
                                    warn!(peer = %peer_addr, error = %e, "connection error");
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept failed");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("log API shutting down");
                    break;
                }
            }
        }
    }

    Ok(addr)
}

async fn handle_request<S: LogRecordStore>(
    req: Request<Incoming>,
    service: &LogService<S>,
    options: ApiOptions,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    let response = dispatch(
        service,
        options,
        &parts.method,
        parts.uri.path(),
        parts.uri.query(),
        &body,
    )
    .await;

    debug!(
        method = %parts.method,
        path = parts.uri.path(),
        status = response.status.as_u16(),
        "handled request"
    );
    Ok(response.into_response())
}

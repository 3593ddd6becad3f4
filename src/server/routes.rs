use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{ACCEPT, ALLOW, CACHE_CONTROL, CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;

use super::config::ServerConfig;
use super::page;
use crate::errors::{AppError, ErrorKind};
use crate::pem_decoder::{BlockPolicy, DecodeEngine, Report};

const LOG_TARGET: &str = "pemview/http";
const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";
const CSS: &str = "text/css; charset=utf-8";
const FORM_ERROR_MESSAGE: &str = "failed to parse PEM";

/// Shared by every connection.
pub struct AppState {
    pub engine: DecodeEngine,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(engine: DecodeEngine, config: ServerConfig) -> Self {
        Self { engine, config }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitForm {
    #[serde(default)]
    pem: String,
}

pub async fn handle<B>(
    state: Arc<AppState>,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => respond(StatusCode::OK, HTML, page::index()),
        (&Method::POST, "/") => submit(&state, req).await,
        (&Method::GET, "/assets/style.css") => {
            let mut resp = respond(StatusCode::OK, CSS, page::STYLESHEET);
            resp.headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));
            resp
        }
        (_, "/") => method_not_allowed("GET, POST", accepts_json(&req)),
        (_, "/assets/style.css") => method_not_allowed("GET", accepts_json(&req)),
        _ => route_error(
            &AppError::new(ErrorKind::NotFound, "not found"),
            accepts_json(&req),
        ),
    };

    log::info!(
        target: LOG_TARGET,
        "{method} {path} -> {} ({}ms)",
        response.status().as_u16(),
        start.elapsed().as_millis()
    );
    Ok(response)
}

async fn submit<B>(state: &AppState, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let wants_json = accepts_json(&req);
    let request_id = uuid::Uuid::new_v4().to_string();
    log::debug!(target: LOG_TARGET, "[{request_id}] received pem parser request");

    let outcome = match read_form(req, state.config.max_request_bytes).await {
        Ok(pem) => state.engine.submit(&request_id, pem.as_bytes()),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(reports) => reports_response(&state.engine, &reports, wants_json),
        Err(err) => {
            if !err.is_user_error() {
                log::error!(target: LOG_TARGET, "[{request_id}] {err}");
            }
            error_response(&err, wants_json)
        }
    }
}

/// Collect the bounded body and pull out the trimmed `pem` field.
async fn read_form<B>(req: Request<B>, limit: usize) -> Result<String, AppError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let body = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                AppError::new(
                    ErrorKind::PayloadTooLarge,
                    format!(
                        "request is too large, max supported limit is {} MB",
                        limit / (1000 * 1000)
                    ),
                )
            } else {
                AppError::new(ErrorKind::BadRequest, FORM_ERROR_MESSAGE)
                    .with_trace(None, Some(err.to_string()), None)
            }
        })?
        .to_bytes();

    let form: SubmitForm = serde_urlencoded::from_bytes(&body).map_err(|err| {
        AppError::new(ErrorKind::BadRequest, FORM_ERROR_MESSAGE).with_trace(
            None,
            Some(err.to_string()),
            None,
        )
    })?;
    Ok(form.pem.trim().to_string())
}

fn reports_response(engine: &DecodeEngine, reports: &[Report], wants_json: bool) -> Response<Full<Bytes>> {
    if wants_json {
        let encoded = match (engine.options().policy, reports) {
            (BlockPolicy::Single, [report]) => serde_json::to_vec(report),
            _ => serde_json::to_vec(reports),
        };
        return match encoded {
            Ok(body) => respond(StatusCode::OK, JSON, body),
            Err(err) => error_response(&AppError::from(err), true),
        };
    }
    match page::reports_fragment(reports) {
        Ok(html) => respond(StatusCode::OK, HTML, html),
        Err(err) => error_response(&err, false),
    }
}

fn error_response(err: &AppError, wants_json: bool) -> Response<Full<Bytes>> {
    if !wants_json {
        // The page swaps the fragment in whatever the outcome, so user errors stay 200.
        let status = if err.is_user_error() {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        return respond(status, HTML, page::error_fragment(&err.message));
    }
    let body = serde_json::to_vec(err)
        .unwrap_or_else(|_| br#"{"kind":"JsonError","message":"failed to encode error"}"#.to_vec());
    respond(status_for(err.kind), JSON, body)
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MalformedInput
        | ErrorKind::MultipleBlocksUnsupported
        | ErrorKind::SensitiveMaterialSubmitted
        | ErrorKind::UnsupportedPemType
        | ErrorKind::StructureDecodeError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorKind::RenderError | ErrorKind::IoError | ErrorKind::JsonError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn accepts_json<B>(req: &Request<B>) -> bool {
    req.headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(JSON))
}

fn method_not_allowed(allow: &'static str, wants_json: bool) -> Response<Full<Bytes>> {
    let err = AppError::new(ErrorKind::MethodNotAllowed, "method not allowed");
    let mut resp = route_error(&err, wants_json);
    resp.headers_mut().insert(ALLOW, HeaderValue::from_static(allow));
    resp
}

/// Routing failures keep their own status on both the HTML and the JSON path.
fn route_error(err: &AppError, wants_json: bool) -> Response<Full<Bytes>> {
    if wants_json {
        return error_response(err, true);
    }
    respond(status_for(err.kind), HTML, page::error_fragment(&err.message))
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body.into()));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

//! HTTP server for the salary transfer API.
//!
//! # API Endpoints
//!
//! | Method | Path            | Description                                   |
//! |--------|-----------------|-----------------------------------------------|
//! | GET    | `/health`       | Health check                                  |
//! | POST   | `/api/preview`  | Upload payroll sheet, get groups + preview    |
//! | POST   | `/api/convert`  | Upload payroll sheet, download transfer file  |
//! | GET    | `/api/logs`     | SSE stream for real-time logs                 |
//!
//! Both upload endpoints take multipart fields: `file` (required), and
//! optionally `config` (options JSON), `profile`, `debitTemplate`,
//! `creditTemplate`. `/api/convert` also reads repeated `group` fields and
//! `selectAll` / `clearAll` flags.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{conversion_error_response, error_response, PreviewResponse};
use crate::error::{ConversionError, ServerError};
use crate::models::ExportArtifact;
use crate::transform::grouper::next_selection;
use crate::transform::pipeline::{convert_bytes, Conversion, ConvertOptions};
use crate::validation::ColumnProfile;

type ApiError = (StatusCode, Json<Value>);

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Upload size limit in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Build the application router.
pub fn router(config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/preview", post(preview))
        .route("/api/convert", post(convert))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    let app = router(&config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    eprintln!("🚀 Salary transfer server running on http://localhost:{}", config.port);
    eprintln!("   POST /api/preview - Upload payroll sheet, preview transfer records");
    eprintln!("   POST /api/convert - Upload payroll sheet, download transfer file");
    eprintln!("   GET  /api/logs    - SSE log stream");
    eprintln!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Internal(format!("bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "salary-transfer",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "preview": "POST /api/preview",
            "convert": "POST /api/convert",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Parsed multipart upload.
#[derive(Debug, Default)]
struct UploadRequest {
    file: Vec<u8>,
    file_name: Option<String>,
    options: ConvertOptions,
    groups: Vec<String>,
    select_all: bool,
    clear_all: bool,
}

impl UploadRequest {
    /// Whether the caller asked for a per-group export.
    fn wants_groups(&self) -> bool {
        self.select_all || !self.groups.is_empty()
    }

    /// Groups to export, or `None` for a whole-table export.
    ///
    /// Explicit `group` fields go to the exporter as sent, including groups
    /// with no rows. The select/clear flags resolve against `all_groups`.
    fn selection(&self, all_groups: &[String]) -> Option<Vec<String>> {
        if !self.wants_groups() {
            return None;
        }
        if self.select_all || self.clear_all {
            Some(next_selection(
                self.select_all,
                self.clear_all,
                self.groups.as_slice(),
                all_groups,
            ))
        } else {
            Some(self.groups.clone())
        }
    }
}

fn bad_request(message: impl AsRef<str>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(message.as_ref())))
}

fn conversion_error(err: ConversionError) -> ApiError {
    log_error(err.to_string());
    let status = if err.is_user_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(conversion_error_response(&err)))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, ApiError> {
    let mut request = UploadRequest::default();
    let mut file: Option<Vec<u8>> = None;
    let mut config: Option<String> = None;
    let mut profile: Option<String> = None;
    let mut debit: Option<String> = None;
    let mut credit: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            request.file_name = field.file_name().map(|s| s.to_string());
            file = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Read error: {}", e)))?
                    .to_vec(),
            );
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| bad_request(format!("Read error on '{}': {}", name, e)))?;

        match name.as_str() {
            "config" => config = Some(text),
            "profile" => profile = Some(text),
            "debitTemplate" => debit = Some(text),
            "creditTemplate" => credit = Some(text),
            "group" if !text.is_empty() => request.groups.push(text),
            "selectAll" => request.select_all = parse_flag(&text),
            "clearAll" => request.clear_all = parse_flag(&text),
            _ => {}
        }
    }

    request.file = file.ok_or_else(|| bad_request("No file provided"))?;

    // config first, then individual overrides
    if let Some(json) = config {
        request.options = ConvertOptions::from_json(&json)
            .map_err(|e| bad_request(format!("Invalid config: {}", e)))?;
    }
    if let Some(p) = profile {
        request.options.profile = p
            .parse::<ColumnProfile>()
            .map_err(|e| bad_request(e.to_string()))?;
        request.options.required_columns = None;
    }
    if let Some(t) = debit {
        request.options.debit_template = t;
    }
    if let Some(t) = credit {
        request.options.credit_template = t;
    }

    Ok(request)
}

/// Run the conversion off the async runtime.
async fn run_conversion(request: &UploadRequest) -> Result<Conversion, ApiError> {
    let bytes = request.file.clone();
    let file_name = request.file_name.clone();
    let options = request.options.clone();

    tokio::task::spawn_blocking(move || convert_bytes(&bytes, file_name.as_deref(), &options))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_response(&format!("Conversion task failed: {}", e))),
            )
        })?
        .map_err(conversion_error)
}

/// Preview endpoint: groups, first records, warnings.
async fn preview(multipart: Multipart) -> Result<Json<PreviewResponse>, ApiError> {
    let request = read_upload(multipart).await?;
    let conversion = run_conversion(&request).await?;
    Ok(Json(PreviewResponse::from(&conversion)))
}

/// Convert endpoint: returns the spreadsheet or zip archive.
async fn convert(multipart: Multipart) -> Result<Response, ApiError> {
    let request = read_upload(multipart).await?;
    let conversion = run_conversion(&request).await?;

    let artifact = match request.selection(&conversion.groups()) {
        Some(selection) => conversion.export_grouped(selection.as_slice()),
        None => conversion.export_single(),
    }
    .map_err(conversion_error)?;

    Ok(artifact_response(artifact))
}

fn artifact_response(artifact: ExportArtifact) -> Response {
    let content_type = artifact.mime_type().to_string();
    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name());

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(artifact.into_bytes()),
    )
        .into_response()
}

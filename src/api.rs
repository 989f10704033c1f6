//! HTTP surface for the Pre-BEP intake service.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /projects` – Accept a `multipart/form-data` upload (form fields, repeated `inputs`
//!   files, one `output` file), run the intake pipeline, and answer with the project archive.
//! - `GET /metrics` – Observe intake counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Failures map to status codes by pipeline stage: validation `400`, extraction `422`,
//! summarization `502`, and assembly `500`. Error bodies are plain text naming the stage.

use crate::assembly::ArchiveDownload;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{IntakeApi, PipelineError, ProjectRequest, Stage, UploadedFile};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

/// Response header carrying the hex SHA-256 digest of the archive.
pub const ARCHIVE_DIGEST_HEADER: &str = "x-archive-sha256";

/// Build the HTTP router exposing the intake API surface.
///
/// `max_upload_bytes` bounds the size of a whole multipart request.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: IntakeApi + 'static,
{
    Router::new()
        .route("/projects", post(package_project::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

/// Package an uploaded project and stream the resulting archive back.
async fn package_project<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Response, AppError>
where
    S: IntakeApi,
{
    let request = read_project_request(multipart).await?;
    tracing::debug!(
        project = %request.project_name,
        inputs = request.inputs.len(),
        has_output = request.output.is_some(),
        "Received project upload"
    );

    let archive = service.package_project(request).await?;
    let ArchiveDownload {
        file_name,
        content_type,
        bytes,
    } = archive.read_download().map_err(PipelineError::from)?;
    tracing::info!(
        project = %archive.project_name,
        size_bytes = archive.size_bytes,
        entries = archive.entry_count,
        "Project request completed"
    );

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
        (
            HeaderName::from_static(ARCHIVE_DIGEST_HEADER),
            archive.sha256.clone(),
        ),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}

/// Collect multipart fields into a [`ProjectRequest`].
///
/// Unknown fields are ignored. File parts with an empty file name and no content are treated as
/// "no file chosen", which is what browsers send for an untouched file input.
async fn read_project_request(mut multipart: Multipart) -> Result<ProjectRequest, AppError> {
    let mut request = ProjectRequest::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "inputs" | "output" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                let file = UploadedFile::new(file_name, bytes.to_vec());
                if name == "inputs" {
                    request.inputs.push(file);
                } else {
                    request.output = Some(file);
                }
            }
            "project_name" => request.project_name = field.text().await?,
            "client" => request.form.client = field.text().await?,
            "project_type" => request.form.project_type = field.text().await?,
            "location" => request.form.location = field.text().await?,
            "bim_uses" => request.form.bim_uses = field.text().await?,
            "bim_level" => request.form.bim_level = parse_number(&name, &field.text().await?)?,
            "page_count" => request.form.page_count = parse_number(&name, &field.text().await?)?,
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }
    Ok(request)
}

fn parse_number<T: FromStr>(field: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Field '{field}' must be a whole number")))
}

/// Return the current intake counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: IntakeApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "package_project",
                method: "POST",
                path: "/projects",
                description: "Upload input documents (.pdf/.docx) and the final Pre-BEP (.docx) as multipart/form-data. Each document is summarized and the project is returned as a zip archive with an X-Archive-Sha256 header.",
                request_example: Some(json!({
                    "project_name": "hospital-norte",
                    "client": "Servicio de Salud",
                    "project_type": "Hospital",
                    "location": "Sevilla",
                    "bim_level": 2,
                    "bim_uses": "coordinacion, mediciones",
                    "page_count": 6,
                    "inputs": ["memoria.pdf", "pliego.docx"],
                    "output": "prebep.docx"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return intake counters: projects packaged, documents summarized, failed runs.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Pipeline(PipelineError),
    Multipart(MultipartError),
    BadRequest(String),
}

fn status_for(stage: Stage) -> StatusCode {
    match stage {
        Stage::Validation => StatusCode::BAD_REQUEST,
        Stage::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        Stage::Summarization => StatusCode::BAD_GATEWAY,
        Stage::Assembly => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Pipeline(error) => {
                let stage = error.stage();
                (status_for(stage), format!("{} stage failed: {error}", stage.as_str()))
                    .into_response()
            }
            Self::Multipart(error) => error.into_response(),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}

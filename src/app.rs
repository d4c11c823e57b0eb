#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::cell::Record;
use crate::config::AppConfig;
use crate::downloader::{Column, Download, download_csv, download_xlsx};
use crate::sorter::{SortState, sort_by_state, toggle_sort};
use crate::tables::{ReportTable, export_report};

const DEFAULT_CSV_NAME: &str = "export.csv";
const DEFAULT_XLSX_NAME: &str = "export.xlsx";

#[derive(Deserialize)]
struct SortRequest {
    rows: Vec<Record>,
    #[serde(default)]
    sort: SortState,
}

#[derive(Serialize)]
struct SortResponse {
    rows: Vec<Record>,
}

#[derive(Deserialize)]
struct ToggleRequest {
    #[serde(default)]
    state: SortState,
    key: String,
}

#[derive(Deserialize)]
struct ExportRequest {
    filename: Option<String>,
    // `null` entries are dropped
    #[serde(default)]
    columns: Vec<Option<Column<Record>>>,
    rows: Vec<Record>,
    #[serde(default)]
    sort: SortState,
}

#[derive(Deserialize)]
struct ReportExportRequest {
    rows: Vec<Record>,
    #[serde(default)]
    sort: SortState,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

/// Error returned by handlers as a JSON body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::warn!("request failed ({}): {}", self.status, self.message);
        (
            self.status,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(self.message),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for Download {
    fn into_response(self) -> Response {
        let disposition = content_disposition(&self.filename);
        let mut response = (StatusCode::OK, self.bytes).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(self.content_type),
        );
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        response
    }
}

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987 UTF-8 name
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

/// Build the HTTP routes
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sort", post(sort_handler))
        .route("/api/sort/toggle", post(toggle_handler))
        .route("/api/export", post(export_csv_handler))
        .route("/api/export.xlsx", post(export_xlsx_handler))
        .route("/api/reports/:table/columns", get(report_columns))
        .route("/api/reports/:table/export", post(report_export))
        .layer(CorsLayer::permissive())
}

/// Serve the API until the process is stopped
pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router()).await?;
    Ok(())
}

async fn health() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        message: None,
    })
}

async fn sort_handler(Json(request): Json<SortRequest>) -> Json<SortResponse> {
    let rows = sort_by_state(&request.rows, &request.sort);
    Json(SortResponse { rows })
}

async fn toggle_handler(Json(request): Json<ToggleRequest>) -> Json<SortState> {
    Json(toggle_sort(&request.state, &request.key))
}

impl ExportRequest {
    fn columns(&self) -> Vec<Column<Record>> {
        self.columns.iter().flatten().cloned().collect()
    }
}

async fn export_csv_handler(Json(request): Json<ExportRequest>) -> Download {
    let rows = sort_by_state(&request.rows, &request.sort);
    let filename = request.filename.as_deref().unwrap_or(DEFAULT_CSV_NAME);
    download_csv(filename, &request.columns(), &rows)
}

async fn export_xlsx_handler(Json(request): Json<ExportRequest>) -> Result<Download, ApiError> {
    let rows = sort_by_state(&request.rows, &request.sort);
    let filename = request.filename.as_deref().unwrap_or(DEFAULT_XLSX_NAME);
    download_xlsx(filename, &request.columns(), &rows)
        .map_err(|e| ApiError::internal(format!("XLSX export failed: {}", e)))
}

fn parse_table(slug: &str) -> Result<ReportTable, ApiError> {
    slug.parse::<ReportTable>().map_err(ApiError::not_found)
}

async fn report_columns(Path(table): Path<String>) -> Result<Json<Vec<Column<Record>>>, ApiError> {
    let table = parse_table(&table)?;
    Ok(Json(table.columns()))
}

async fn report_export(
    Path(table): Path<String>,
    Json(request): Json<ReportExportRequest>,
) -> Result<Download, ApiError> {
    let table = parse_table(&table)?;
    let today = chrono::Local::now().date_naive();
    Ok(export_report(table, &request.rows, &request.sort, today))
}

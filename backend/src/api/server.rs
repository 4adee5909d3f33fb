//! HTTP Server for parceldesk.
//!
//! Shipment and grouping uploads come back as file attachments; the two
//! ledgers are small JSON resources persisted through the key-value store.
//!
//! # API Endpoints
//!
//! | Method | Path                            | Description                        |
//! |--------|---------------------------------|------------------------------------|
//! | GET    | `/health`                       | Health check                       |
//! | GET    | `/api/tabs`                     | Shipment processing presets        |
//! | POST   | `/api/shipments/{tab}`          | Rewrite a courier CSV (multipart)  |
//! | POST   | `/api/grouping`                 | Group an address workbook          |
//! | GET    | `/api/logs`                     | SSE stream for processing logs     |
//! | GET    | `/api/ledger`                   | Compensation ledger                |
//! | POST   | `/api/ledger/entries`           | Append a blank entry               |
//! | PATCH  | `/api/ledger/entries/{id}`      | Edit one field of an entry         |
//! | DELETE | `/api/ledger/entries/{id}`      | Delete an entry                    |
//! | GET    | `/api/stock`                    | Stock ledger                       |
//! | POST   | `/api/stock/add`                | Correct the inventory              |
//! | POST   | `/api/stock/reset`              | Overwrite the inventory            |
//! | POST   | `/api/stock/deliveries`         | Record a hand-over                 |
//! | DELETE | `/api/stock/deliveries/{id}`    | Delete a hand-over                 |
//! | GET    | `/api/stock/monthly`            | Monthly totals per company         |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{delete, get, patch, post},
    Router,
};
use chrono::{Local, Utc};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::{
    error_response, status_for, tab_list, AmountRequest, EntryUpdate, GroupingHeader, LedgerResponse,
    StockResponse, TabInfo,
};
use crate::config::Settings;
use crate::error::{InputResult, PipelineError, ServerError};
use crate::ledger::{self, CompensationEntry, EntryField};
use crate::models::ShipmentTab;
use crate::stock::{self, DeliveryForm, MonthlyRow, StockState};
use crate::store::{load_or_default, save, FileStore, KeyValueStore, EXPENSE_KEY, STOCK_KEY};
use crate::transform::pipeline::{rewrite_shipment_csv, AddressGrouping, ExportFile, ExportOptions};
use crate::workbook::XlsxBackend;

const GROUPING_SUMMARY_HEADER: HeaderName = HeaderName::from_static("x-grouping-summary");

type ApiError = (StatusCode, Json<Value>);

type ApiResult<T> = Result<T, ApiError>;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Held for the whole read-modify-write of a ledger.
    store: Arc<Mutex<Box<dyn KeyValueStore>>>,
    export: ExportOptions,
}

impl AppState {
    pub fn new(store: Box<dyn KeyValueStore>, export: ExportOptions) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            export,
        }
    }
}

/// Build the router over `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION, GROUPING_SUMMARY_HEADER]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/tabs", get(tabs))
        .route("/api/shipments/{tab}", post(upload_shipment))
        .route("/api/grouping", post(upload_grouping))
        .route("/api/logs", get(sse_logs))
        .route("/api/ledger", get(get_ledger))
        .route("/api/ledger/entries", post(add_ledger_entry))
        .route("/api/ledger/entries/{id}", patch(update_ledger_entry).delete(delete_ledger_entry))
        .route("/api/stock", get(get_stock))
        .route("/api/stock/add", post(add_stock))
        .route("/api/stock/reset", post(reset_stock))
        .route("/api/stock/deliveries", post(record_delivery))
        .route("/api/stock/deliveries/{id}", delete(delete_delivery))
        .route("/api/stock/monthly", get(monthly_stats))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::new(&settings.data_dir);
    let app = router(AppState::new(Box::new(store), settings.export));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    println!("🚀 Parceldesk server running on http://localhost:{}", settings.port);
    println!("   POST /api/shipments/{{tab}} - Rewrite courier CSV");
    println!("   POST /api/grouping         - Group address workbook");
    println!("   GET  /api/logs             - SSE log stream");
    println!("   GET  /health               - Health check");
    println!();
    println!("📁 Ledger data in {}", settings.data_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "parceldesk",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "shipments": "POST /api/shipments/{tab}",
            "grouping": "POST /api/grouping",
            "logs": "GET /api/logs (SSE)",
            "ledger": "GET /api/ledger",
            "stock": "GET /api/stock"
        }
    }))
}

async fn tabs() -> Json<Vec<TabInfo>> {
    Json(tab_list())
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

// =============================================================================
// Uploads
// =============================================================================

async fn upload_shipment(
    State(state): State<AppState>,
    Path(tab_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let tab = ShipmentTab::from_id(&tab_id).ok_or_else(|| api_error(PipelineError::UnknownTab(tab_id)))?;
    let (file_name, bytes) = read_file_field(multipart).await?;

    log_info(format!(
        "📄 Upload for {}: {} ({} bytes)",
        tab.id(),
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let export = rewrite_shipment_csv(&bytes, tab, &state.export).map_err(api_error)?;
    Ok(attachment(export.file, None))
}

async fn upload_grouping(multipart: Multipart) -> ApiResult<Response> {
    let (file_name, bytes) = read_file_field(multipart).await?;

    log_info(format!(
        "📊 Grouping upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let report = AddressGrouping::new(XlsxBackend).run(&bytes).map_err(api_error)?;
    let summary = serde_json::to_string(&GroupingHeader::new(report.summary))
        .map_err(|e| api_error(ServerError::BadRequest(e.to_string())))?;
    Ok(attachment(report.file, Some(summary)))
}

async fn read_file_field(mut multipart: Multipart) -> ApiResult<(Option<String>, Vec<u8>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| api_error(ServerError::BadRequest(format!("Read error: {}", e))))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| api_error(ServerError::BadRequest("No file provided".into())))?;
    Ok((file_name, bytes))
}

fn attachment(file: ExportFile, summary: Option<String>) -> Response {
    let mut response = (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&file.file_name)),
        ],
        file.bytes,
    )
        .into_response();

    if let Some(summary) = summary.and_then(|s| s.parse().ok()) {
        response.headers_mut().insert(GROUPING_SUMMARY_HEADER, summary);
    }
    response
}

/// `attachment` with an ASCII fallback name and the RFC 5987 UTF-8 name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

// =============================================================================
// Compensation ledger
// =============================================================================

async fn get_ledger(State(state): State<AppState>) -> Json<LedgerResponse> {
    let store = state.store.lock().await;
    let entries: Vec<CompensationEntry> = load_or_default(&**store, EXPENSE_KEY);
    Json(entries.into())
}

async fn add_ledger_entry(State(state): State<AppState>) -> ApiResult<Json<LedgerResponse>> {
    let store = state.store.lock().await;
    let entries: Vec<CompensationEntry> = load_or_default(&**store, EXPENSE_KEY);

    let id = next_id(entries.iter().map(|e| e.id));
    let entries = ledger::add_entry(&entries, id);
    save(&**store, EXPENSE_KEY, &entries).map_err(api_error)?;

    log_success(format!("Ledger entry {} added", id));
    Ok(Json(entries.into()))
}

async fn update_ledger_entry(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(update): Json<EntryUpdate>,
) -> ApiResult<Json<LedgerResponse>> {
    let field: EntryField = update.field.parse().map_err(api_error)?;

    let store = state.store.lock().await;
    let entries: Vec<CompensationEntry> = load_or_default(&**store, EXPENSE_KEY);
    let entries = ledger::update_entry(&entries, id, field, &update.value).map_err(api_error)?;
    save(&**store, EXPENSE_KEY, &entries).map_err(api_error)?;

    Ok(Json(entries.into()))
}

async fn delete_ledger_entry(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<LedgerResponse>> {
    let store = state.store.lock().await;
    let entries: Vec<CompensationEntry> = load_or_default(&**store, EXPENSE_KEY);
    let entries = ledger::delete_entry(&entries, id).map_err(api_error)?;
    save(&**store, EXPENSE_KEY, &entries).map_err(api_error)?;

    log_info(format!("Ledger entry {} deleted", id));
    Ok(Json(entries.into()))
}

// =============================================================================
// Stock ledger
// =============================================================================

async fn get_stock(State(state): State<AppState>) -> Json<StockResponse> {
    let store = state.store.lock().await;
    let stock: StockState = load_or_default(&**store, STOCK_KEY);
    Json(stock.into())
}

async fn add_stock(
    State(state): State<AppState>,
    Json(body): Json<AmountRequest>,
) -> ApiResult<Json<StockResponse>> {
    update_stock(&state, |current| stock::add_stock(current, &body.value, Local::now().date_naive())).await
}

async fn reset_stock(
    State(state): State<AppState>,
    Json(body): Json<AmountRequest>,
) -> ApiResult<Json<StockResponse>> {
    update_stock(&state, |current| stock::reset_stock(current, &body.value, Local::now().date_naive())).await
}

async fn record_delivery(
    State(state): State<AppState>,
    Json(form): Json<DeliveryForm>,
) -> ApiResult<Json<StockResponse>> {
    update_stock(&state, |current| {
        let id = next_id(current.records.iter().map(|r| r.id));
        stock::record_delivery(current, &form, id)
    })
    .await
}

async fn delete_delivery(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<StockResponse>> {
    update_stock(&state, |current| stock::delete_delivery(current, id)).await
}

async fn monthly_stats(State(state): State<AppState>) -> Json<Vec<MonthlyRow>> {
    let store = state.store.lock().await;
    let stock: StockState = load_or_default(&**store, STOCK_KEY);
    Json(stock::monthly_stats(&stock))
}

async fn update_stock<F>(state: &AppState, transition: F) -> ApiResult<Json<StockResponse>>
where
    F: FnOnce(&StockState) -> InputResult<StockState>,
{
    let store = state.store.lock().await;
    let current: StockState = load_or_default(&**store, STOCK_KEY);
    let next = transition(&current).map_err(api_error)?;
    save(&**store, STOCK_KEY, &next).map_err(api_error)?;

    log_info(format!("Stock: {} → {}", current.inventory, next.inventory));
    Ok(Json(next.into()))
}

// =============================================================================
// Helpers
// =============================================================================

/// Millisecond timestamp id, bumped past any id already in use.
fn next_id(existing: impl Iterator<Item = u64>) -> u64 {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    match existing.max() {
        Some(max) if max >= now => max + 1,
        _ => now,
    }
}

fn api_error(error: impl Into<ServerError>) -> ApiError {
    let error = error.into();
    let status = status_for(&error);
    if status.is_server_error() {
        log_error(error.to_string());
    }
    (status, Json(error_response(&error.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_encodes_utf8_name() {
        let value = content_disposition("处理结果_2025-01-02.xlsx");
        assert!(value.starts_with("attachment; filename=\"_____2025-01-02.xlsx\""));
        assert!(value.ends_with("filename*=UTF-8''%E5%A4%84%E7%90%86%E7%BB%93%E6%9E%9C_2025-01-02.xlsx"));
    }

    #[test]
    fn test_content_disposition_escapes_quotes_and_spaces() {
        let value = content_disposition("a \"b\".csv");
        assert_eq!(value, "attachment; filename=\"a__b_.csv\"; filename*=UTF-8''a%20%22b%22.csv");
    }

    #[test]
    fn test_content_disposition_ascii_name() {
        let value = content_disposition("processed_tokyo-yotei_1.csv");
        assert_eq!(
            value,
            "attachment; filename=\"processed_tokyo-yotei_1.csv\"; filename*=UTF-8''processed_tokyo-yotei_1.csv"
        );
    }

    #[test]
    fn test_next_id_is_unique() {
        let far_future = u64::MAX / 2;
        assert_eq!(next_id([far_future].into_iter()), far_future + 1);
        assert!(next_id(std::iter::empty()) > 0);
    }

    #[test]
    fn test_api_error_body() {
        let (status, Json(body)) = api_error(PipelineError::UnknownTab("nagoya".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Unknown tab: nagoya");
    }

    #[test]
    fn test_attachment_headers() {
        let file = ExportFile {
            file_name: "a.csv".into(),
            content_type: "text/csv;charset=utf-8",
            bytes: b"x".to_vec(),
        };
        let response = attachment(file, Some("{\"records\":3}".into()));
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv;charset=utf-8");
        assert_eq!(headers[GROUPING_SUMMARY_HEADER], "{\"records\":3}");
    }
}

//! HTTP server: dashboard page, xlsx export, JSON API and health check

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use dashboard_stock::{
    DisplayTable, ListingStatus, QueryNotice, QueryOutcome, StockDashboard, XLSX_CONTENT_TYPE, export_filename,
    write_xlsx,
};
use dashboard_utils::Config;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::form::{QueryParams, today_kst};
use crate::messages::{self, Message};
use crate::view::{PageRenderer, PageView};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Config>,
    pub dashboard: Arc<StockDashboard>,
    pub pages: Arc<PageRenderer>,
}

impl AppState {
    pub fn new(app: Config, dashboard: Arc<StockDashboard>) -> anyhow::Result<Self> {
        Ok(Self {
            app: Arc::new(app),
            dashboard,
            pages: Arc::new(PageRenderer::new()?),
        })
    }
}

#[derive(Serialize)]
struct PricesResponse<'a> {
    #[serde(flatten)]
    outcome: &'a QueryOutcome,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    app: &'a str,
    environment: &'a str,
    listing: ListingStatus,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/export", get(export_handler))
        .route("/api/prices", get(prices_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Registering routes:");
    info!("  GET /?companies=삼성전자,005930&start=2024-01-01&end=2024-12-31");
    info!("  GET /export?companies=..&start=..&end=..");
    info!("  GET /api/prices?companies=..&start=..&end=..");
    info!("  GET /health");

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// `attachment` disposition with an RFC 5987 UTF-8 filename
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

/// GET / - form, and results when `companies` is given
#[instrument(skip(state))]
async fn index_handler(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Response {
    let today = today_kst();
    let (start, end) = params
        .dates(today)
        .unwrap_or_else(|_| crate::form::default_range(today));
    let mut page = PageView::new(
        state.app.app_name.as_str(),
        params.companies(),
        &params.start.clone().unwrap_or_else(|| start.to_string()),
        &params.end.clone().unwrap_or_else(|| end.to_string()),
    );

    if params.is_submitted() {
        match params.to_request(today) {
            Ok(request) => match state.dashboard.query(&request).await {
                Ok(outcome) => page.show_outcome(&request, &outcome),
                Err(e) => {
                    error!(error = %e, "Query failed");
                    page.push_message(Message::error(messages::failure(&e)));
                }
            },
            Err(e) => page.push_message(Message::error(e.to_string())),
        }
    }

    match state.pages.render(&page) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, messages::failure(&e)).into_response()
        }
    }
}

/// GET /export - the query result as an xlsx attachment
#[instrument(skip(state))]
async fn export_handler(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Response {
    let today = today_kst();
    let request = match params.to_request(today) {
        Ok(request) => request,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let outcome = match state.dashboard.query(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Export query failed");
            return (StatusCode::BAD_GATEWAY, messages::failure(&e)).into_response();
        }
    };

    // Name tokens were looked up in an empty listing, so rows may be missing
    if let Some(notice) = outcome
        .notices()
        .iter()
        .find(|n| matches!(n, QueryNotice::ListingUnavailable { .. }))
    {
        warn!("Refusing export without the company listing");
        return (StatusCode::SERVICE_UNAVAILABLE, messages::notice(notice).text).into_response();
    }

    let Some(table) = outcome.table() else {
        let text = match &outcome {
            QueryOutcome::EmptyInput => messages::EMPTY_INPUT,
            _ => messages::NO_DATA,
        };
        return (StatusCode::NOT_FOUND, text).into_response();
    };

    let display = DisplayTable::from_combined(table);
    match write_xlsx(&display, &state.dashboard.config().sheet_name) {
        Ok(bytes) => {
            let filename = export_filename(today);
            info!(rows = display.len(), %filename, "Serving export");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                    (header::CONTENT_DISPOSITION, content_disposition(&filename)),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to write export");
            (StatusCode::INTERNAL_SERVER_ERROR, messages::failure(&e)).into_response()
        }
    }
}

/// GET /api/prices - the query outcome as JSON
#[instrument(skip(state))]
async fn prices_handler(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Response {
    let request = match params.to_request(today_kst()) {
        Ok(request) => request,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
    };

    match state.dashboard.query(&request).await {
        Ok(outcome) => {
            let response = PricesResponse {
                outcome: &outcome,
                messages: messages::for_outcome(&outcome),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Query failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": messages::failure(&e) })),
            )
                .into_response()
        }
    }
}

/// GET /health - liveness and listing cache state
async fn health_handler(State(state): State<AppState>) -> Response {
    let response = HealthResponse {
        status: "ok",
        app: &state.app.app_name,
        environment: &state.app.environment,
        listing: state.dashboard.listing_status().await,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use calamine::{Reader, Xlsx, open_workbook_from_rs};
    use chrono::TimeZone;
    use dashboard_stock::{
        DashboardConfig, DateRange, Listing, ListingEntry, ListingSource, PriceBar, PriceSource,
        StockError, TickerCode, kst,
    };
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    struct StaticListing;

    #[async_trait]
    impl ListingSource for StaticListing {
        async fn fetch_listing(&self) -> dashboard_stock::Result<Listing> {
            Ok(Listing::new(vec![ListingEntry::new(
                "삼성전자",
                TickerCode::parse_literal("005930").unwrap(),
            )]))
        }
    }

    /// Serves the listing once, then fails every refresh
    struct FlakyListing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ListingSource for FlakyListing {
        async fn fetch_listing(&self) -> dashboard_stock::Result<Listing> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                StaticListing.fetch_listing().await
            } else {
                Err(StockError::ListingUnavailable("connection reset".to_string()))
            }
        }
    }

    struct StaticPrices;

    #[async_trait]
    impl PriceSource for StaticPrices {
        async fn fetch_history(
            &self,
            code: &TickerCode,
            _range: DateRange,
        ) -> dashboard_stock::Result<Vec<PriceBar>> {
            match code.as_str() {
                "005930" => Ok((2..=3)
                    .map(|day| PriceBar {
                        timestamp: kst().with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap(),
                        open: 78_000.0,
                        high: 79_000.0,
                        low: 77_000.0,
                        close: 78_500.0,
                        volume: 1_000,
                        change: None,
                    })
                    .collect()),
                "999999" => Err(StockError::ProviderError {
                    code: code.to_string(),
                    reason: "HTTP 500".to_string(),
                }),
                _ => Ok(Vec::new()),
            }
        }
    }

    fn app() -> Router {
        let dashboard = StockDashboard::with_sources(
            DashboardConfig::default(),
            Arc::new(StaticListing),
            Arc::new(StaticPrices),
        );
        router(AppState::new(Config::default(), Arc::new(dashboard)).unwrap())
    }

    async fn send_get(uri: &str) -> Response {
        app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    const QUERY: &str = "companies=%EC%82%BC%EC%84%B1%EC%A0%84%EC%9E%90%2C%20Nonexistent&start=2024-01-01&end=2024-01-31";

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("주가조회_결과_20250307.xlsx"),
            "attachment; filename=\"________20250307.xlsx\"; \
             filename*=UTF-8''%EC%A3%BC%EA%B0%80%EC%A1%B0%ED%9A%8C_%EA%B2%B0%EA%B3%BC_20250307.xlsx"
        );
    }

    #[tokio::test]
    async fn test_index_without_query_shows_form() {
        let response = send_get("/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("name=\"companies\""));
        assert!(!html.contains("<table"));
    }

    #[tokio::test]
    async fn test_index_with_query_shows_results() {
        let response = send_get(&format!("/?{QUERY}")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("<table"));
        assert!(html.contains("78,500"));
        assert!(html.contains("Nonexistent"));
        assert!(html.contains("찾을 수 없습니다."));
    }

    #[tokio::test]
    async fn test_index_reports_provider_failure() {
        let response = send_get("/?companies=999999&start=2024-01-01&end=2024-01-31").await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(html.contains("오류가 발생했습니다: "));
    }

    #[tokio::test]
    async fn test_export_returns_workbook() {
        let response = send_get(&format!("/export?{QUERY}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment;"));

        let bytes = body_bytes(response).await;
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Stock_Data").unwrap();
        assert_eq!(range.rows().count(), 3);
    }

    #[tokio::test]
    async fn test_export_empty_result_is_not_found() {
        let response = send_get("/export?companies=000000&start=2024-01-01&end=2024-01-31").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_without_listing_is_unavailable() {
        let config = DashboardConfig {
            listing_ttl: Duration::ZERO,
            ..DashboardConfig::default()
        };
        let listing = FlakyListing {
            calls: AtomicUsize::new(0),
        };
        let dashboard = StockDashboard::with_sources(config, Arc::new(listing), Arc::new(StaticPrices));
        let app = router(AppState::new(Config::default(), Arc::new(dashboard)).unwrap());
        let uri = "/export?companies=%EC%82%BC%EC%84%B1%EC%A0%84%EC%9E%90&start=2024-01-01&end=2024-01-31";

        let first = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        let text = String::from_utf8(body_bytes(second).await).unwrap();
        assert!(text.starts_with("상장사 명단을 불러오는 데 실패했습니다"));
    }

    #[tokio::test]
    async fn test_prices_json() {
        let response = send_get(&format!("/api/prices?{QUERY}")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "data");
        assert_eq!(body["table"]["records"].as_array().unwrap().len(), 2);
        assert_eq!(body["notices"][0]["kind"], "company_not_found");
        assert_eq!(body["messages"][0]["level"], "warning");
    }

    #[tokio::test]
    async fn test_prices_rejects_reversed_dates() {
        let response = send_get("/api/prices?companies=005930&start=2024-02-01&end=2024-01-01").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let response = send_get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["listing"]["loaded"], false);
    }
}

//! Axum + Askama dashboard for cloud kitchen orders.

pub mod assistant;

use std::sync::Arc;

use askama::Template;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Form, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ckd_core::metrics::{
    assistant_summary, daily_sales, status_distribution, top_restaurants, weekly_sales,
    DashboardMetrics, SalesPoint,
};
use ckd_core::{Diagnostic, DiagnosticLevel, OrderColumn, OrderRecord};
use ckd_ingest::{resolve_source, write_orders_csv, LoadReport, Upload};
use ckd_store::{OrderStore, PgOrderStore, TtlCache};
use ckd_sync::{
    clear_orders, load_orders_from_store, store_row_count, sync_orders, ClearOutcome, ClearRequest,
    KitchenConfig, SyncPipeline,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::assistant::{ask, AssistantConfig};

pub const CRATE_NAME: &str = "ckd-web";
pub const PREVIEW_ROWS: usize = 200;
const STORE_CACHE_KEY: &str = "orders-table";

pub struct AppState {
    pipeline: SyncPipeline,
    assistant: AssistantConfig,
    upload: Mutex<Option<Upload>>,
    csv_cache: TtlCache<LoadReport>,
    db_cache: TtlCache<LoadReport>,
}

impl AppState {
    pub fn new(config: KitchenConfig, store: Arc<dyn OrderStore>) -> Self {
        let assistant = AssistantConfig::from_config(&config);
        let ttl = config.cache_ttl;
        Self {
            pipeline: SyncPipeline::new(config, store),
            assistant,
            upload: Mutex::new(None),
            csv_cache: TtlCache::new(ttl),
            db_cache: TtlCache::new(ttl),
        }
    }

    pub fn with_assistant(mut self, assistant: AssistantConfig) -> Self {
        self.assistant = assistant;
        self
    }

    fn store(&self) -> Arc<dyn OrderStore> {
        self.pipeline.store()
    }

    /// Current CSV table, cached per source fingerprint.
    async fn csv_report(&self) -> LoadReport {
        let upload = self.upload.lock().await.clone();
        let key = resolve_source(upload.as_ref(), Some(self.pipeline.config().csv_path.as_path()))
            .map(|source| source.key())
            .unwrap_or_else(|| "missing".to_string());
        self.csv_cache
            .get_or_load(&key, || async move {
                match self.pipeline.load_csv(upload).await {
                    Ok(report) => report,
                    Err(err) => LoadReport::empty(Diagnostic::error(format!("Error loading CSV: {err:#}"))),
                }
            })
            .await
    }

    async fn db_report(&self) -> LoadReport {
        let store = self.store();
        self.db_cache
            .get_or_load(STORE_CACHE_KEY, || async move { load_orders_from_store(store.as_ref()).await })
            .await
    }

    async fn report_for(&self, source: DataSource) -> LoadReport {
        match source {
            DataSource::Csv => self.csv_report().await,
            DataSource::Db => self.db_report().await,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DataSource {
    #[default]
    Csv,
    Db,
}

impl DataSource {
    fn as_str(self) -> &'static str {
        match self {
            DataSource::Csv => "csv",
            DataSource::Db => "db",
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct SourceQuery {
    #[serde(default)]
    source: DataSource,
}

#[derive(Debug, Deserialize, Default)]
struct UploadQuery {
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ClearForm {
    confirm: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AssistantForm {
    #[serde(default)]
    question: String,
}

/// Pre-formatted diagnostic for templates.
#[derive(Debug, Clone)]
struct Notice {
    level: &'static str,
    message: String,
}

impl From<&Diagnostic> for Notice {
    fn from(diagnostic: &Diagnostic) -> Self {
        let level = match diagnostic.level {
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Success => "success",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        };
        Self {
            level,
            message: diagnostic.message.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    notice: Option<Notice>,
    source: &'static str,
    total_orders: String,
    total_sales: String,
    avg_rating: String,
    completion_rate: String,
    delivered_orders: String,
    cancelled_orders: String,
    avg_kpt: String,
    avg_rider_wait: String,
}

#[derive(Template)]
#[template(path = "orders.html")]
struct OrdersTemplate {
    notice: Option<Notice>,
    title: &'static str,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    shown: usize,
    total: usize,
    download: bool,
}

#[derive(Template)]
#[template(path = "sync.html")]
struct SyncTemplate {
    notice: Option<Notice>,
    csv_rows: usize,
    stored_rows: String,
    inserted: String,
    skipped: String,
}

#[derive(Template)]
#[template(path = "clear.html")]
struct ClearTemplate {
    notice: Option<Notice>,
}

#[derive(Template)]
#[template(path = "assistant.html")]
struct AssistantTemplate {
    notice: Option<Notice>,
    summary: String,
    question: String,
    answer: String,
}

#[derive(Template)]
#[template(path = "message.html")]
struct MessageTemplate {
    notice: Option<Notice>,
    title: &'static str,
}

pub fn app(state: AppState) -> Router {
    let upload_limit = state.pipeline.config().max_upload_bytes;
    Router::new()
        .route("/", get(index_handler))
        .route("/charts/daily-sales", get(daily_sales_chart_handler))
        .route("/charts/weekly-sales", get(weekly_sales_chart_handler))
        .route("/charts/status", get(status_chart_handler))
        .route("/charts/top-restaurants", get(top_restaurants_chart_handler))
        .route("/orders/csv", get(csv_preview_handler))
        .route("/orders/csv/download", get(csv_download_handler))
        .route("/orders/db", get(db_preview_handler))
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/refresh", post(refresh_handler))
        .route("/sync", get(sync_page_handler).post(sync_run_handler))
        .route("/clear", get(clear_page_handler).post(clear_run_handler))
        .route("/assistant", get(assistant_page_handler).post(assistant_ask_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(config: KitchenConfig) -> anyhow::Result<()> {
    let port = config.web_port;
    let store = Arc::new(PgOrderStore::new(config.database_url.clone()));
    let state = AppState::new(config, store);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "dashboard listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    serve(KitchenConfig::from_env()).await
}

async fn index_handler(State(state): State<Arc<AppState>>, Query(query): Query<SourceQuery>) -> Response {
    let report = state.report_for(query.source).await;
    let metrics = DashboardMetrics::compute(report.records());
    render_html(IndexTemplate {
        notice: Some(Notice::from(&report.diagnostic)),
        source: query.source.as_str(),
        total_orders: metrics.total_orders.to_string(),
        total_sales: format!("{:.2}", metrics.total_sales),
        avg_rating: metrics
            .avg_rating
            .map(|r| format!("{r:.2}/5.0"))
            .unwrap_or_else(|| "n/a".into()),
        completion_rate: format!("{:.1}%", metrics.completion_rate),
        delivered_orders: metrics.delivered_orders.to_string(),
        cancelled_orders: metrics.cancelled_orders.to_string(),
        avg_kpt: minutes(metrics.avg_kpt_minutes),
        avg_rider_wait: minutes(metrics.avg_rider_wait_minutes),
    })
}

fn minutes(value: Option<f64>) -> String {
    value.map(|m| format!("{m:.1} min")).unwrap_or_else(|| "n/a".into())
}

async fn daily_sales_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SourceQuery>,
) -> Response {
    let report = state.report_for(query.source).await;
    let points = daily_sales(report.records());
    Json(xy_chart("scatter", "Daily Sales Trend", &points)).into_response()
}

async fn weekly_sales_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SourceQuery>,
) -> Response {
    let report = state.report_for(query.source).await;
    let points = weekly_sales(report.records());
    Json(xy_chart("bar", "Weekly Sales", &points)).into_response()
}

async fn status_chart_handler(State(state): State<Arc<AppState>>, Query(query): Query<SourceQuery>) -> Response {
    let report = state.report_for(query.source).await;
    let counts = status_distribution(report.records());
    let labels = counts.iter().map(|c| c.status.clone()).collect::<Vec<_>>();
    let values = counts.iter().map(|c| c.count as i64).collect::<Vec<_>>();
    Json(serde_json::json!({
        "data": [{
            "type": "pie",
            "labels": labels,
            "values": values
        }],
        "layout": {
            "title": "Order Status Distribution",
            "paper_bgcolor": "#ffffff"
        }
    }))
    .into_response()
}

async fn top_restaurants_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SourceQuery>,
) -> Response {
    let report = state.report_for(query.source).await;
    let points = top_restaurants(report.records(), 10);
    Json(xy_chart("bar", "Top 10 Restaurants by Sales", &points)).into_response()
}

fn xy_chart(kind: &str, title: &str, points: &[SalesPoint]) -> serde_json::Value {
    let x = points.iter().map(|p| p.label.clone()).collect::<Vec<_>>();
    let y = points.iter().map(|p| p.total_sales).collect::<Vec<_>>();
    serde_json::json!({
        "data": [{
            "type": kind,
            "x": x,
            "y": y,
            "marker": {"color": "#f97316"}
        }],
        "layout": {
            "title": title,
            "paper_bgcolor": "#ffffff",
            "plot_bgcolor": "#f8fafc"
        }
    })
}

async fn csv_preview_handler(State(state): State<Arc<AppState>>) -> Response {
    let report = state.csv_report().await;
    let mut columns = Vec::new();
    for column in report.table.columns.iter().filter_map(|h| OrderColumn::from_header(h)) {
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    render_html(preview("Orders from CSV", &report, &columns, true))
}

async fn db_preview_handler(State(state): State<Arc<AppState>>) -> Response {
    let report = state.db_report().await;
    render_html(preview("Stored orders", &report, &OrderColumn::ALL, false))
}

fn preview(title: &'static str, report: &LoadReport, columns: &[OrderColumn], download: bool) -> OrdersTemplate {
    let rows = report
        .records()
        .iter()
        .take(PREVIEW_ROWS)
        .map(|record| preview_row(record, columns))
        .collect::<Vec<_>>();
    OrdersTemplate {
        notice: Some(Notice::from(&report.diagnostic)),
        title,
        headers: columns.iter().map(|c| c.header().to_string()).collect(),
        shown: rows.len(),
        total: report.records().len(),
        rows,
        download: download && !report.is_empty(),
    }
}

fn preview_row(record: &OrderRecord, columns: &[OrderColumn]) -> Vec<String> {
    columns.iter().map(|c| record.display_value(*c)).collect()
}

async fn csv_download_handler(State(state): State<Arc<AppState>>) -> Response {
    let report = state.csv_report().await;
    if report.is_empty() {
        return (StatusCode::NOT_FOUND, Html(report.diagnostic.message)).into_response();
    }
    match write_orders_csv(report.records()) {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"orders.csv\""),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => server_error(err),
    }
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        let notice = Notice::from(&Diagnostic::warning("Uploaded file is empty."));
        let mut resp = render_html(MessageTemplate {
            notice: Some(notice),
            title: "Upload",
        });
        *resp.status_mut() = StatusCode::BAD_REQUEST;
        return resp;
    }
    let upload = Upload::new(query.name.unwrap_or_else(|| "upload.csv".to_string()), body.to_vec());
    info!(name = %upload.name, bytes = upload.bytes.len(), "stored upload");
    *state.upload.lock().await = Some(upload);
    state.csv_cache.invalidate().await;

    let report = state.csv_report().await;
    render_html(MessageTemplate {
        notice: Some(Notice::from(&report.diagnostic)),
        title: "Upload",
    })
}

async fn refresh_handler(State(state): State<Arc<AppState>>) -> Response {
    state.csv_cache.invalidate().await;
    state.db_cache.invalidate().await;
    render_html(MessageTemplate {
        notice: Some(Notice::from(&Diagnostic::info("Cached data cleared."))),
        title: "Refresh",
    })
}

async fn sync_page(state: &AppState, notice: Option<Notice>, inserted: String, skipped: String) -> Response {
    let csv_rows = state.csv_report().await.records().len();
    let store = state.store();
    let stored_rows = match store_row_count(store.as_ref()).await {
        Ok(count) => count.to_string(),
        Err(diagnostic) => {
            warn!(%diagnostic, "row count unavailable");
            "unavailable".to_string()
        }
    };
    render_html(SyncTemplate {
        notice,
        csv_rows,
        stored_rows,
        inserted,
        skipped,
    })
}

async fn sync_page_handler(State(state): State<Arc<AppState>>) -> Response {
    sync_page(&state, None, String::new(), String::new()).await
}

async fn sync_run_handler(State(state): State<Arc<AppState>>) -> Response {
    let csv = state.csv_report().await;
    let store = state.store();
    let report = sync_orders(store.as_ref(), csv.records()).await;
    state.db_cache.invalidate().await;
    sync_page(
        &state,
        Some(Notice::from(&report.diagnostic)),
        report.outcome.inserted.to_string(),
        report.outcome.skipped.to_string(),
    )
    .await
}

async fn clear_page_handler() -> Response {
    render_html(ClearTemplate { notice: None })
}

async fn clear_run_handler(State(state): State<Arc<AppState>>, Form(form): Form<ClearForm>) -> Response {
    let request = ClearRequest::from_confirmation(form.confirm.as_deref() == Some("yes"));
    let store = state.store();
    let outcome = clear_orders(store.as_ref(), request).await;
    if matches!(outcome, ClearOutcome::Cleared { .. }) {
        state.db_cache.invalidate().await;
    }
    let mut resp = render_html(ClearTemplate {
        notice: Some(Notice::from(&outcome.diagnostic())),
    });
    if matches!(outcome, ClearOutcome::Failed { .. }) {
        *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    }
    resp
}

async fn assistant_page_handler(State(state): State<Arc<AppState>>) -> Response {
    let report = state.db_report().await;
    render_html(AssistantTemplate {
        notice: None,
        summary: assistant_summary(report.records()),
        question: String::new(),
        answer: String::new(),
    })
}

async fn assistant_ask_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AssistantForm>,
) -> Response {
    let report = state.db_report().await;
    let summary = assistant_summary(report.records());
    let reply = ask(&state.assistant, &summary, &form.question).await;
    render_html(AssistantTemplate {
        notice: Some(Notice::from(&reply.diagnostic())),
        summary,
        question: form.question,
        answer: reply.text(),
    })
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {}", err)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use ckd_core::normalize_order_placed_at;
    use ckd_store::MemoryOrderStore;
    use http_body_util::BodyExt;
    use std::path::Path;
    use std::time::Duration;
    use tower::ServiceExt;

    const CSV: &str = "\
Restaurant name,Order ID,Order Placed At,Order Status,Total,Rating
Biryani Box,A1,\"07:04 PM, September 01 2025\",Delivered,400,4
Wrap Co,A2,\"01:00 PM, September 03 2025\",Cancelled,150,
";

    fn config(csv_path: &Path) -> KitchenConfig {
        let mut config = KitchenConfig::from_env();
        config.csv_path = csv_path.to_path_buf();
        config.cache_ttl = Duration::from_secs(300);
        config.max_upload_bytes = ckd_sync::DEFAULT_MAX_UPLOAD_BYTES;
        config
    }

    fn state_with(dir: &tempfile::TempDir, store: Arc<MemoryOrderStore>) -> AppState {
        let path = dir.path().join("order.csv");
        std::fs::write(&path, CSV).unwrap();
        AppState::new(config(&path), store)
    }

    async fn body_text(resp: Response) -> String {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn form_req(uri: &str, form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn handler_smoke_get_index() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(state_with(&dir, Arc::new(MemoryOrderStore::new())));
        let resp = app.oneshot(get_req("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("Cloud Kitchen Dashboard"));
        assert!(text.contains("550.00"));
        assert!(text.contains("50.0%"));
    }

    #[tokio::test]
    async fn charts_are_plotly_json() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(state_with(&dir, Arc::new(MemoryOrderStore::new())));
        for uri in [
            "/charts/daily-sales",
            "/charts/weekly-sales",
            "/charts/status",
            "/charts/top-restaurants?source=db",
        ] {
            let resp = app.clone().oneshot(get_req(uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            assert_eq!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap(), "application/json");
        }

        let resp = app.oneshot(get_req("/charts/daily-sales")).await.unwrap();
        let chart: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(chart["data"][0]["x"][0], "2025-09-01");
        assert_eq!(chart["data"][0]["y"][0], 400.0);
    }

    #[tokio::test]
    async fn upload_takes_precedence_over_the_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(state_with(&dir, Arc::new(MemoryOrderStore::new())));
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload?name=extra.csv")
                    .body(Body::from("Order ID,Restaurant name\nZ9,Noodle Bar\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Uploaded file loaded: extra.csv"));

        let text = body_text(app.clone().oneshot(get_req("/orders/csv")).await.unwrap()).await;
        assert!(text.contains("Noodle Bar"));
        assert!(!text.contains("Biryani Box"));

        let resp = app.oneshot(get_req("/orders/csv/download")).await.unwrap();
        assert_eq!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap(), "text/csv; charset=utf-8");
        assert!(body_text(resp).await.contains("Z9"));
    }

    #[tokio::test]
    async fn uploads_above_the_default_body_limit_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(state_with(&dir, Arc::new(MemoryOrderStore::new())));

        let mut csv = String::from("Order ID,Restaurant name,Instructions\n");
        let mut n = 0;
        while csv.len() <= 3 * 1024 * 1024 {
            csv.push_str(&format!("B{n},Noodle Bar,Leave at the door and ring the bell twice\n"));
            n += 1;
        }
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload?name=big.csv")
                    .body(Body::from(csv))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Uploaded file loaded: big.csv"));
    }

    #[tokio::test]
    async fn uploads_above_the_configured_limit_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.csv");
        let mut config = config(&path);
        config.max_upload_bytes = 16;
        let app = app(AppState::new(config, Arc::new(MemoryOrderStore::new())));
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload?name=small.csv")
                    .body(Body::from("Order ID\nA1\nA2\nA3\nA4\n"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn sync_twice_then_clear_with_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryOrderStore::new());
        let app = app(state_with(&dir, store.clone()));

        let text = body_text(app.clone().oneshot(form_req("/sync", "")).await.unwrap()).await;
        assert!(text.contains("Inserted: 2, Skipped (duplicates): 0"));
        let text = body_text(app.clone().oneshot(form_req("/sync", "")).await.unwrap()).await;
        assert!(text.contains("Inserted: 0, Skipped (duplicates): 2"));
        assert_eq!(store.count().await.unwrap(), 2);

        let text = body_text(app.clone().oneshot(get_req("/orders/db")).await.unwrap()).await;
        assert!(text.contains("Wrap Co"));

        app.clone().oneshot(form_req("/clear", "")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let resp = app.clone().oneshot(form_req("/clear", "confirm=yes")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(store.count().await.unwrap(), 0);
        let text = body_text(app.oneshot(get_req("/orders/db")).await.unwrap()).await;
        assert!(!text.contains("Wrap Co"));
    }

    #[tokio::test]
    async fn missing_csv_renders_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(config(&dir.path().join("absent.csv")), Arc::new(MemoryOrderStore::new()));
        let resp = app(state).oneshot(get_req("/orders/csv")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("No CSV file found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn assistant_receives_the_stored_summary() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryOrderStore::with_rows(vec![OrderRecord {
            order_id: Some("A1".into()),
            restaurant_name: Some("Biryani Box".into()),
            order_placed_at: normalize_order_placed_at("07:04 PM, September 01 2025"),
            total: Some(300.0),
            ..Default::default()
        }]));
        let state = state_with(&dir, store).with_assistant(AssistantConfig::new(
            "sh",
            vec!["-c".into(), "cat".into()],
            Duration::from_secs(10),
        ));
        let text = body_text(app(state).oneshot(form_req("/assistant", "question=Top+dish%3F")).await.unwrap()).await;
        assert!(text.contains("Total Orders: 1"));
        assert!(text.contains("User Question: Top dish?"));
    }
}

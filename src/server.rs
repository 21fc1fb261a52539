use askama::Template;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::infra::spreadsheet::{
    export_file_name, read_table_from_bytes, to_xlsx_bytes, XLSX_CONTENT_TYPE,
};
use crate::observability;
use crate::pipeline::PipelineOrchestrator;
use crate::templates::IndexTemplate;

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".csv"];

pub const MSG_NO_FILE: &str = "Пожалуйста, выберите Excel-файл.";
pub const MSG_UNSUPPORTED: &str = "Поддерживаются только файлы .xlsx, .xls и .csv";
pub const MSG_NOTHING_TO_DOWNLOAD: &str =
    "Нет обработанного файла. Сначала загрузите и обработайте Excel.";

/// Last export, kept for `/download`. One user at a time.
#[derive(Debug, Clone)]
struct ProcessedFile {
    name: String,
    bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<PipelineOrchestrator>,
    last_file: Arc<Mutex<Option<ProcessedFile>>>,
}

impl AppState {
    pub fn new(orchestrator: PipelineOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            last_file: Arc::new(Mutex::new(None)),
        }
    }
}

fn page(status: StatusCode, messages: &[String], preview_html: Option<&str>) -> Response {
    let template = IndexTemplate { messages, preview_html };
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template rendering failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template rendering failed").into_response()
        }
    }
}

async fn index() -> Response {
    page(StatusCode::OK, &[], None)
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                    Err(e) => {
                        warn!("Failed to read upload: {}", e);
                        return page(StatusCode::BAD_REQUEST, &[MSG_NO_FILE.to_string()], None);
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart body: {}", e);
                return page(StatusCode::BAD_REQUEST, &[MSG_NO_FILE.to_string()], None);
            }
        }
    }

    let Some((file_name, bytes)) = upload.filter(|(name, _)| !name.is_empty()) else {
        return page(StatusCode::BAD_REQUEST, &[MSG_NO_FILE.to_string()], None);
    };
    let lower = file_name.to_lowercase();
    if !ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return page(StatusCode::BAD_REQUEST, &[MSG_UNSUPPORTED.to_string()], None);
    }

    match process_upload(&state, &file_name, bytes).await {
        Ok((message, preview_html)) => page(StatusCode::OK, &[message], Some(&preview_html)),
        Err(e) => {
            error!(file = %file_name, "Processing failed: {}", e);
            page(
                StatusCode::UNPROCESSABLE_ENTITY,
                &[format!("Ошибка обработки файла: {}", e)],
                None,
            )
        }
    }
}

async fn process_upload(state: &AppState, file_name: &str, bytes: Vec<u8>) -> Result<(String, String)> {
    let table = read_table_from_bytes(file_name, bytes)?;
    let output = state.orchestrator.run(&table).await?;
    let export = to_xlsx_bytes(&output.export_table())?;

    *state.last_file.lock().await = Some(ProcessedFile {
        name: export_file_name(file_name),
        bytes: export,
    });

    info!(file = %file_name, rows = output.summary.rows, "Upload processed");
    let message = format!(
        "Файл успешно обработан. Найдены столбцы: '{}' (до), '{}' (после).",
        output.columns.before.name, output.columns.after.name
    );
    Ok((message, output.preview.to_html()?))
}

/// RFC 5987 encoding for non-ASCII download names
fn encode_file_name(name: &str) -> String {
    name.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}

async fn download(State(state): State<AppState>) -> Response {
    let Some(file) = state.last_file.lock().await.clone() else {
        return page(StatusCode::NOT_FOUND, &[MSG_NOTHING_TO_DOWNLOAD.to_string()], None);
    };
    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename*=UTF-8''{}", encode_file_name(&file.name)),
        ),
    ];
    (headers, file.bytes).into_response()
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "photo_intervals",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_text() -> Response {
    match observability::render() {
        Some(body) => body.into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// Create the HTTP router with all routes
pub fn create_server(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(upload))
        .route("/download", get(download))
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    if let Err(e) = observability::init() {
        warn!("Metrics disabled: {}", e);
    }
    let app = create_server(state);
    info!("Listening on http://{}", addr);
    hyper::Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{FetchFailure, HttpClientPort};
    use crate::config::Config;
    use crate::types::Cell;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct EchoHttp;

    #[async_trait]
    impl HttpClientPort for EchoHttp {
        async fn final_url(&self, url: &str) -> std::result::Result<String, FetchFailure> {
            Ok(url.to_string())
        }
    }

    fn app() -> Router {
        let orchestrator = PipelineOrchestrator::new(Arc::new(EchoHttp), &Config::default());
        create_server(AppState::new(orchestrator))
    }

    fn multipart_request(file_name: &str, content: &str) -> Request<Body> {
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
            b = boundary,
            f = file_name,
            c = content
        );
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_renders_upload_form() {
        let resp = app().oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("enctype=\"multipart/form-data\""));
    }

    #[tokio::test]
    async fn download_without_processed_file() {
        let resp = app()
            .oneshot(Request::get("/download").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains(MSG_NOTHING_TO_DOWNLOAD));
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let resp = app().oneshot(multipart_request("notes.txt", "hello")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains(MSG_UNSUPPORTED));
    }

    #[tokio::test]
    async fn detection_failure_is_reported() {
        let resp = app().oneshot(multipart_request("data.csv", "a,b\n1,2\n")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(resp).await.contains("Ошибка обработки файла: Не найдены два столбца"));
    }

    #[tokio::test]
    async fn upload_then_download() {
        let app = app();
        let csv = "Фото ДО,Фото ПОСЛЕ\nhttps://h/saved-20240101_100000,https://h/saved-20240101_112500\n";
        let resp = app.clone().oneshot(multipart_request("report.csv", csv)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("Фото ДО"));
        assert!(!html.contains("'Фото ДО'"), "flash text must be escaped");
        assert!(html.contains("<td>1 ч 25 мин</td>"));
        assert!(html.contains("href=\"/download\""));

        let resp = app
            .oneshot(Request::get("/download").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename*=UTF-8''report_"));
        assert!(disposition.ends_with(".xlsx"));

        let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        let exported = read_table_from_bytes("download.xlsx", bytes.to_vec()).unwrap();
        assert_eq!(
            exported.headers(),
            &["Фото ДО", "Фото ПОСЛЕ", "Дата_время_до", "Дата_время_после", "Интервал_мин"]
        );
        let row = &exported.rows()[0];
        assert!(matches!(row[2], Cell::DateTime(_)));
        assert_eq!(row[4], Cell::from("1 ч 25 мин"));
    }

    #[test]
    fn file_names_are_percent_encoded() {
        assert_eq!(encode_file_name("a b.csv"), "a%20b.csv");
        assert_eq!(encode_file_name("ж.csv"), "%D0%B6.csv");
    }
}

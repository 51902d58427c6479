use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Router,
    Json,
    http::Method,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use crate::{
    AppState,
    error::AppError,
    models::{CategoryFilter, TaggedSheet, TotalRowHints},
    services::{
        cache::ReportCache,
        dashboard::{build_report, extract_all, DashboardReport},
        workbook::{self, SheetMapping},
    },
};
use tower_http::cors::{CorsLayer, Any};

/// Room for multipart boundaries and the small text fields next to the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes(max_file_size: usize) -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/census/extract", post(extract_sheets))
        .route("/census/upload", post(upload_workbook))
        .route("/census/analyze", post(analyze_workbook))
        .layer(DefaultBodyLimit::max(max_file_size + MULTIPART_OVERHEAD))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    sheets: Vec<TaggedSheet>,
    date: Option<String>,
    #[serde(default)]
    category: CategoryFilter,
    hints: Option<TotalRowHints>,
}

#[derive(Debug, Deserialize)]
pub struct FileInfo {
    #[serde(rename = "type")]
    file_type: String,
    signed_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    file: FileInfo,
    date: Option<String>,
    #[serde(default)]
    category: CategoryFilter,
    #[serde(default)]
    mapping: SheetMapping,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn extract_sheets(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<DashboardReport>, AppError> {
    tracing::info!("Extracting {} tagged sheets", request.sheets.len());
    let hints = request.hints.unwrap_or(state.config.total_rows);

    let reports = extract_all(&request.sheets, &hints)?;
    let report = build_report(reports, non_empty(request.date).as_deref(), request.category)?;
    Ok(Json(report))
}

async fn upload_workbook(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DashboardReport>, AppError> {
    let mut file: Option<Bytes> = None;
    let mut date = None;
    let mut category = CategoryFilter::default();
    let mut mapping = SheetMapping::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string).unwrap_or_default();
        match name.as_str() {
            "file" => {
                tracing::info!("Receiving workbook '{}'", field.file_name().unwrap_or("unnamed"));
                file = Some(field.bytes().await?);
            }
            "date" => date = Some(field.text().await?),
            "category" => category = field.text().await?.parse()?,
            "mapping" => mapping = serde_json::from_str(&field.text().await?)?,
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let file = file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    let report = workbook_report(&state, file, mapping, non_empty(date), category).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
async fn analyze_workbook(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<DashboardReport>, AppError> {
    let start = std::time::Instant::now();
    tracing::info!(
        "Processing file type: {}, URL length: {}",
        request.file.file_type,
        request.file.signed_url.len()
    );

    if !request.file.file_type.to_lowercase().contains("xlsx") {
        tracing::error!("Unsupported file type: {}", request.file.file_type);
        return Err(AppError::InvalidInput("Only XLSX files are supported".to_string()));
    }

    let file_data = workbook::load_file_from_url(
        &state.http,
        &request.file.signed_url,
        state.config.max_file_size,
    )
    .await?;
    tracing::info!("File downloaded, size: {}KB, took: {:?}", file_data.len() / 1024, start.elapsed());

    let report = workbook_report(
        &state,
        file_data,
        request.mapping,
        non_empty(request.date),
        request.category,
    )
    .await?;
    tracing::info!("Total processing completed in {:?}", start.elapsed());
    Ok(Json(report))
}

async fn workbook_report(
    state: &AppState,
    data: Bytes,
    mapping: SheetMapping,
    date: Option<String>,
    category: CategoryFilter,
) -> Result<DashboardReport, AppError> {
    if data.len() > state.config.max_file_size {
        return Err(AppError::InvalidInput(format!(
            "File exceeds {} bytes",
            state.config.max_file_size
        )));
    }

    let hints = state.config.total_rows;
    let key = ReportCache::key(&data, &mapping, &hints);
    let reports = match state.cache.get(key) {
        Some(reports) => reports,
        None => {
            let reports = tokio::task::spawn_blocking(move || {
                let sheets = workbook::decode_workbook(data)?;
                let tagged = mapping.resolve(sheets)?;
                extract_all(&tagged, &hints)
            })
            .await??;
            state.cache.insert(key, reports)
        }
    };

    build_report(reports.as_ref().clone(), date.as_deref(), category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::Category;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::default()))
    }

    fn request(json: &str) -> ExtractRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_extract_sheets_flat_and_banded() {
        let body = request(
            r#"{
                "sheets": [
                    {"category": "opd_time", "rows": [
                        ["Code", "Clinic", "2569-01-01", "2569-01-02"],
                        ["C1", "Ward A", 10, 12],
                        ["Total", "รวม", 120, 135]
                    ]},
                    {"category": "ipd", "rows": [
                        ["Ward", "Type", "Bed", "", "2569-01-01", "", ""],
                        ["", "", "", "", "คงเหลือ", "รับใหม่", "รับย้าย"],
                        ["W1", "ICU", 8, null, 2, 1, 0]
                    ]}
                ],
                "hints": {"opd_time": 3, "opd_special": 1, "opd_premium": 1}
            }"#,
        );

        let Json(report) = tokio_test::block_on(extract_sheets(State(state()), Json(body))).unwrap();

        assert_eq!(report.categories.len(), 2);
        assert_eq!(report.categories[0].result.total_today, 135);
        assert_eq!(report.categories[1].category, Category::Ipd);
        assert_eq!(report.categories[1].result.total_today, 3);

        let snapshot = report.snapshot.unwrap();
        assert_eq!(snapshot.date, "2569-01-02");
        assert_eq!(snapshot.total_patients, 135);
    }

    #[test]
    fn test_extract_sheets_selected_date() {
        let body = request(
            r#"{
                "sheets": [{"category": "opd_special", "rows": [
                    ["Code", "Clinic", "2569-01-01", "2569-01-02"],
                    ["Total", "รวม", 7, 9]
                ]}],
                "date": "2569-01-01",
                "category": "opd_special"
            }"#,
        );

        let Json(report) = tokio_test::block_on(extract_sheets(State(state()), Json(body))).unwrap();
        assert_eq!(report.snapshot.unwrap().total_patients, 7);
    }

    #[test]
    fn test_extract_sheets_rejects_unknown_category() {
        let parsed = serde_json::from_str::<ExtractRequest>(
            r#"{"sheets": [{"category": "radiology", "rows": []}]}"#,
        );
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn test_workbook_report_rejects_oversized_file() {
        let mut config = Config::default();
        config.max_file_size = 4;
        let state = AppState::new(config);

        let result = workbook_report(
            &state,
            Bytes::from_static(b"too large"),
            SheetMapping::default(),
            None,
            CategoryFilter::All,
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_workbook_report_rejects_non_workbook() {
        let result = workbook_report(
            &AppState::new(Config::default()),
            Bytes::from_static(b"plain text"),
            SheetMapping::default(),
            None,
            CategoryFilter::All,
        )
        .await;
        assert!(matches!(result, Err(AppError::FileProcessingError(_))));
    }

    #[test]
    fn test_analyze_request_defaults() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{"file": {"type": "xlsx", "signed_url": "https://example.com/census.xlsx"}}"#,
        )
        .unwrap();
        assert!(request.mapping.is_positional());
        assert_eq!(request.category, CategoryFilter::All);
        assert!(request.date.is_none());
    }
}

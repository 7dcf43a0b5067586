use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::JsonRejection},
    response::Html,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::census::{self, DatasetFilters, RACE, TabularSource, apply_filters};
use crate::config::ServerConfig;
use crate::engine::{
    Counts, CountrySummary, EducationSummary, ReportOptions, StatisticsResult, age_distribution,
    country_analysis, distribution_count, education_breakdown, full_report,
};
use crate::processor::dataset::Dataset;
use crate::server::{
    AppState,
    error::{ApiError, DATASET_NOT_FOUND},
};

/// Multipart field carrying the uploaded CSV
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub stats: StatisticsResult,
}

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub success: bool,
    pub filtered_count: usize,
    pub stats: StatisticsResult,
}

/// Runs load-and-compute work off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
}

/// Loads `config.dataset_path`. A missing file and a file without records are both 404.
fn load_default(config: &ServerConfig) -> Result<Dataset, ApiError> {
    let dataset = census::load(TabularSource::Path(config.dataset_path.clone()))
        .map_err(ApiError::dataset)?;
    if dataset.is_empty() {
        return Err(ApiError::not_found(DATASET_NOT_FOUND));
    }
    debug!(rows = dataset.len(), path = %config.dataset_path.display(), "default dataset loaded");
    Ok(dataset)
}

/// Same as `run_blocking`, over a freshly loaded default dataset
async fn with_default<T, F>(state: &AppState, f: F) -> Result<Json<T>, ApiError>
where
    F: FnOnce(&Dataset, &ServerConfig) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let config = Arc::clone(&state.config);
    run_blocking(move || {
        let dataset = load_default(&config)?;
        f(&dataset, &config)
    })
    .await
    .map(Json)
}

fn is_csv(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("csv"))
}

/// Validates and summarizes an uploaded file. The bytes never touch the disk.
pub fn process_upload(
    filename: &str,
    bytes: Vec<u8>,
    options: &ReportOptions,
) -> Result<UploadResponse, ApiError> {
    if filename.is_empty() {
        return Err(ApiError::bad_request("No file selected"));
    }
    if !is_csv(filename) {
        return Err(ApiError::bad_request("Only CSV files allowed"));
    }

    let dataset = census::load(TabularSource::Bytes(bytes)).map_err(ApiError::upload)?;
    let stats = full_report(&dataset, options)?;
    Ok(UploadResponse {
        success: true,
        message: format!("Successfully processed {} records", dataset.len()),
        stats,
    })
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let path = state.config.static_dir.join("index.html");
    tokio::fs::read_to_string(&path)
        .await
        .map(Html)
        .map_err(|_| ApiError::not_found("index.html not found"))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn statistics(State(state): State<AppState>) -> Result<Json<StatisticsResult>, ApiError> {
    with_default(&state, |ds, config| {
        Ok(full_report(ds, &config.report_options())?)
    })
    .await
}

pub async fn race_distribution(State(state): State<AppState>) -> Result<Json<Counts>, ApiError> {
    with_default(&state, |ds, _| Ok(distribution_count(ds, RACE)?)).await
}

pub async fn education(
    State(state): State<AppState>,
) -> Result<Json<Vec<EducationSummary>>, ApiError> {
    with_default(&state, |ds, _| Ok(education_breakdown(ds)?)).await
}

pub async fn countries(
    State(state): State<AppState>,
) -> Result<Json<Vec<CountrySummary>>, ApiError> {
    with_default(&state, |ds, config| {
        Ok(country_analysis(ds, config.country_limit)?)
    })
    .await
}

pub async fn ages(State(state): State<AppState>) -> Result<Json<Counts>, ApiError> {
    with_default(&state, |ds, _| Ok(age_distribution(ds)?)).await
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request("No file provided"))?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            file = Some((filename, bytes.to_vec()));
            break;
        }
    }
    let (filename, bytes) = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    info!(%filename, bytes = bytes.len(), "processing upload");
    let options = state.config.report_options();
    run_blocking(move || process_upload(&filename, bytes, &options))
        .await
        .map(Json)
}

pub async fn filter(
    State(state): State<AppState>,
    payload: Result<Json<DatasetFilters>, JsonRejection>,
) -> Result<Json<FilterResponse>, ApiError> {
    let Json(filters) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    debug!(?filters, "filtering default dataset");

    with_default(&state, move |ds, config| {
        let filtered = apply_filters(ds, &filters)?;
        let stats = full_report(&filtered, &config.report_options())?;
        Ok(FilterResponse {
            success: true,
            filtered_count: filtered.len(),
            stats,
        })
    })
    .await
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{Request, StatusCode};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    const CENSUS: &str = "age,education,salary,sex,race,native-country,occupation,hours-per-week\n\
                          30,Bachelors,>50K,Male,White,India,Prof-specialty,40\n\
                          50,HS-grad,<=50K,Male,Black,United-States,Craft-repair,20\n\
                          20,Bachelors,<=50K,Female,White,India,Sales,20\n\
                          40,Doctorate,>50K,Male,Asian-Pac-Islander,India,Prof-specialty,60\n";

    fn state_for(path: PathBuf) -> AppState {
        AppState {
            config: Arc::new(ServerConfig {
                dataset_path: path,
                ..ServerConfig::default()
            }),
        }
    }

    fn census_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CENSUS.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn statistics_over_default_dataset() {
        let file = census_file();
        let Json(stats) = statistics(State(state_for(file.path().to_path_buf())))
            .await
            .unwrap();
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.average_age_men, 40.0);
        assert_eq!(stats.top_occupation, "Prof-specialty");
    }

    #[tokio::test]
    async fn missing_dataset_is_404() {
        let state = state_for(PathBuf::from("/no/such/census.csv"));
        let err = statistics(State(state.clone())).await.unwrap_err();
        assert_eq!(err, ApiError::not_found("Dataset not found"));

        let err = ages(State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn header_only_dataset_is_404() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", CENSUS.lines().next().unwrap()).unwrap();
        let state = state_for(file.path().to_path_buf());

        let err = statistics(State(state.clone())).await.unwrap_err();
        assert_eq!(err, ApiError::not_found("Dataset not found"));

        let filters = DatasetFilters::default();
        let err = filter(State(state), Ok(Json(filters))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chart_endpoints() {
        let file = census_file();
        let state = state_for(file.path().to_path_buf());

        let Json(races) = race_distribution(State(state.clone())).await.unwrap();
        assert_eq!(races.first(), Some(("White", 2)));

        let Json(edu) = education(State(state.clone())).await.unwrap();
        assert_eq!(edu[0].education, "Bachelors");
        assert_eq!(edu[0].total, 2);

        let Json(by_country) = countries(State(state.clone())).await.unwrap();
        assert_eq!(by_country[0].country, "India");
        assert_eq!(by_country[0].rich_percentage, 66.7);

        let Json(age_groups) = ages(State(state)).await.unwrap();
        assert_eq!(age_groups.get("20-30"), Some(1));
        assert_eq!(age_groups.total(), 4);
    }

    #[tokio::test]
    async fn filter_reports_on_subset() {
        let file = census_file();
        let filters = DatasetFilters {
            sex: Some("Male".into()),
            min_age: Some(30),
            education: Some("all".into()),
            ..Default::default()
        };
        let Json(resp) = filter(State(state_for(file.path().to_path_buf())), Ok(Json(filters)))
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(resp.filtered_count, 3);
        assert_eq!(resp.stats.percentage_bachelors, 33.3);
        assert_eq!(resp.stats.lower_education_rich, 0.0);
    }

    #[tokio::test]
    async fn filter_to_nothing_is_422() {
        let file = census_file();
        let filters = DatasetFilters {
            country: Some("Atlantis".into()),
            ..Default::default()
        };
        let err = filter(State(state_for(file.path().to_path_buf())), Ok(Json(filters)))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_route() {
        let err = not_found().await;
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Endpoint not found");
    }

    #[tokio::test]
    async fn health_is_ok() {
        assert_eq!(health().await, "ok");
    }

    async fn multipart(content_type: &str, body: String) -> Result<Multipart, MultipartRejection> {
        let request = Request::builder()
            .method("POST")
            .header("content-type", content_type)
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await
    }

    fn form(field: &str, filename: &str, contents: &str) -> String {
        format!(
            "--BOUNDARY\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {contents}\r\n\
             --BOUNDARY--\r\n"
        )
    }

    #[tokio::test]
    async fn upload_handler_reads_file_field() {
        let state = state_for(PathBuf::from("/unused.csv"));
        let content_type = "multipart/form-data; boundary=BOUNDARY";

        let body = multipart(content_type, form("file", "census.csv", CENSUS)).await;
        let Json(resp) = upload(State(state.clone()), body).await.unwrap();
        assert_eq!(resp.message, "Successfully processed 4 records");

        let body = multipart(content_type, form("attachment", "census.csv", CENSUS)).await;
        let err = upload(State(state.clone()), body).await.unwrap_err();
        assert_eq!(err, ApiError::bad_request("No file provided"));

        let body = multipart("application/json", "{}".to_string()).await;
        let err = upload(State(state), body).await.unwrap_err();
        assert_eq!(err, ApiError::bad_request("No file provided"));
    }

    #[test]
    fn upload_validation() {
        let options = ReportOptions::default();
        let bytes = || CENSUS.as_bytes().to_vec();

        let err = process_upload("", bytes(), &options).unwrap_err();
        assert_eq!(err, ApiError::bad_request("No file selected"));

        let err = process_upload("census.xlsx", bytes(), &options).unwrap_err();
        assert_eq!(err, ApiError::bad_request("Only CSV files allowed"));

        let err = process_upload("census", bytes(), &options).unwrap_err();
        assert_eq!(err.message, "Only CSV files allowed");
    }

    #[test]
    fn upload_with_missing_columns_is_400() {
        let csv = b"age,sex\n30,Male\n".to_vec();
        let err = process_upload("people.csv", csv, &ReportOptions::default()).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("Missing required columns: education, salary"));
    }

    #[test]
    fn upload_is_summarized() {
        let resp =
            process_upload("Census.CSV", CENSUS.as_bytes().to_vec(), &ReportOptions::default())
                .unwrap();
        assert!(resp.success);
        assert_eq!(resp.message, "Successfully processed 4 records");
        assert_eq!(resp.stats.higher_education_rich, 66.7);
    }
}

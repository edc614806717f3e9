use crate::config::AppConfig;
use crate::error::FertilityError;
use crate::export::table_to_csv;
use crate::processing::{build_table_view, build_view, MarkerStyle};
use crate::types::{Dataset, Filter, MissingValues, TableScope, ViewModel, ViewRequest};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Separator for country lists in query strings. World Bank names contain
/// commas ("Korea, Rep.") but never semicolons.
const COUNTRY_SEPARATOR: char = ';';

pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub config: AppConfig,
}

impl AppState {
    fn marker_style(&self) -> MarkerStyle {
        MarkerStyle {
            scale: self.config.view.marker_scale,
            precision: self.config.view.label_precision,
        }
    }
}

#[derive(Deserialize)]
pub struct SeriesParams {
    countries: Option<String>,
    start: Option<i32>,
    end: Option<i32>,
    missing: Option<MissingValues>,
}

#[derive(Deserialize)]
pub struct PointParams {
    year: Option<i32>,
}

#[derive(Deserialize)]
pub struct TableParams {
    countries: Option<String>,
    start: Option<i32>,
    end: Option<i32>,
    #[serde(default)]
    full: bool,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct MetaResponse {
    first_year: i32,
    last_year: i32,
    records: usize,
    coordinates: usize,
}

#[derive(Serialize)]
pub struct CountryEntry {
    name: String,
    code: String,
    has_coordinates: bool,
}

pub struct ApiError(FertilityError);

impl From<FertilityError> for ApiError {
    fn from(err: FertilityError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FertilityError::InvalidRange { .. } => {
                debug!("Rejected request: {}", self.0);
                StatusCode::BAD_REQUEST
            }
            FertilityError::DataUnavailable { .. } => {
                error!("{}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn split_countries(countries: Option<&str>) -> Vec<String> {
    countries
        .map(|list| {
            list.split(COUNTRY_SEPARATOR)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/meta", get(meta_handler))
        .route("/api/countries", get(countries_handler))
        .route("/api/series", get(series_handler))
        .route("/api/points", get(points_handler))
        .route("/api/table", get(table_handler))
        .route("/api/export.csv", get(export_handler));

    if let Some(static_dir) = &state.config.server.static_dir {
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let state = Arc::new(AppState {
        dataset: Arc::new(dataset),
        config: config.clone(),
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn meta_handler(State(state): State<Arc<AppState>>) -> Json<MetaResponse> {
    let dataset = &state.dataset;
    Json(MetaResponse {
        first_year: dataset.first_year,
        last_year: dataset.last_year,
        records: dataset.records.len(),
        coordinates: dataset.coordinates.len(),
    })
}

async fn countries_handler(State(state): State<Arc<AppState>>) -> Json<Vec<CountryEntry>> {
    let dataset = &state.dataset;
    let entries = dataset
        .records
        .iter()
        .map(|r| CountryEntry {
            name: r.name.clone(),
            code: r.code.clone(),
            has_coordinates: dataset.coordinate(&r.code).is_some(),
        })
        .collect();
    Json(entries)
}

async fn series_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeriesParams>,
) -> Result<Json<ViewModel>, ApiError> {
    let range = state.dataset.resolve_range(params.start, params.end)?;
    let request = ViewRequest::Series {
        filter: Filter::new(split_countries(params.countries.as_deref()), range),
        missing: params.missing.unwrap_or(state.config.view.missing_values),
    };
    Ok(Json(build_view(&state.dataset, &request, &state.marker_style())?))
}

async fn points_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointParams>,
) -> Result<Json<ViewModel>, ApiError> {
    let year = params
        .year
        .or(state.config.view.default_year)
        .unwrap_or(state.dataset.last_year);
    let request = ViewRequest::Points { year };
    Ok(Json(build_view(&state.dataset, &request, &state.marker_style())?))
}

fn table_filter(
    state: &AppState,
    params: TableParams,
) -> Result<(Filter, TableScope, Option<usize>), FertilityError> {
    let range = state.dataset.resolve_range(params.start, params.end)?;
    let filter = Filter::new(split_countries(params.countries.as_deref()), range);
    let scope = if params.full {
        TableScope::Full
    } else {
        TableScope::Selected
    };
    Ok((filter, scope, params.limit))
}

async fn table_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableParams>,
) -> Result<Json<ViewModel>, ApiError> {
    let (filter, scope, limit) = table_filter(&state, params)?;
    let request = ViewRequest::Table {
        filter,
        scope,
        limit,
    };
    Ok(Json(build_view(&state.dataset, &request, &state.marker_style())?))
}

async fn export_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TableParams>,
) -> Result<Response, ApiError> {
    let (filter, scope, limit) = table_filter(&state, params)?;
    let slice = build_table_view(&state.dataset, &filter, scope, limit)?;

    let bytes = match table_to_csv(&slice) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("CSV export failed: {:#}", e);
            return Ok(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"fertility.csv\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_lists_split_on_semicolons() {
        assert_eq!(
            split_countries(Some("Korea, Rep.; Japan;;")),
            vec!["Korea, Rep.".to_string(), "Japan".to_string()]
        );
        assert!(split_countries(None).is_empty());
        assert!(split_countries(Some("")).is_empty());
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::error;
use serde::{Deserialize, Serialize};

use crate::error::TariffError;
use crate::store::TariffStore;
use crate::{ingestion, pricing};

/// Shared handler state: the connected store and the resolved rates-file
/// path. Configuration is resolved once at startup; handlers never read the
/// environment.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TariffStore>,
    pub rates_file: PathBuf,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Error body shape shared by every endpoint: `{"detail": "<message>"}`.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

#[derive(Debug, Serialize)]
struct LoadDataResponse {
    status: String,
}

#[derive(Debug, Serialize)]
struct InsuranceResponse {
    insurance_cost: f64,
}

#[derive(Debug, Deserialize)]
struct InsuranceParams {
    date: String,
    cargo_type: String,
    declared_value: f64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/loaddata", post(load_data))
        .route("/calculate_insurance", get(calculate_insurance))
        .with_state(state)
}

async fn load_data(State(state): State<AppState>) -> Result<Json<LoadDataResponse>, ApiError> {
    let report = ingestion::load_rates_file(state.store.as_ref(), &state.rates_file)
        .await
        .map_err(error_response)?;

    Ok(Json(LoadDataResponse {
        status: format!(
            "Data loaded successfully. Written {} new records, {} records updated.",
            report.created, report.updated
        ),
    }))
}

async fn calculate_insurance(
    State(state): State<AppState>,
    params: Result<Query<InsuranceParams>, QueryRejection>,
) -> Result<Json<InsuranceResponse>, ApiError> {
    let Query(params) = params
        .map_err(|rejection| json_error(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    let cost = pricing::calculate_insurance(
        state.store.as_ref(),
        &params.date,
        &params.cargo_type,
        params.declared_value,
    )
    .await
    .map_err(error_response)?;

    Ok(Json(InsuranceResponse {
        insurance_cost: cost,
    }))
}

/// Maps domain errors onto transport statuses: malformed input is the
/// caller's fault (400), a missing tariff is 404, store and file failures
/// are server errors (500) and get logged.
fn error_response(err: TariffError) -> ApiError {
    let status = match &err {
        TariffError::InvalidPayload(_)
        | TariffError::InvalidDate
        | TariffError::SerializationError(_) => StatusCode::BAD_REQUEST,
        TariffError::TariffNotFound => StatusCode::NOT_FOUND,
        TariffError::DuplicateTariff { .. } => StatusCode::CONFLICT,
        TariffError::StoreError(_) | TariffError::IoError(_) => {
            error!("request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    json_error(status, err.to_string())
}

fn json_error(status: StatusCode, detail: String) -> ApiError {
    (status, Json(ErrorResponse { detail }))
}

//! Fleet-wide handlers

use axum::{extract::State, Json};
use domain_receivables::{CustomerSummary, FleetTotals, ReconciliationReport};

use crate::{error::ApiError, AppState};

pub async fn list_summaries(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerSummary>>, ApiError> {
    Ok(Json(state.service.get_all_summaries().await?))
}

pub async fn fleet_totals(State(state): State<AppState>) -> Result<Json<FleetTotals>, ApiError> {
    Ok(Json(state.service.get_fleet_totals().await?))
}

/// Runs the reconciliation sweep over every customer
pub async fn reconcile_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReconciliationReport>>, ApiError> {
    Ok(Json(state.service.reconcile_all().await?))
}

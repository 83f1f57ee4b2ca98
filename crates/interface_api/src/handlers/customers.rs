//! Per-customer ledger handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_kernel::{AdjustmentId, CustomerId, PaymentId, ReceiptId, ReturnId, SaleId};
use domain_receivables::{
    AccountStatement, LedgerEntry, LedgerVerification, OpenInvoice, ReconciliationReport,
};
use tracing::instrument;
use uuid::Uuid;

use crate::dto::{
    AdjustmentRequest, BalanceResponse, BusinessEventRequest, DateRangeQuery,
    ReturnRecordedResponse,
};
use crate::{error::ApiError, AppState};

/// Reconciled statement with pending credits overlaid
#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<AccountStatement>, ApiError> {
    let range = query.to_range()?;
    let statement = state.service.get_account(CustomerId::from(id), range).await?;
    Ok(Json(statement))
}

/// Confirmed balance from the last ledger entry
pub async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let customer_id = CustomerId::from(id);
    let balance = state.service.get_current_balance(customer_id).await?;
    Ok(Json(BalanceResponse { customer_id, balance }))
}

pub async fn get_open_invoices(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<OpenInvoice>>, ApiError> {
    let range = query.to_range()?;
    let invoices = state
        .service
        .get_open_invoices(CustomerId::from(id), range)
        .await?;
    Ok(Json(invoices))
}

#[instrument(skip(state, request))]
pub async fn record_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BusinessEventRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    let sale_id = SaleId::from(request.reference_id);
    let entry = state
        .service
        .record_sale(
            CustomerId::from(id),
            sale_id,
            request.amount,
            request.description_or(|| format!("Sale {}", sale_id)),
            request.occurred_at,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state, request))]
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BusinessEventRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    let payment_id = PaymentId::from(request.reference_id);
    let entry = state
        .service
        .record_payment(
            CustomerId::from(id),
            payment_id,
            request.amount,
            request.description_or(|| format!("Payment {}", payment_id)),
            request.occurred_at,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state, request))]
pub async fn record_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BusinessEventRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    let receipt_id = ReceiptId::from(request.reference_id);
    let entry = state
        .service
        .record_general_receipt(
            CustomerId::from(id),
            receipt_id,
            request.amount,
            request.description_or(|| format!("Receipt {}", receipt_id)),
            request.occurred_at,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Credits an approved return; 200 without an entry if it was already recorded
#[instrument(skip(state, request))]
pub async fn record_return(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BusinessEventRequest>,
) -> Result<(StatusCode, Json<ReturnRecordedResponse>), ApiError> {
    let return_id = ReturnId::from(request.reference_id);
    let entry = state
        .service
        .record_return(
            CustomerId::from(id),
            return_id,
            request.amount,
            request.description_or(|| format!("Return {}", return_id)),
            request.occurred_at,
        )
        .await?;

    let status = if entry.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ReturnRecordedResponse {
            recorded: entry.is_some(),
            entry,
        }),
    ))
}

#[instrument(skip(state, request))]
pub async fn record_adjustment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustmentRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    let entry = state
        .service
        .record_adjustment(
            CustomerId::from(id),
            AdjustmentId::new_v7(),
            request.direction,
            request.amount,
            request.description,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn reconcile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    let report = state.service.reconcile(CustomerId::from(id)).await?;
    Ok(Json(report))
}

pub async fn verify(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LedgerVerification>, ApiError> {
    let verification = state.service.verify_ledger(CustomerId::from(id)).await?;
    Ok(Json(verification))
}

//! Payment allocation and eligibility handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::eligibility::PaymentEligibility,
    dtos::{ApplyPaymentRequest, ApplyPaymentResponse, BatchEligibilityRequest},
    middleware::TenantContext,
    AppState,
};
use service_core::error::AppError;

pub async fn apply_payment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(student_id): Path<Uuid>,
    Json(payload): Json<ApplyPaymentRequest>,
) -> Result<Json<ApplyPaymentResponse>, AppError> {
    tracing::info!(
        tenant_id = %tenant.tenant_id,
        student_id = %student_id,
        amount = %payload.amount,
        apply_to_future_terms = payload.apply_to_future_terms,
        "Applying payment"
    );

    let outcome = state
        .db
        .apply_payment(
            tenant.tenant_id,
            student_id,
            payload.amount,
            payload.apply_to_future_terms,
            Utc::now().date_naive(),
        )
        .await?;

    Ok(Json(ApplyPaymentResponse {
        student_id,
        reference: payload.reference,
        outcome,
    }))
}

pub async fn payment_eligibility(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(student_id): Path<Uuid>,
) -> Result<Json<PaymentEligibility>, AppError> {
    let verdict = state
        .db
        .payment_eligibility(tenant.tenant_id, student_id)
        .await?;
    Ok(Json(verdict))
}

pub async fn batch_payment_eligibility(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<BatchEligibilityRequest>,
) -> Result<Json<Vec<PaymentEligibility>>, AppError> {
    payload.validate()?;

    let verdicts = state
        .db
        .payment_eligibility_batch(tenant.tenant_id, &payload.student_ids)
        .await?;
    Ok(Json(verdicts))
}

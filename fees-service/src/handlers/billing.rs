//! Billing handlers: student term assignments and fee item management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{AssignmentOverrideRequest, BillStudentRequest, ManualUpdateRequest},
    middleware::TenantContext,
    models::{NewFeeItem, StudentTermAssignment, TermLedgerView},
    AppState,
};
use service_core::error::AppError;

pub async fn bill_student(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(student_id): Path<Uuid>,
    Json(payload): Json<BillStudentRequest>,
) -> Result<(StatusCode, Json<TermLedgerView>), AppError> {
    payload.validate()?;

    tracing::info!(
        tenant_id = %tenant.tenant_id,
        student_id = %student_id,
        term_id = %payload.term_id,
        grade = %payload.grade,
        "Billing student for term"
    );

    let ledger = state
        .db
        .bill_student(
            tenant.tenant_id,
            student_id,
            payload.term_id,
            &payload.grade,
            Utc::now().date_naive(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ledger)))
}

pub async fn list_student_terms(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<TermLedgerView>>, AppError> {
    let views = state
        .db
        .list_student_assignments(tenant.tenant_id, student_id)
        .await?;
    Ok(Json(views))
}

pub async fn manual_update(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(student_id): Path<Uuid>,
    Json(payload): Json<ManualUpdateRequest>,
) -> Result<Json<TermLedgerView>, AppError> {
    if payload.add.is_empty() && payload.remove.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Nothing to update: both add and remove are empty"
        )));
    }

    tracing::info!(
        tenant_id = %tenant.tenant_id,
        student_id = %student_id,
        term_id = %payload.term_id,
        adding = payload.add.len(),
        removing = payload.remove.len(),
        "Manually updating fee items"
    );

    let add: Vec<NewFeeItem> = payload
        .add
        .into_iter()
        .map(|item| NewFeeItem {
            name: item.name,
            fee_type: item.fee_type,
            amount: item.amount,
            due_date: item.due_date,
            is_mandatory: item.is_mandatory,
        })
        .collect();

    let ledger = state
        .db
        .manual_update(
            tenant.tenant_id,
            student_id,
            payload.term_id,
            &add,
            &payload.remove,
            Utc::now().date_naive(),
        )
        .await?;

    Ok(Json(ledger))
}

/// Administrative cancel/waive of a whole assignment.
pub async fn override_assignment(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(assignment_id): Path<Uuid>,
    Json(payload): Json<AssignmentOverrideRequest>,
) -> Result<Json<StudentTermAssignment>, AppError> {
    tracing::info!(
        tenant_id = %tenant.tenant_id,
        assignment_id = %assignment_id,
        status = payload.status.as_str(),
        "Overriding assignment status"
    );

    let assignment = state
        .db
        .set_assignment_override(tenant.tenant_id, assignment_id, payload.status)
        .await?;

    Ok(Json(assignment))
}

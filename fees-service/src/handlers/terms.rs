//! Academic term and grade fee schedule handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{AddBreakDaysRequest, CreateTermRequest, RemoveBreakDaysRequest, TermResponse},
    middleware::TenantContext,
    models::{CreateTerm, FeeComponents, GradeTermFee},
    AppState,
};
use service_core::error::AppError;

pub async fn create_term(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateTermRequest>,
) -> Result<(StatusCode, Json<TermResponse>), AppError> {
    payload.validate()?;

    tracing::info!(
        tenant_id = %tenant.tenant_id,
        name = %payload.name,
        academic_year = %payload.academic_year,
        "Creating academic term"
    );

    let input = CreateTerm {
        name: payload.name,
        academic_year: payload.academic_year,
        start_date: payload.start_date,
        end_date: payload.end_date,
        fee_due_date: payload.fee_due_date,
        break_dates: payload.break_dates,
    };

    let term = state
        .db
        .create_term(tenant.tenant_id, &input, Utc::now().date_naive())
        .await?;

    Ok((StatusCode::CREATED, Json(TermResponse::from(term))))
}

pub async fn list_terms(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<Vec<TermResponse>>, AppError> {
    let terms = state.db.list_terms(tenant.tenant_id).await?;
    Ok(Json(terms.into_iter().map(TermResponse::from).collect()))
}

pub async fn get_term(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(term_id): Path<Uuid>,
) -> Result<Json<TermResponse>, AppError> {
    let term = state
        .db
        .get_term(tenant.tenant_id, term_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Term not found")))?;

    Ok(Json(TermResponse::from(term)))
}

pub async fn set_current_term(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(term_id): Path<Uuid>,
) -> Result<Json<TermResponse>, AppError> {
    tracing::info!(
        tenant_id = %tenant.tenant_id,
        term_id = %term_id,
        "Setting current term"
    );

    let term = state
        .db
        .set_current_term(tenant.tenant_id, term_id, Utc::now().date_naive())
        .await?;

    Ok(Json(TermResponse::from(term)))
}

pub async fn add_break_days(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(term_id): Path<Uuid>,
    Json(payload): Json<AddBreakDaysRequest>,
) -> Result<Json<TermResponse>, AppError> {
    payload.validate()?;

    let term = state
        .db
        .add_break_days(tenant.tenant_id, term_id, &payload.dates)
        .await?;

    Ok(Json(TermResponse::from(term)))
}

pub async fn remove_break_days(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(term_id): Path<Uuid>,
    payload: Option<Json<RemoveBreakDaysRequest>>,
) -> Result<Json<TermResponse>, AppError> {
    let dates = payload.map(|Json(p)| p.dates).unwrap_or_default();

    let term = state
        .db
        .remove_break_days(tenant.tenant_id, term_id, &dates)
        .await?;

    Ok(Json(TermResponse::from(term)))
}

pub async fn upsert_grade_fee(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path((term_id, grade)): Path<(Uuid, String)>,
    Json(components): Json<FeeComponents>,
) -> Result<Json<GradeTermFee>, AppError> {
    tracing::info!(
        tenant_id = %tenant.tenant_id,
        term_id = %term_id,
        grade = %grade,
        "Upserting grade fee schedule"
    );

    let grade_fee = state
        .db
        .upsert_grade_fee(tenant.tenant_id, term_id, &grade, &components)
        .await?;

    Ok(Json(grade_fee))
}

pub async fn list_grade_fees(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(term_id): Path<Uuid>,
) -> Result<Json<Vec<GradeTermFee>>, AppError> {
    let fees = state.db.list_grade_fees(tenant.tenant_id, term_id).await?;
    Ok(Json(fees))
}

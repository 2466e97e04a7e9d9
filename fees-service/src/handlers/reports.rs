//! Reporting reads: collection statistics and overdue assignments.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    middleware::TenantContext,
    models::StudentTermAssignment,
    services::database::TermCollectionStats,
    AppState,
};
use service_core::error::AppError;

pub async fn term_collection_stats(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(term_id): Path<Uuid>,
) -> Result<Json<TermCollectionStats>, AppError> {
    state
        .db
        .get_term(tenant.tenant_id, term_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Term not found")))?;

    let stats = state
        .db
        .term_collection_stats(tenant.tenant_id, term_id)
        .await?;
    Ok(Json(stats))
}

pub async fn overdue_assignments(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(term_id): Path<Uuid>,
) -> Result<Json<Vec<StudentTermAssignment>>, AppError> {
    state
        .db
        .get_term(tenant.tenant_id, term_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Term not found")))?;

    let assignments = state
        .db
        .overdue_assignments(tenant.tenant_id, term_id, Utc::now().date_naive())
        .await?;
    Ok(Json(assignments))
}

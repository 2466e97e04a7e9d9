//! Tenant context extraction for multi-tenancy support.
//!
//! Every fees endpoint is tenant-scoped. The tenant id arrives in the
//! X-Tenant-ID header, set by the gateway after it has authenticated the
//! caller and validated their school membership.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

/// Tenant context extracted from request headers.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    /// School (tenant) ID scoping every query in the request.
    pub tenant_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("X-Tenant-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing X-Tenant-ID header (required from gateway)"
                ))
            })?;

        let tenant_id = Uuid::parse_str(raw).map_err(|_| {
            AppError::Unauthorized(anyhow::anyhow!("X-Tenant-ID header is not a valid UUID"))
        })?;

        // Add to tracing span for observability
        let span = tracing::Span::current();
        span.record("tenant_id", raw);

        Ok(TenantContext { tenant_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequestParts;
    use axum::http::Request;

    #[tokio::test]
    async fn extracts_tenant_from_header() {
        let tenant = Uuid::new_v4();
        let request = Request::builder()
            .header("X-Tenant-ID", tenant.to_string())
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ctx = TenantContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ctx.tenant_id, tenant);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let result = TenantContext::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn malformed_uuid_is_rejected() {
        let request = Request::builder()
            .header("X-Tenant-ID", "not-a-uuid")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let result = TenantContext::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }
}

pub mod config;
pub mod domain;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post, put},
    Router,
};
use secrecy::ExposeSecret;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use config::Config;
use services::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

pub struct Application {
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        db.run_migrations().await?;

        services::init_metrics();

        let state = AppState {
            db,
            config: config.clone(),
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            // Academic terms (tenant-scoped)
            .route(
                "/api/terms",
                post(handlers::terms::create_term).get(handlers::terms::list_terms),
            )
            .route("/api/terms/:id", get(handlers::terms::get_term))
            .route("/api/terms/:id/current", post(handlers::terms::set_current_term))
            .route(
                "/api/terms/:id/break-days",
                post(handlers::terms::add_break_days).delete(handlers::terms::remove_break_days),
            )
            // Grade fee schedules
            .route(
                "/api/terms/:id/grade-fees",
                get(handlers::terms::list_grade_fees),
            )
            .route(
                "/api/terms/:id/grade-fees/:grade",
                put(handlers::terms::upsert_grade_fee),
            )
            // Reporting
            .route(
                "/api/terms/:id/stats",
                get(handlers::reports::term_collection_stats),
            )
            .route(
                "/api/terms/:id/overdue",
                get(handlers::reports::overdue_assignments),
            )
            // Student billing
            .route(
                "/api/fees/students/:id/bill",
                post(handlers::billing::bill_student),
            )
            .route(
                "/api/fees/students/:id/terms",
                get(handlers::billing::list_student_terms),
            )
            .route(
                "/api/fees/students/:id/manual-update",
                post(handlers::billing::manual_update),
            )
            .route(
                "/api/fees/assignments/:id/override",
                post(handlers::billing::override_assignment),
            )
            // Payments
            .route(
                "/api/payments/students/:id",
                post(handlers::payments::apply_payment),
            )
            .route(
                "/api/payments/students/:id/eligibility",
                get(handlers::payments::payment_eligibility),
            )
            .route(
                "/api/payments/eligibility/batch",
                post(handlers::payments::batch_payment_eligibility),
            )
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        Ok(Self {
            port: config.server.port,
            router,
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

//! HTTP API Layer
//!
//! REST API for the receivables ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Thin wrappers over `ReceivablesService`
//! - **Middleware**: Request ids, tracing, request logging
//! - **DTOs**: Request bodies and small response wrappers
//! - **Error Handling**: `LedgerError` mapped to status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use domain_receivables::ReceivablesService;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{customers, health, reports};
use crate::middleware::request_logging;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ReceivablesService,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(service: ReceivablesService, config: ApiConfig) -> Router {
    let state = AppState { service, config };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let customer_routes = Router::new()
        .route("/summaries", get(reports::list_summaries))
        .route("/summaries/totals", get(reports::fleet_totals))
        .route("/reconcile", post(reports::reconcile_all))
        .route("/:id/account", get(customers::get_account))
        .route("/:id/balance", get(customers::get_balance))
        .route("/:id/open-invoices", get(customers::get_open_invoices))
        .route("/:id/sales", post(customers::record_sale))
        .route("/:id/payments", post(customers::record_payment))
        .route("/:id/receipts", post(customers::record_receipt))
        .route("/:id/returns", post(customers::record_return))
        .route("/:id/adjustments", post(customers::record_adjustment))
        .route("/:id/reconcile", post(customers::reconcile))
        .route("/:id/verify", get(customers::verify));

    let api_routes = Router::new()
        .nest("/customers", customer_routes)
        .layer(axum_middleware::from_fn(request_logging));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

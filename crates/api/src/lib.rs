//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes
//! - Authentication middleware and the `AuthUser` extractor
//! - Error-to-response mapping

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use saku_db::{AccountRepository, CategoryRepository, LedgerRepository};
use saku_shared::{JwtService, LedgerConfig};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Retry and lock settings for ledger units of work.
    pub ledger: LedgerConfig,
    /// Upper bound on request handling time.
    pub request_timeout: Duration,
}

impl AppState {
    /// Ledger repository bound to the shared pool.
    #[must_use]
    pub fn ledger_repository(&self) -> LedgerRepository {
        LedgerRepository::from_config((*self.db).clone(), &self.ledger)
    }

    /// Account repository bound to the shared pool.
    #[must_use]
    pub fn account_repository(&self) -> AccountRepository {
        AccountRepository::new((*self.db).clone())
    }

    /// Category repository bound to the shared pool.
    #[must_use]
    pub fn category_repository(&self) -> CategoryRepository {
        CategoryRepository::new((*self.db).clone())
    }
}

/// Creates the main application router.
///
/// A request that exceeds `request_timeout` is answered with 408; dropping
/// its handler future rolls back any open unit of work.
pub fn create_router(state: AppState) -> Router {
    let request_timeout = state.request_timeout;

    Router::new()
        .merge(routes::api_routes_with_state(state.clone()))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

//! inventory-server library
//!
//! REST backend for organizations, persons and products, with atomic bulk
//! product import, an import audit log and a live change stream.

use axum::Router;
use inventory_common::events::EventBus;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod dto;
pub mod error;
pub mod import;
pub mod paging;
pub mod services;
pub mod validation;

pub use error::{ApiError, ApiResult};

use import::ProductImporter;
use paging::PageLimits;
use services::{OrganizationService, PersonService, ProductService};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub event_bus: EventBus,
    pub page_limits: PageLimits,
    pub organizations: OrganizationService,
    pub persons: PersonService,
    pub products: ProductService,
    pub importer: ProductImporter,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, page_limits: PageLimits) -> Self {
        Self {
            organizations: OrganizationService::new(db.clone(), event_bus.clone()),
            persons: PersonService::new(db.clone(), event_bus.clone()),
            products: ProductService::new(db.clone(), event_bus.clone()),
            importer: ProductImporter::new(db, event_bus.clone()),
            event_bus,
            page_limits,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::organization_routes())
        .merge(api::person_routes())
        .merge(api::product_routes())
        .merge(api::import_routes())
        .merge(api::event_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! HTTP API handlers for inventory-server

pub mod health;
pub mod imports;
pub mod organizations;
pub mod persons;
pub mod products;
pub mod sse;

pub use health::health_routes;
pub use imports::import_routes;
pub use organizations::organization_routes;
pub use persons::person_routes;
pub use products::product_routes;
pub use sse::event_routes;

//! CRUD services
//!
//! Each mutation runs in its own transaction and publishes one change event
//! once that transaction has committed.

pub mod organizations;
pub mod persons;
pub mod products;

pub use organizations::OrganizationService;
pub use persons::PersonService;
pub use products::{ProductService, ProductView};

//! # Inventory Common Library
//!
//! Shared code for the inventory service:
//! - Domain models and closed enumerations
//! - Database initialization and schema
//! - Change events (EventBus) and their SSE stream
//! - Business-key normalization
//! - Bootstrap configuration

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod normalize;
pub mod sse;

pub use error::{Error, Result, Violation};

//! Bulk product import
//!
//! Pipeline: [`record`] parses and structurally checks the batch, [`engine`]
//! applies it in one transaction with [`resolver`] deduplicating manufacturers
//! and owners, [`notifier`] holds change events until commit and [`audit`]
//! records the outcome.

pub mod audit;
pub mod engine;
pub mod notifier;
pub mod record;
pub mod resolver;

pub use audit::ImportAudit;
pub use engine::{apply_batch, ImportOutcome, ImportRejection, ProductImporter, RecordError};
pub use notifier::CommitGate;
pub use record::{parse_batch, precheck, BatchSource};
pub use resolver::EntityResolver;

//! Batch import engine
//!
//! One batch is one transaction. Records are applied strictly in input order;
//! a record that breaks a business rule or conflicts with an earlier record
//! (or with stored data) is collected as a rejection and the rest of the batch
//! is still checked, but any rejection rolls the whole batch back. A store
//! failure stops the batch at once.
//!
//! Change events are staged in a [`CommitGate`] and only published after the
//! commit has returned successfully. Every attempt, committed or not, leaves
//! one row in the import audit log.

use super::audit::ImportAudit;
use super::notifier::CommitGate;
use super::record::{parse_batch, precheck, BatchSource};
use super::resolver::EntityResolver;
use crate::db::products;
use crate::dto::ProductImportRecord;
use crate::validation::{validate_person, validate_product, ProductDraft};
use chrono::{DateTime, Utc};
use inventory_common::db::begin_write;
use inventory_common::events::{ChangeAction, EntityKind, EventBus};
use inventory_common::normalize::{canonical_key, canonical_key_opt, canonical_part_number};
use inventory_common::{Error, Result, Violation};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Result of a committed import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub created_count: i64,
}

/// One rejected record; `index` is -1 for rejections of the batch as a whole
#[derive(Debug)]
pub struct RecordError {
    pub index: i64,
    pub error: Error,
}

/// Why a batch was not committed
#[derive(Debug, Default)]
pub struct ImportRejection {
    pub errors: Vec<RecordError>,
}

impl ImportRejection {
    /// Rejection not tied to any single record
    pub fn batch(error: Error) -> Self {
        Self {
            errors: vec![RecordError { index: -1, error }],
        }
    }

    fn push(&mut self, index: usize, error: Error) {
        self.errors.push(RecordError {
            index: index as i64,
            error,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_store_failure(&self) -> bool {
        self.errors.iter().any(|e| e.error.is_store_failure())
    }

    pub fn has_conflict(&self) -> bool {
        self.errors.iter().any(|e| e.error.is_conflict())
    }

    /// Flattened wire form, one entry per violation
    pub fn violations(&self) -> Vec<Violation> {
        self.errors
            .iter()
            .flat_map(|e| e.error.violations(e.index))
            .collect()
    }
}

/// Apply every record inside an open transaction
///
/// Returns the number of products created. Nothing is committed here; on
/// `Err` the caller must roll back and discard `gate`.
pub async fn apply_batch(
    conn: &mut SqliteConnection,
    records: &[ProductImportRecord],
    gate: &mut CommitGate,
    now: DateTime<Utc>,
) -> std::result::Result<i64, ImportRejection> {
    let mut resolver = EntityResolver::new();
    let mut seen = HashSet::new();
    let mut rejection = ImportRejection::default();
    let mut created = 0i64;

    for (index, record) in records.iter().enumerate() {
        match import_record(conn, record, &mut resolver, &mut seen, gate, now).await {
            Ok(product_id) => {
                created += 1;
                debug!(index, product_id, "Imported record");
            }
            Err(err) if err.is_store_failure() => {
                error!(index, error = %err, "Store failure during import, aborting batch");
                rejection.push(index, err);
                return Err(rejection);
            }
            Err(err) => {
                debug!(index, error = %err, "Rejected import record");
                rejection.push(index, err);
            }
        }
    }

    let stats = resolver.stats();
    debug!(
        cache_hits = stats.cache_hits,
        store_hits = stats.store_hits,
        created_related = stats.created,
        "Resolver summary"
    );

    if rejection.is_empty() {
        Ok(created)
    } else {
        Err(rejection)
    }
}

async fn import_record(
    conn: &mut SqliteConnection,
    record: &ProductImportRecord,
    resolver: &mut EntityResolver,
    seen: &mut HashSet<(i64, String)>,
    gate: &mut CommitGate,
    now: DateTime<Utc>,
) -> Result<i64> {
    let manufacturer = record
        .manufacturer
        .as_ref()
        .ok_or_else(|| Error::invalid("manufacturer", "manufacturer is required"))?;
    let org_key = canonical_key_opt(manufacturer.full_name.as_deref(), true).ok_or_else(|| {
        Error::invalid(
            "manufacturer.fullName",
            "manufacturer.fullName must not be null/blank",
        )
    })?;
    let org = resolver
        .organization(conn, &org_key, manufacturer, gate, now)
        .await?;

    let owner = match &record.owner {
        Some(input) => {
            let candidate = validate_person(input, "owner.")?;
            let key = canonical_key(&candidate.name, true)
                .ok_or_else(|| Error::invalid("owner.name", "owner.name required"))?;
            Some(resolver.person(conn, &key, candidate, gate).await?)
        }
        None => None,
    };

    let draft = ProductDraft {
        name: record.name.as_deref(),
        coordinates: record.coordinates.as_ref(),
        unit_of_measure: record.unit_of_measure,
        manufacturer_id: Some(org.id),
        price: record.price,
        manufacture_cost: record.manufacture_cost,
        rating: record.rating,
        part_number: record.part_number.as_deref(),
        owner_id: owner.as_ref().map(|o| o.id),
    };
    let product = validate_product(draft, "product.")?;
    let part_key = canonical_part_number(&product.part_number)
        .ok_or_else(|| Error::invalid("product.partNumber", "product.partNumber required"))?;

    let org_name = org.full_name.as_deref().unwrap_or(&org.name);
    if !seen.insert((org.id, part_key.clone())) {
        return Err(Error::InBatchConflict(format!(
            "Product with partNumber '{}' for manufacturer '{}' appears more than once in import batch",
            product.part_number, org_name
        )));
    }

    if let Some(existing) = products::find_by_business_key(conn, org.id, &part_key).await? {
        return Err(Error::ExistingRecordConflict(format!(
            "Product with partNumber '{}' for manufacturer '{}' already exists (id={})",
            product.part_number, org_name, existing.id
        )));
    }

    let id = products::insert(conn, &product, now).await?;
    gate.stage(EntityKind::Product, ChangeAction::Created, id);
    Ok(id)
}

/// Entry point for bulk product imports
#[derive(Clone)]
pub struct ProductImporter {
    db: SqlitePool,
    event_bus: EventBus,
    audit: ImportAudit,
}

impl ProductImporter {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        let audit = ImportAudit::new(db.clone(), event_bus.clone());
        Self {
            db,
            event_bus,
            audit,
        }
    }

    pub fn audit(&self) -> &ImportAudit {
        &self.audit
    }

    /// Parse a raw JSON batch and import it; parse failures are audited too
    pub async fn import_bytes(
        &self,
        bytes: &[u8],
        source: BatchSource,
    ) -> std::result::Result<ImportOutcome, ImportRejection> {
        let started_at = Utc::now();
        match parse_batch(bytes, source) {
            Ok(records) => self.run(started_at, &records).await,
            Err(err) => Err(self.reject(started_at, ImportRejection::batch(err)).await),
        }
    }

    /// Import an already-decoded batch atomically
    pub async fn import_batch(
        &self,
        records: &[ProductImportRecord],
    ) -> std::result::Result<ImportOutcome, ImportRejection> {
        self.run(Utc::now(), records).await
    }

    async fn run(
        &self,
        started_at: DateTime<Utc>,
        records: &[ProductImportRecord],
    ) -> std::result::Result<ImportOutcome, ImportRejection> {
        let violations = precheck(records);
        if !violations.is_empty() {
            info!(
                records = records.len(),
                violations = violations.len(),
                "Import batch failed structural checks"
            );
            let rejection = ImportRejection::batch(Error::Validation(violations));
            return Err(self.reject(started_at, rejection).await);
        }

        let mut tx = match begin_write(&self.db).await {
            Ok(tx) => tx,
            Err(e) => return Err(self.reject(started_at, ImportRejection::batch(e)).await),
        };

        let mut gate = CommitGate::new();
        match apply_batch(&mut *tx, records, &mut gate, Utc::now()).await {
            Ok(created_count) => {
                if let Err(e) = tx.commit().await {
                    gate.discard();
                    error!(error = %e, "Import commit failed");
                    return Err(self.reject(started_at, ImportRejection::batch(e.into())).await);
                }

                let released = gate.release(&self.event_bus);
                info!(
                    records = records.len(),
                    created_count,
                    events = released,
                    "Import batch committed"
                );

                if let Err(e) = self.audit.record_success(started_at, created_count).await {
                    error!(error = %e, "Failed to record successful import");
                }
                Ok(ImportOutcome { created_count })
            }
            Err(rejection) => {
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "Import rollback failed");
                }
                let discarded = gate.discard();
                warn!(
                    records = records.len(),
                    rejected = rejection.errors.len(),
                    discarded_events = discarded,
                    "Import batch rolled back"
                );
                Err(self.reject(started_at, rejection).await)
            }
        }
    }

    async fn reject(&self, started_at: DateTime<Utc>, rejection: ImportRejection) -> ImportRejection {
        if let Err(e) = self.audit.record_failure(started_at).await {
            error!(error = %e, "Failed to record failed import");
        }
        rejection
    }
}

//! Import audit log
//!
//! One immutable row per import attempt. Each row is written in its own
//! transaction so a failed import, whose own transaction rolled back, still
//! leaves a FAILED entry behind.

use crate::db::import_operations;
use crate::paging::{Page, PageRequest};
use chrono::{DateTime, Utc};
use inventory_common::db::{begin_write, ImportOperation, ImportStatus};
use inventory_common::events::{ChangeEvent, EntityKind, EventBus};
use inventory_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

#[derive(Clone)]
pub struct ImportAudit {
    db: SqlitePool,
    event_bus: EventBus,
}

impl ImportAudit {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    pub async fn record_success(&self, started_at: DateTime<Utc>, created_count: i64) -> Result<i64> {
        self.record(ImportStatus::Success, Some(created_count), started_at)
            .await
    }

    pub async fn record_failure(&self, started_at: DateTime<Utc>) -> Result<i64> {
        self.record(ImportStatus::Failed, None, started_at).await
    }

    async fn record(
        &self,
        status: ImportStatus,
        created_count: Option<i64>,
        started_at: DateTime<Utc>,
    ) -> Result<i64> {
        let finished_at = Utc::now();

        let mut tx = begin_write(&self.db).await?;
        let id =
            import_operations::insert(&mut *tx, status, created_count, started_at, finished_at)
                .await?;
        tx.commit().await?;

        self.event_bus
            .emit_lossy(ChangeEvent::updated(EntityKind::Imports, id));

        info!(
            operation_id = id,
            status = %status,
            created_count = ?created_count,
            duration_ms = (finished_at - started_at).num_milliseconds(),
            "Recorded import operation"
        );

        Ok(id)
    }

    pub async fn list(&self, request: &PageRequest) -> Result<Page<ImportOperation>> {
        let mut conn = self.db.acquire().await?;
        import_operations::list(&mut conn, request).await
    }

    pub async fn find(&self, id: i64) -> Result<ImportOperation> {
        let mut conn = self.db.acquire().await?;
        import_operations::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Import operation {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_common::db::init_database;
    use inventory_common::events::ChangeAction;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_records_are_written_and_announced() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let audit = ImportAudit::new(pool, bus);

        let started = Utc::now();
        let ok_id = audit.record_success(started, 4).await.unwrap();
        let failed_id = audit.record_failure(started).await.unwrap();

        let ok = audit.find(ok_id).await.unwrap();
        assert_eq!(ok.status, ImportStatus::Success);
        assert_eq!(ok.created_count, Some(4));
        assert!(ok.finished_at >= ok.started_at);

        let failed = audit.find(failed_id).await.unwrap();
        assert_eq!(failed.status, ImportStatus::Failed);
        assert_eq!(failed.created_count, None);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.entity, EntityKind::Imports);
        assert_eq!(first.action, ChangeAction::Updated);
        assert_eq!(first.id, Some(ok_id));
    }

    #[tokio::test]
    async fn test_find_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let audit = ImportAudit::new(pool, EventBus::new(8));

        assert!(matches!(audit.find(77).await, Err(Error::NotFound(_))));
    }
}

//! Import audit records

use crate::paging::{Page, PageRequest};
use chrono::{DateTime, Utc};
use inventory_common::db::{ImportOperation, ImportStatus};
use inventory_common::{Error, Result};
use sqlx::SqliteConnection;

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("startedAt", "started_at"),
    ("finishedAt", "finished_at"),
    ("status", "status"),
    ("createdCount", "created_count"),
];

#[derive(Debug, sqlx::FromRow)]
struct ImportOperationRow {
    id: i64,
    status: String,
    created_count: Option<i64>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl TryFrom<ImportOperationRow> for ImportOperation {
    type Error = Error;

    fn try_from(row: ImportOperationRow) -> Result<Self> {
        Ok(ImportOperation {
            id: row.id,
            status: row
                .status
                .parse::<ImportStatus>()
                .map_err(|e| Error::Internal(e.to_string()))?,
            created_count: row.created_count,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

pub async fn insert(
    conn: &mut SqliteConnection,
    status: ImportStatus,
    created_count: Option<i64>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO import_operations (status, created_count, started_at, finished_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(status.as_str())
    .bind(created_count)
    .bind(started_at)
    .bind(finished_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<ImportOperation>> {
    let row: Option<ImportOperationRow> = sqlx::query_as(
        "SELECT id, status, created_count, started_at, finished_at FROM import_operations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(ImportOperation::try_from).transpose()
}

pub async fn list(conn: &mut SqliteConnection, request: &PageRequest) -> Result<Page<ImportOperation>> {
    let order_by = request.order_by(SORT_COLUMNS, "id")?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM import_operations")
        .fetch_one(&mut *conn)
        .await?;

    let rows: Vec<ImportOperationRow> = sqlx::query_as(&format!(
        "SELECT id, status, created_count, started_at, finished_at FROM import_operations{} LIMIT ? OFFSET ?",
        order_by
    ))
    .bind(request.size)
    .bind(request.offset())
    .fetch_all(&mut *conn)
    .await?;

    let items = rows
        .into_iter()
        .map(ImportOperation::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, request, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::{PageLimits, PageParams, SortDir};
    use inventory_common::db::init_database;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_history_defaults_newest_first() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let now = Utc::now();
        let first = insert(&mut conn, ImportStatus::Success, Some(3), now, now).await.unwrap();
        let second = insert(&mut conn, ImportStatus::Failed, None, now, now).await.unwrap();

        let request = PageRequest::resolve(&PageParams::default(), PageLimits::default(), SortDir::Desc);
        let page = list(&mut conn, &request).await.unwrap();
        assert_eq!(page.items.iter().map(|o| o.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(page.dir, "desc");

        let failed = find_by_id(&mut conn, second).await.unwrap().unwrap();
        assert_eq!(failed.status, ImportStatus::Failed);
        assert_eq!(failed.created_count, None);
    }

    #[tokio::test]
    async fn test_history_rejects_unknown_sort() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let params = PageParams {
            sort: Some("durationMs".to_string()),
            ..Default::default()
        };
        let request = PageRequest::resolve(&params, PageLimits::default(), SortDir::Desc);
        assert!(matches!(
            list(&mut conn, &request).await,
            Err(Error::InvalidInput { .. })
        ));
    }
}

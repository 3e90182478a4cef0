//! Organization CRUD

use crate::db::organizations::{self, OrganizationFilter};
use crate::dto::OrganizationInput;
use crate::paging::{Page, PageRequest};
use crate::validation::validate_organization;
use chrono::Utc;
use inventory_common::db::{begin_write, Organization};
use inventory_common::events::{ChangeEvent, EntityKind, EventBus};
use inventory_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("Organization {} not found", id))
}

#[derive(Clone)]
pub struct OrganizationService {
    db: SqlitePool,
    event_bus: EventBus,
}

impl OrganizationService {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    pub async fn get(&self, id: i64) -> Result<Organization> {
        let mut conn = self.db.acquire().await?;
        organizations::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn list(
        &self,
        filter: &OrganizationFilter,
        request: &PageRequest,
    ) -> Result<Page<Organization>> {
        let mut conn = self.db.acquire().await?;
        organizations::list(&mut conn, filter, request).await
    }

    pub async fn create(&self, input: &OrganizationInput) -> Result<i64> {
        let org = validate_organization(input, "")?;

        let mut tx = begin_write(&self.db).await?;
        let id = organizations::insert(&mut *tx, &org, Utc::now()).await?;
        tx.commit().await?;

        info!(organization_id = id, "Created organization");
        self.event_bus
            .emit_lossy(ChangeEvent::created(EntityKind::Organization, id));
        Ok(id)
    }

    pub async fn update(&self, id: i64, input: &OrganizationInput) -> Result<()> {
        let org = validate_organization(input, "")?;

        let mut tx = begin_write(&self.db).await?;
        if !organizations::update(&mut *tx, id, &org).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;

        self.event_bus
            .emit_lossy(ChangeEvent::updated(EntityKind::Organization, id));
        Ok(())
    }

    /// Fails with a referential conflict while any product names it as manufacturer
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = begin_write(&self.db).await?;
        if !organizations::delete(&mut *tx, id).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;

        info!(organization_id = id, "Deleted organization");
        self.event_bus
            .emit_lossy(ChangeEvent::deleted(EntityKind::Organization, id));
        Ok(())
    }
}

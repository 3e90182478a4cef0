//! Person CRUD

use crate::db::persons::{self, PersonFilter};
use crate::dto::PersonInput;
use crate::paging::{Page, PageRequest};
use crate::validation::validate_person;
use inventory_common::db::{begin_write, Person};
use inventory_common::events::{ChangeEvent, EntityKind, EventBus};
use inventory_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("Person {} not found", id))
}

#[derive(Clone)]
pub struct PersonService {
    db: SqlitePool,
    event_bus: EventBus,
}

impl PersonService {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    pub async fn get(&self, id: i64) -> Result<Person> {
        let mut conn = self.db.acquire().await?;
        persons::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn list(&self, filter: &PersonFilter, request: &PageRequest) -> Result<Page<Person>> {
        let mut conn = self.db.acquire().await?;
        persons::list(&mut conn, filter, request).await
    }

    pub async fn create(&self, input: &PersonInput) -> Result<i64> {
        let person = validate_person(input, "")?;

        let mut tx = begin_write(&self.db).await?;
        let id = persons::insert(&mut *tx, &person).await?;
        tx.commit().await?;

        info!(person_id = id, "Created person");
        self.event_bus
            .emit_lossy(ChangeEvent::created(EntityKind::Person, id));
        Ok(id)
    }

    pub async fn update(&self, id: i64, input: &PersonInput) -> Result<()> {
        let person = validate_person(input, "")?;

        let mut tx = begin_write(&self.db).await?;
        if !persons::update(&mut *tx, id, &person).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;

        self.event_bus
            .emit_lossy(ChangeEvent::updated(EntityKind::Person, id));
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = begin_write(&self.db).await?;
        if !persons::delete(&mut *tx, id).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;

        info!(person_id = id, "Deleted person");
        self.event_bus
            .emit_lossy(ChangeEvent::deleted(EntityKind::Person, id));
        Ok(())
    }
}

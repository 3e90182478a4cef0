//! Product CRUD
//!
//! Products reference their manufacturer and owner by id. Reads return a
//! [`ProductView`] with both related rows embedded.

use crate::db::products::{self, ProductFilter};
use crate::db::{organizations, persons};
use crate::dto::ProductInput;
use crate::paging::{Page, PageRequest};
use crate::validation::{validate_product, ProductDraft};
use chrono::{DateTime, Utc};
use inventory_common::db::{
    begin_write, Coordinates, NewProduct, Organization, Person, Product, UnitOfMeasure,
};
use inventory_common::events::{ChangeEvent, EntityKind, EventBus};
use inventory_common::normalize::canonical_part_number;
use inventory_common::{Error, Result};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::info;

/// Product with manufacturer and owner resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub coordinates: Coordinates,
    pub creation_date: DateTime<Utc>,
    pub unit_of_measure: UnitOfMeasure,
    pub manufacturer: Organization,
    pub price: i64,
    pub manufacture_cost: Option<i64>,
    pub rating: i64,
    pub part_number: String,
    pub owner: Option<Person>,
}

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("Product {} not found", id))
}

/// Loads related rows once per id while building a set of views
#[derive(Default)]
struct RelatedRows {
    organizations: HashMap<i64, Organization>,
    persons: HashMap<i64, Person>,
}

impl RelatedRows {
    async fn view(&mut self, conn: &mut SqliteConnection, product: Product) -> Result<ProductView> {
        let manufacturer = match self.organizations.get(&product.manufacturer_id) {
            Some(org) => org.clone(),
            None => {
                let org = organizations::find_by_id(conn, product.manufacturer_id)
                    .await?
                    .ok_or_else(|| {
                        Error::Internal(format!(
                            "Product {} references missing organization {}",
                            product.id, product.manufacturer_id
                        ))
                    })?;
                self.organizations.insert(org.id, org.clone());
                org
            }
        };

        let owner = match product.owner_id {
            Some(owner_id) => {
                if !self.persons.contains_key(&owner_id) {
                    if let Some(person) = persons::find_by_id(conn, owner_id).await? {
                        self.persons.insert(person.id, person);
                    }
                }
                self.persons.get(&owner_id).cloned()
            }
            None => None,
        };

        Ok(ProductView {
            id: product.id,
            name: product.name,
            coordinates: product.coordinates,
            creation_date: product.creation_date,
            unit_of_measure: product.unit_of_measure,
            manufacturer,
            price: product.price,
            manufacture_cost: product.manufacture_cost,
            rating: product.rating,
            part_number: product.part_number,
            owner,
        })
    }
}

#[derive(Clone)]
pub struct ProductService {
    db: SqlitePool,
    event_bus: EventBus,
}

impl ProductService {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    pub async fn get(&self, id: i64) -> Result<ProductView> {
        let mut conn = self.db.acquire().await?;
        let product = products::find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        RelatedRows::default().view(&mut conn, product).await
    }

    pub async fn list(
        &self,
        filter: &ProductFilter,
        request: &PageRequest,
    ) -> Result<Page<ProductView>> {
        let mut conn = self.db.acquire().await?;
        let mut page = products::list(&mut conn, filter, request).await?;

        let mut related = RelatedRows::default();
        let rows = std::mem::take(&mut page.items);
        let mut views = Vec::with_capacity(rows.len());
        for product in rows {
            views.push(related.view(&mut conn, product).await?);
        }
        Ok(page.with_items(views))
    }

    pub async fn create(&self, input: &ProductInput) -> Result<i64> {
        let mut tx = begin_write(&self.db).await?;
        let product = checked_product(&mut *tx, input, None).await?;
        let id = products::insert(&mut *tx, &product, Utc::now()).await?;
        tx.commit().await?;

        info!(product_id = id, part_number = %product.part_number, "Created product");
        self.event_bus
            .emit_lossy(ChangeEvent::created(EntityKind::Product, id));
        Ok(id)
    }

    /// Replace a product; its creation date is kept
    pub async fn update(&self, id: i64, input: &ProductInput) -> Result<()> {
        let mut tx = begin_write(&self.db).await?;
        let product = checked_product(&mut *tx, input, Some(id)).await?;
        if !products::update(&mut *tx, id, &product).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;

        self.event_bus
            .emit_lossy(ChangeEvent::updated(EntityKind::Product, id));
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = begin_write(&self.db).await?;
        if !products::delete(&mut *tx, id).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;

        info!(product_id = id, "Deleted product");
        self.event_bus
            .emit_lossy(ChangeEvent::deleted(EntityKind::Product, id));
        Ok(())
    }
}

/// Validate, confirm the referenced rows exist and reject a business key
/// already held by another product
async fn checked_product(
    conn: &mut SqliteConnection,
    input: &ProductInput,
    current_id: Option<i64>,
) -> Result<NewProduct> {
    let draft = ProductDraft {
        name: input.name.as_deref(),
        coordinates: input.coordinates.as_ref(),
        unit_of_measure: input.unit_of_measure,
        manufacturer_id: input.manufacturer.and_then(|m| m.id),
        price: input.price,
        manufacture_cost: input.manufacture_cost,
        rating: input.rating,
        part_number: input.part_number.as_deref(),
        owner_id: input.owner.and_then(|o| o.id),
    };
    let product = validate_product(draft, "")?;

    if organizations::find_by_id(conn, product.manufacturer_id)
        .await?
        .is_none()
    {
        return Err(Error::invalid(
            "manufacturer.id",
            format!("Organization {} does not exist", product.manufacturer_id),
        ));
    }
    if let Some(owner_id) = product.owner_id {
        if persons::find_by_id(conn, owner_id).await?.is_none() {
            return Err(Error::invalid(
                "owner.id",
                format!("Person {} does not exist", owner_id),
            ));
        }
    }

    let key = canonical_part_number(&product.part_number)
        .ok_or_else(|| Error::invalid("partNumber", "partNumber required"))?;
    if let Some(existing) =
        products::find_by_business_key(conn, product.manufacturer_id, &key).await?
    {
        if Some(existing.id) != current_id {
            return Err(Error::ExistingRecordConflict(format!(
                "Product with same manufacturer and partNumber already exists (id={})",
                existing.id
            )));
        }
    }

    Ok(product)
}

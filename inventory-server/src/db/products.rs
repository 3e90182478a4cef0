//! Product queries

use super::push_contains;
use crate::paging::{Page, PageRequest};
use chrono::{DateTime, Utc};
use inventory_common::db::{Coordinates, NewProduct, Product, UnitOfMeasure};
use inventory_common::normalize::{canonical_part_number, search_text};
use inventory_common::{Error, Result};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT: &str = r#"
    SELECT p.id, p.name, p.coordinates_x, p.coordinates_y, p.creation_date, p.unit_of_measure,
           p.manufacturer_id, p.price, p.manufacture_cost, p.rating, p.part_number, p.owner_id
    FROM products p
    JOIN organizations m ON m.id = p.manufacturer_id
    LEFT JOIN persons o ON o.id = p.owner_id
"#;

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "p.id"),
    ("name", "p.name"),
    ("price", "p.price"),
    ("rating", "p.rating"),
    ("partNumber", "p.part_number"),
    ("unitOfMeasure", "p.unit_of_measure"),
    ("creationDate", "p.creation_date"),
    ("owner", "o.name"),
    ("manufacturer", "m.name"),
];

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    coordinates_x: f64,
    coordinates_y: f64,
    creation_date: DateTime<Utc>,
    unit_of_measure: String,
    manufacturer_id: i64,
    price: i64,
    manufacture_cost: Option<i64>,
    rating: i64,
    part_number: String,
    owner_id: Option<i64>,
}

impl TryFrom<ProductRow> for Product {
    type Error = Error;

    fn try_from(row: ProductRow) -> Result<Self> {
        Ok(Product {
            id: row.id,
            name: row.name,
            coordinates: Coordinates {
                x: row.coordinates_x,
                y: row.coordinates_y,
            },
            creation_date: row.creation_date,
            unit_of_measure: row
                .unit_of_measure
                .parse::<UnitOfMeasure>()
                .map_err(|e| Error::Internal(e.to_string()))?,
            manufacturer_id: row.manufacturer_id,
            price: row.price,
            manufacture_cost: row.manufacture_cost,
            rating: row.rating,
            part_number: row.part_number,
            owner_id: row.owner_id,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub name: Option<String>,
    pub part_number: Option<String>,
    /// Substring of the unit-of-measure name
    pub unit: Option<String>,
    pub organization_name: Option<String>,
    pub person_name: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    push_contains(qb, "p.name_search", filter.name.as_deref());
    push_contains(qb, "p.part_number_search", filter.part_number.as_deref());
    push_contains(qb, "p.unit_of_measure", filter.unit.as_deref());
    push_contains(qb, "m.name_search", filter.organization_name.as_deref());
    push_contains(qb, "o.name_search", filter.person_name.as_deref());
}

fn part_number_key(product: &NewProduct) -> Result<String> {
    canonical_part_number(&product.part_number)
        .ok_or_else(|| Error::invalid("partNumber", "partNumber required"))
}

fn duplicate_part_number(product: &NewProduct) -> impl FnOnce(Error) -> Error + '_ {
    move |err| match err {
        Error::ExistingRecordConflict(_) => Error::ExistingRecordConflict(format!(
            "Product with partNumber '{}' already exists for manufacturer id={}",
            product.part_number, product.manufacturer_id
        )),
        other => other,
    }
}

fn missing_reference() -> String {
    "Manufacturer or owner does not exist".to_string()
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!("{} WHERE p.id = ?", SELECT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Product::try_from).transpose()
}

/// Look up by (manufacturer, canonical part number)
pub async fn find_by_business_key(
    conn: &mut SqliteConnection,
    manufacturer_id: i64,
    part_number_key: &str,
) -> Result<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "{} WHERE p.manufacturer_id = ? AND p.part_number_key = ?",
        SELECT
    ))
    .bind(manufacturer_id)
    .bind(part_number_key)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(Product::try_from).transpose()
}

/// Insert and return the new id; `creation_date` is stored once and never updated
pub async fn insert(
    conn: &mut SqliteConnection,
    product: &NewProduct,
    creation_date: DateTime<Utc>,
) -> Result<i64> {
    let key = part_number_key(product)?;

    let result = sqlx::query(
        r#"
        INSERT INTO products (
            name, coordinates_x, coordinates_y, creation_date, unit_of_measure,
            manufacturer_id, price, manufacture_cost, rating, part_number, part_number_key, owner_id,
            name_search, part_number_search
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&product.name)
    .bind(product.coordinates.x)
    .bind(product.coordinates.y)
    .bind(creation_date)
    .bind(product.unit_of_measure.as_str())
    .bind(product.manufacturer_id)
    .bind(product.price)
    .bind(product.manufacture_cost)
    .bind(product.rating)
    .bind(&product.part_number)
    .bind(key)
    .bind(product.owner_id)
    .bind(search_text(&product.name))
    .bind(search_text(&product.part_number))
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_write(e, missing_reference))
    .map_err(duplicate_part_number(product))?;

    Ok(result.last_insert_rowid())
}

/// Replace every mutable field, leaving `creation_date` untouched
pub async fn update(conn: &mut SqliteConnection, id: i64, product: &NewProduct) -> Result<bool> {
    let key = part_number_key(product)?;

    let result = sqlx::query(
        r#"
        UPDATE products SET
            name = ?, coordinates_x = ?, coordinates_y = ?, unit_of_measure = ?,
            manufacturer_id = ?, price = ?, manufacture_cost = ?, rating = ?,
            part_number = ?, part_number_key = ?, owner_id = ?,
            name_search = ?, part_number_search = ?
        WHERE id = ?
        "#,
    )
    .bind(&product.name)
    .bind(product.coordinates.x)
    .bind(product.coordinates.y)
    .bind(product.unit_of_measure.as_str())
    .bind(product.manufacturer_id)
    .bind(product.price)
    .bind(product.manufacture_cost)
    .bind(product.rating)
    .bind(&product.part_number)
    .bind(key)
    .bind(product.owner_id)
    .bind(search_text(&product.name))
    .bind(search_text(&product.part_number))
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_write(e, missing_reference))
    .map_err(duplicate_part_number(product))?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &ProductFilter,
    request: &PageRequest,
) -> Result<Page<Product>> {
    let order_by = request.order_by(SORT_COLUMNS, "p.id")?;

    let mut count_query = QueryBuilder::new(
        r#"
        SELECT COUNT(*) FROM products p
        JOIN organizations m ON m.id = p.manufacturer_id
        LEFT JOIN persons o ON o.id = p.owner_id
        WHERE 1=1
        "#,
    );
    push_filters(&mut count_query, filter);
    let total: i64 = count_query.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut select = QueryBuilder::new(format!("{} WHERE 1=1", SELECT));
    push_filters(&mut select, filter);
    select
        .push(order_by)
        .push(" LIMIT ")
        .push_bind(request.size)
        .push(" OFFSET ")
        .push_bind(request.offset());
    let rows = select
        .build_query_as::<ProductRow>()
        .fetch_all(&mut *conn)
        .await?;

    let items = rows
        .into_iter()
        .map(Product::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, request, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::organizations;
    use inventory_common::db::{init_database, Address, Location, NewOrganization};
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqlitePool, i64) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let town = Location {
            x: 0,
            y: 0,
            name: "Town".to_string(),
        };
        let org = NewOrganization {
            name: "Acme".to_string(),
            full_name: Some("Acme Corp".to_string()),
            annual_turnover: 1.0,
            employees_count: 1,
            rating: 1,
            official_address: Address {
                zip_code: "1".to_string(),
                town: town.clone(),
            },
            postal_address: Address {
                zip_code: "2".to_string(),
                town,
            },
        };
        let mut conn = pool.acquire().await.unwrap();
        let org_id = organizations::insert(&mut conn, &org, Utc::now()).await.unwrap();
        drop(conn);
        (dir, pool, org_id)
    }

    fn product(manufacturer_id: i64, part_number: &str) -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            coordinates: Coordinates { x: 1.5, y: -2.0 },
            unit_of_measure: UnitOfMeasure::Boxes,
            manufacturer_id,
            price: 10,
            manufacture_cost: Some(0),
            rating: 4,
            part_number: part_number.to_string(),
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn test_business_key_uses_canonical_part_number() {
        let (_dir, pool, org_id) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, &product(org_id, "ab–100"), Utc::now()).await.unwrap();
        let found = find_by_business_key(&mut conn, org_id, "AB-100").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.part_number, "ab–100");

        let err = insert(&mut conn, &product(org_id, "AB_100"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, Error::ExistingRecordConflict(_)));
    }

    #[tokio::test]
    async fn test_update_preserves_creation_date() {
        let (_dir, pool, org_id) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let created = Utc::now();
        let id = insert(&mut conn, &product(org_id, "X-1"), created).await.unwrap();

        let mut changed = product(org_id, "X-2");
        changed.price = 99;
        assert!(update(&mut conn, id, &changed).await.unwrap());

        let stored = find_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(stored.price, 99);
        assert_eq!(stored.part_number, "X-2");
        assert_eq!(
            stored.creation_date.timestamp_millis(),
            created.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_missing_manufacturer_is_referential_conflict() {
        let (_dir, pool, _org_id) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let err = insert(&mut conn, &product(4242, "Z-1"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialConflict(_)));
    }

    #[tokio::test]
    async fn test_referenced_manufacturer_cannot_be_deleted() {
        let (_dir, pool, org_id) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        insert(&mut conn, &product(org_id, "Y-1"), Utc::now()).await.unwrap();
        let err = organizations::delete(&mut conn, org_id).await.unwrap_err();
        match err {
            Error::ReferentialConflict(msg) => assert!(msg.contains("manufacturer")),
            other => panic!("unexpected {:?}", other),
        }
    }
}

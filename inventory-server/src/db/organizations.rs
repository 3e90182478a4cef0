//! Organization queries

use super::push_contains;
use crate::paging::{Page, PageRequest};
use chrono::{DateTime, Utc};
use inventory_common::db::{Address, Location, NewOrganization, Organization};
use inventory_common::normalize::{canonical_key_opt, search_text, search_text_opt};
use inventory_common::{Error, Result};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT: &str = r#"
    SELECT o.id, o.name, o.full_name, o.annual_turnover, o.employees_count, o.rating,
           o.official_zip_code, o.official_town_x, o.official_town_y, o.official_town_name,
           o.postal_zip_code, o.postal_town_x, o.postal_town_y, o.postal_town_name,
           o.created_at
    FROM organizations o
"#;

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "o.id"),
    ("name", "o.name"),
    ("fullName", "o.full_name"),
    ("employeesCount", "o.employees_count"),
    ("annualTurnover", "o.annual_turnover"),
    ("rating", "o.rating"),
    ("createdAt", "o.created_at"),
    ("officialCity", "o.official_town_name"),
    ("postalCity", "o.postal_town_name"),
];

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: i64,
    name: String,
    full_name: Option<String>,
    annual_turnover: f64,
    employees_count: i64,
    rating: i64,
    official_zip_code: String,
    official_town_x: i64,
    official_town_y: i64,
    official_town_name: String,
    postal_zip_code: String,
    postal_town_x: i64,
    postal_town_y: i64,
    postal_town_name: String,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            full_name: row.full_name,
            annual_turnover: row.annual_turnover,
            employees_count: row.employees_count,
            rating: row.rating,
            official_address: Address {
                zip_code: row.official_zip_code,
                town: Location {
                    x: row.official_town_x,
                    y: row.official_town_y,
                    name: row.official_town_name,
                },
            },
            postal_address: Address {
                zip_code: row.postal_zip_code,
                town: Location {
                    x: row.postal_town_x,
                    y: row.postal_town_y,
                    name: row.postal_town_name,
                },
            },
            created_at: row.created_at,
        }
    }
}

/// List filters; each is a case-insensitive substring match
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationFilter {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub official_town_name: Option<String>,
    pub postal_town_name: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &OrganizationFilter) {
    push_contains(qb, "o.name_search", filter.name.as_deref());
    push_contains(qb, "o.full_name_search", filter.full_name.as_deref());
    push_contains(qb, "o.official_town_search", filter.official_town_name.as_deref());
    push_contains(qb, "o.postal_town_search", filter.postal_town_name.as_deref());
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Organization>> {
    let row: Option<OrganizationRow> = sqlx::query_as(&format!("{} WHERE o.id = ?", SELECT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Organization::from))
}

/// Look up by canonical full-name key (see [`canonical_key_opt`])
pub async fn find_by_full_name_key(
    conn: &mut SqliteConnection,
    key: &str,
) -> Result<Option<Organization>> {
    let row: Option<OrganizationRow> =
        sqlx::query_as(&format!("{} WHERE o.full_name_key = ?", SELECT))
            .bind(key)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(Organization::from))
}

fn duplicate_full_name(org: &NewOrganization) -> impl FnOnce(Error) -> Error + '_ {
    move |err| match err {
        Error::ExistingRecordConflict(_) => Error::ExistingRecordConflict(format!(
            "Organization with full name '{}' already exists",
            org.full_name.as_deref().unwrap_or_default()
        )),
        other => other,
    }
}

/// Insert and return the new id
pub async fn insert(
    conn: &mut SqliteConnection,
    org: &NewOrganization,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let key = canonical_key_opt(org.full_name.as_deref(), true);

    let result = sqlx::query(
        r#"
        INSERT INTO organizations (
            name, full_name, full_name_key, annual_turnover, employees_count, rating,
            official_zip_code, official_town_x, official_town_y, official_town_name,
            postal_zip_code, postal_town_x, postal_town_y, postal_town_name,
            name_search, full_name_search, official_town_search, postal_town_search,
            created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&org.name)
    .bind(&org.full_name)
    .bind(key)
    .bind(org.annual_turnover)
    .bind(org.employees_count)
    .bind(org.rating)
    .bind(&org.official_address.zip_code)
    .bind(org.official_address.town.x)
    .bind(org.official_address.town.y)
    .bind(&org.official_address.town.name)
    .bind(&org.postal_address.zip_code)
    .bind(org.postal_address.town.x)
    .bind(org.postal_address.town.y)
    .bind(&org.postal_address.town.name)
    .bind(search_text(&org.name))
    .bind(search_text_opt(org.full_name.as_deref()))
    .bind(search_text(&org.official_address.town.name))
    .bind(search_text(&org.postal_address.town.name))
    .bind(created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_write(e, || "Organization references a missing row".to_string()))
    .map_err(duplicate_full_name(org))?;

    Ok(result.last_insert_rowid())
}

/// Replace every mutable field; returns false when no row has this id
pub async fn update(conn: &mut SqliteConnection, id: i64, org: &NewOrganization) -> Result<bool> {
    let key = canonical_key_opt(org.full_name.as_deref(), true);

    let result = sqlx::query(
        r#"
        UPDATE organizations SET
            name = ?, full_name = ?, full_name_key = ?, annual_turnover = ?,
            employees_count = ?, rating = ?,
            official_zip_code = ?, official_town_x = ?, official_town_y = ?, official_town_name = ?,
            postal_zip_code = ?, postal_town_x = ?, postal_town_y = ?, postal_town_name = ?,
            name_search = ?, full_name_search = ?, official_town_search = ?, postal_town_search = ?
        WHERE id = ?
        "#,
    )
    .bind(&org.name)
    .bind(&org.full_name)
    .bind(key)
    .bind(org.annual_turnover)
    .bind(org.employees_count)
    .bind(org.rating)
    .bind(&org.official_address.zip_code)
    .bind(org.official_address.town.x)
    .bind(org.official_address.town.y)
    .bind(&org.official_address.town.name)
    .bind(&org.postal_address.zip_code)
    .bind(org.postal_address.town.x)
    .bind(org.postal_address.town.y)
    .bind(&org.postal_address.town.name)
    .bind(search_text(&org.name))
    .bind(search_text_opt(org.full_name.as_deref()))
    .bind(search_text(&org.official_address.town.name))
    .bind(search_text(&org.postal_address.town.name))
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_write(e, || "Organization references a missing row".to_string()))
    .map_err(duplicate_full_name(org))?;

    Ok(result.rows_affected() > 0)
}

/// Delete by id; fails with a referential conflict while products use it
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::from_write(e, || {
                "Cannot delete manufacturer: products reference it".to_string()
            })
        })?;

    Ok(result.rows_affected() > 0)
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &OrganizationFilter,
    request: &PageRequest,
) -> Result<Page<Organization>> {
    let order_by = request.order_by(SORT_COLUMNS, "o.id")?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM organizations o WHERE 1=1");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;

    let mut select = QueryBuilder::new(format!("{} WHERE 1=1", SELECT));
    push_filters(&mut select, filter);
    select
        .push(order_by)
        .push(" LIMIT ")
        .push_bind(request.size)
        .push(" OFFSET ")
        .push_bind(request.offset());
    let rows = select
        .build_query_as::<OrganizationRow>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(Page::new(
        rows.into_iter().map(Organization::from).collect(),
        request,
        total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::{PageLimits, PageParams, SortDir};
    use inventory_common::db::init_database;
    use tempfile::TempDir;

    fn new_org(name: &str, full_name: Option<&str>) -> NewOrganization {
        let town = Location {
            x: 1,
            y: 2,
            name: "Springfield".to_string(),
        };
        NewOrganization {
            name: name.to_string(),
            full_name: full_name.map(str::to_string),
            annual_turnover: 100.0,
            employees_count: 5,
            rating: 3,
            official_address: Address {
                zip_code: "11111".to_string(),
                town: town.clone(),
            },
            postal_address: Address {
                zip_code: "22222".to_string(),
                town,
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_key() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, &new_org("Acme", Some("Acme  Corp")), Utc::now())
            .await
            .unwrap();

        let found = find_by_full_name_key(&mut conn, "acme corp").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.full_name.as_deref(), Some("Acme  Corp"));
        assert_eq!(found.postal_address.zip_code, "22222");
    }

    #[tokio::test]
    async fn test_duplicate_full_name_is_conflict() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        insert(&mut conn, &new_org("A", Some("Acme Corp")), Utc::now()).await.unwrap();
        let err = insert(&mut conn, &new_org("B", Some(" ACME corp ")), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExistingRecordConflict(_)));

        // organizations without a full name never collide
        insert(&mut conn, &new_org("C", None), Utc::now()).await.unwrap();
        insert(&mut conn, &new_org("D", None), Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        for (name, full) in [("Beta", "Beta LLC"), ("Alpha", "Alpha_Inc"), ("Gamma", "AlphaX")] {
            insert(&mut conn, &new_org(name, Some(full)), Utc::now()).await.unwrap();
        }

        let params = PageParams {
            sort: Some("name".to_string()),
            ..Default::default()
        };
        let request = PageRequest::resolve(&params, PageLimits::default(), SortDir::Asc);

        let all = list(&mut conn, &OrganizationFilter::default(), &request).await.unwrap();
        let names: Vec<_> = all.items.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
        assert_eq!(all.total_elements, 3);

        // underscore is literal, not a single-character wildcard
        let filter = OrganizationFilter {
            full_name: Some("alpha_".to_string()),
            ..Default::default()
        };
        let page = list(&mut conn, &filter, &request).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Alpha");
    }

    #[tokio::test]
    async fn test_list_filters_fold_non_ascii_case() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, &new_org("Москва Завод", Some("ÖL Werke")), Utc::now())
            .await
            .unwrap();
        insert(&mut conn, &new_org("Acme", None), Utc::now()).await.unwrap();

        let request =
            PageRequest::resolve(&PageParams::default(), PageLimits::default(), SortDir::Asc);
        for (name, full_name) in [(Some("москва"), None), (Some("МОСКВА"), None), (None, Some("öl"))] {
            let filter = OrganizationFilter {
                name: name.map(str::to_string),
                full_name: full_name.map(str::to_string),
                ..Default::default()
            };
            let page = list(&mut conn, &filter, &request).await.unwrap();
            assert_eq!(page.total_elements, 1, "filter {:?}", filter);
            assert_eq!(page.items[0].id, id);
        }

        // renaming refreshes the search column
        update(&mut conn, id, &new_org("Zavod", Some("ÖL Werke"))).await.unwrap();
        let filter = OrganizationFilter {
            name: Some("москва".to_string()),
            ..Default::default()
        };
        assert_eq!(list(&mut conn, &filter, &request).await.unwrap().total_elements, 0);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_sort() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let params = PageParams {
            sort: Some("password".to_string()),
            ..Default::default()
        };
        let request = PageRequest::resolve(&params, PageLimits::default(), SortDir::Asc);
        let err = list(&mut conn, &OrganizationFilter::default(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
}

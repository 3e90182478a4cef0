//! Person queries

use super::push_contains;
use crate::paging::{Page, PageRequest};
use inventory_common::db::{Color, Country, Location, NewPerson, Person};
use inventory_common::normalize::{canonical_key, search_text};
use inventory_common::{Error, Result};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const SELECT: &str = r#"
    SELECT p.id, p.name, p.eye_color, p.hair_color, p.nationality, p.height,
           p.location_x, p.location_y, p.location_name
    FROM persons p
"#;

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("id", "p.id"),
    ("name", "p.name"),
    ("height", "p.height"),
    ("nationality", "p.nationality"),
    ("eyeColor", "p.eye_color"),
    ("hairColor", "p.hair_color"),
    ("locationName", "p.location_name"),
    ("locationX", "p.location_x"),
    ("locationY", "p.location_y"),
];

#[derive(Debug, sqlx::FromRow)]
struct PersonRow {
    id: i64,
    name: String,
    eye_color: Option<String>,
    hair_color: Option<String>,
    nationality: String,
    height: f64,
    location_x: Option<i64>,
    location_y: Option<i64>,
    location_name: Option<String>,
}

impl TryFrom<PersonRow> for Person {
    type Error = Error;

    fn try_from(row: PersonRow) -> Result<Self> {
        let color = |value: Option<String>| -> Result<Option<Color>> {
            value
                .map(|v| v.parse::<Color>().map_err(|e| Error::Internal(e.to_string())))
                .transpose()
        };

        let location = match (row.location_x, row.location_y, row.location_name) {
            (Some(x), Some(y), Some(name)) => Some(Location { x, y, name }),
            _ => None,
        };

        Ok(Person {
            id: row.id,
            name: row.name,
            eye_color: color(row.eye_color)?,
            hair_color: color(row.hair_color)?,
            nationality: row
                .nationality
                .parse::<Country>()
                .map_err(|e| Error::Internal(e.to_string()))?,
            height: row.height,
            location,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonFilter {
    pub name: Option<String>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub nationality: Option<String>,
    pub location_name: Option<String>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PersonFilter) {
    push_contains(qb, "p.name_search", filter.name.as_deref());
    push_contains(qb, "p.eye_color", filter.eye_color.as_deref());
    push_contains(qb, "p.hair_color", filter.hair_color.as_deref());
    push_contains(qb, "p.nationality", filter.nationality.as_deref());
    push_contains(qb, "p.location_name_search", filter.location_name.as_deref());
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Person>> {
    let row: Option<PersonRow> = sqlx::query_as(&format!("{} WHERE p.id = ?", SELECT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Person::try_from).transpose()
}

/// Look up by canonical (case-folded) name key
pub async fn find_by_name_key(conn: &mut SqliteConnection, key: &str) -> Result<Option<Person>> {
    let row: Option<PersonRow> = sqlx::query_as(&format!("{} WHERE p.name_key = ?", SELECT))
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(Person::try_from).transpose()
}

fn name_key(person: &NewPerson) -> Result<String> {
    canonical_key(&person.name, true).ok_or_else(|| Error::invalid("name", "name required"))
}

fn duplicate_name(person: &NewPerson) -> impl FnOnce(Error) -> Error + '_ {
    move |err| match err {
        Error::ExistingRecordConflict(_) => Error::ExistingRecordConflict(format!(
            "Person with name '{}' already exists",
            person.name
        )),
        other => other,
    }
}

pub async fn insert(conn: &mut SqliteConnection, person: &NewPerson) -> Result<i64> {
    let key = name_key(person)?;
    let location = person.location.as_ref();

    let result = sqlx::query(
        r#"
        INSERT INTO persons (
            name, name_key, eye_color, hair_color, nationality, height,
            location_x, location_y, location_name, name_search, location_name_search
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&person.name)
    .bind(key)
    .bind(person.eye_color.map(|c| c.as_str()))
    .bind(person.hair_color.map(|c| c.as_str()))
    .bind(person.nationality.as_str())
    .bind(person.height)
    .bind(location.map(|l| l.x))
    .bind(location.map(|l| l.y))
    .bind(location.map(|l| l.name.as_str()))
    .bind(search_text(&person.name))
    .bind(location.map(|l| search_text(&l.name)))
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_write(e, || "Person references a missing row".to_string()))
    .map_err(duplicate_name(person))?;

    Ok(result.last_insert_rowid())
}

pub async fn update(conn: &mut SqliteConnection, id: i64, person: &NewPerson) -> Result<bool> {
    let key = name_key(person)?;
    let location = person.location.as_ref();

    let result = sqlx::query(
        r#"
        UPDATE persons SET
            name = ?, name_key = ?, eye_color = ?, hair_color = ?, nationality = ?, height = ?,
            location_x = ?, location_y = ?, location_name = ?,
            name_search = ?, location_name_search = ?
        WHERE id = ?
        "#,
    )
    .bind(&person.name)
    .bind(key)
    .bind(person.eye_color.map(|c| c.as_str()))
    .bind(person.hair_color.map(|c| c.as_str()))
    .bind(person.nationality.as_str())
    .bind(person.height)
    .bind(location.map(|l| l.x))
    .bind(location.map(|l| l.y))
    .bind(location.map(|l| l.name.as_str()))
    .bind(search_text(&person.name))
    .bind(location.map(|l| search_text(&l.name)))
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| Error::from_write(e, || "Person references a missing row".to_string()))
    .map_err(duplicate_name(person))?;

    Ok(result.rows_affected() > 0)
}

/// Delete by id; fails with a referential conflict while products use it
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM persons WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::from_write(e, || "Cannot delete owner: products reference it".to_string())
        })?;

    Ok(result.rows_affected() > 0)
}

pub async fn list(
    conn: &mut SqliteConnection,
    filter: &PersonFilter,
    request: &PageRequest,
) -> Result<Page<Person>> {
    let order_by = request.order_by(SORT_COLUMNS, "p.id")?;

    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM persons p WHERE 1=1");
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
        .build_query_as::<PersonRow>()
        .fetch_all(&mut *conn)
        .await?;

    let items = rows
        .into_iter()
        .map(Person::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(Page::new(items, request, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paging::{PageLimits, PageParams, SortDir};
    use inventory_common::db::init_database;
    use tempfile::TempDir;

    fn person(name: &str, nationality: Country) -> NewPerson {
        NewPerson {
            name: name.to_string(),
            eye_color: Some(Color::Green),
            hair_color: None,
            nationality,
            height: 180.0,
            location: Some(Location {
                x: 3,
                y: 4,
                name: "Home".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_round_trip_and_case_folded_key() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let id = insert(&mut conn, &person("Ann  Lee", Country::Japan)).await.unwrap();
        let found = find_by_name_key(&mut conn, "ann lee").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.eye_color, Some(Color::Green));
        assert_eq!(found.hair_color, None);
        assert_eq!(found.location.unwrap().name, "Home");

        let err = insert(&mut conn, &person("ANN LEE", Country::India)).await.unwrap_err();
        assert!(matches!(err, Error::ExistingRecordConflict(_)));
    }

    #[tokio::test]
    async fn test_enum_filter_matches_substring() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        insert(&mut conn, &person("A", Country::SouthKorea)).await.unwrap();
        insert(&mut conn, &person("B", Country::UnitedKingdom)).await.unwrap();
        insert(&mut conn, &person("C", Country::Russia)).await.unwrap();

        let request = PageRequest::resolve(&PageParams::default(), PageLimits::default(), SortDir::Asc);
        let filter = PersonFilter {
            nationality: Some("kor".to_string()),
            ..Default::default()
        };
        let page = list(&mut conn, &filter, &request).await.unwrap();
        assert_eq!(page.total_elements, 1);
        assert_eq!(page.items[0].nationality, Country::SouthKorea);
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("t.db")).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        assert!(!update(&mut conn, 99, &person("X", Country::Usa)).await.unwrap());
        assert!(!delete(&mut conn, 99).await.unwrap());
    }
}

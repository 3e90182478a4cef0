//! Person endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use inventory_common::db::Person;

use crate::db::persons::PersonFilter;
use crate::dto::PersonInput;
use crate::paging::{Page, PageParams, PageRequest, SortDir};
use crate::{ApiResult, AppState};

pub fn person_routes() -> Router<AppState> {
    Router::new()
        .route("/person", get(list_persons).post(create_person))
        .route(
            "/person/:id",
            get(get_person).put(update_person).delete(delete_person),
        )
}

pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Person>> {
    Ok(Json(state.persons.get(id).await?))
}

/// GET /person
///
/// Filters: name, eyeColor, hairColor, nationality, locationName. Color and
/// nationality filters match a substring of the stored name.
pub async fn list_persons(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
    filter: Result<Query<PersonFilter>, QueryRejection>,
) -> ApiResult<Json<Page<Person>>> {
    let Query(params) = params?;
    let Query(filter) = filter?;
    let request = PageRequest::resolve(&params, state.page_limits, SortDir::Asc);
    Ok(Json(state.persons.list(&filter, &request).await?))
}

pub async fn create_person(
    State(state): State<AppState>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> ApiResult<Json<i64>> {
    let Json(input) = body?;
    Ok(Json(state.persons.create(&input).await?))
}

pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(input) = body?;
    state.persons.update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.persons.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Organization endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use inventory_common::db::Organization;

use crate::db::organizations::OrganizationFilter;
use crate::dto::OrganizationInput;
use crate::paging::{Page, PageParams, PageRequest, SortDir};
use crate::{ApiResult, AppState};

pub fn organization_routes() -> Router<AppState> {
    Router::new()
        .route("/organization", get(list_organizations).post(create_organization))
        .route(
            "/organization/:id",
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
}

/// GET /organization/:id
pub async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(state.organizations.get(id).await?))
}

/// GET /organization
///
/// Paged list. Filters: name, fullName, officialTownName, postalTownName.
pub async fn list_organizations(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
    filter: Result<Query<OrganizationFilter>, QueryRejection>,
) -> ApiResult<Json<Page<Organization>>> {
    let Query(params) = params?;
    let Query(filter) = filter?;
    let request = PageRequest::resolve(&params, state.page_limits, SortDir::Asc);
    Ok(Json(state.organizations.list(&filter, &request).await?))
}

/// POST /organization, returns the new id
pub async fn create_organization(
    State(state): State<AppState>,
    body: Result<Json<OrganizationInput>, JsonRejection>,
) -> ApiResult<Json<i64>> {
    let Json(input) = body?;
    Ok(Json(state.organizations.create(&input).await?))
}

/// PUT /organization/:id
pub async fn update_organization(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<OrganizationInput>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(input) = body?;
    state.organizations.update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /organization/:id
pub async fn delete_organization(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.organizations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

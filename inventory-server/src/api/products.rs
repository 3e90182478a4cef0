//! Product endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::db::products::ProductFilter;
use crate::dto::ProductInput;
use crate::paging::{Page, PageParams, PageRequest, SortDir};
use crate::services::ProductView;
use crate::{ApiResult, AppState};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/product", get(list_products).post(create_product))
        .route(
            "/product/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProductView>> {
    Ok(Json(state.products.get(id).await?))
}

/// GET /product
///
/// Filters: name, partNumber, unit, organizationName, personName. Sorting by
/// `owner` or `manufacturer` orders by the related row's name.
pub async fn list_products(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
    filter: Result<Query<ProductFilter>, QueryRejection>,
) -> ApiResult<Json<Page<ProductView>>> {
    let Query(params) = params?;
    let Query(filter) = filter?;
    let request = PageRequest::resolve(&params, state.page_limits, SortDir::Asc);
    Ok(Json(state.products.list(&filter, &request).await?))
}

/// POST /product
///
/// Manufacturer and owner are referenced by id (`{"manufacturer": {"id": 1}}`).
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Json<i64>> {
    let Json(input) = body?;
    Ok(Json(state.products.create(&input).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(input) = body?;
    state.products.update(id, &input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Bulk import and import history endpoints

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use inventory_common::db::ImportOperation;
use inventory_common::Violation;
use serde::Serialize;

use crate::import::{BatchSource, ImportOutcome, ImportRejection};
use crate::paging::{Page, PageParams, PageRequest, SortDir};
use crate::{ApiResult, AppState};

pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import", get(list_imports))
        .route("/import/:id", get(get_import))
        .route("/import/product", post(import_products))
        .route("/import/product/upload", post(upload_products))
}

/// Import result body
///
/// `{createdCount}` on success, `{createdCount: 0, errors: [...]}` otherwise.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub created_count: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Violation>,
}

impl ImportResponse {
    fn rejected(errors: Vec<Violation>) -> Self {
        Self {
            created_count: 0,
            errors,
        }
    }
}

fn respond(result: Result<ImportOutcome, ImportRejection>) -> Response {
    match result {
        Ok(outcome) => Json(ImportResponse {
            created_count: outcome.created_count,
            errors: Vec::new(),
        })
        .into_response(),
        Err(rejection) => {
            let status = if rejection.has_store_failure() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else if rejection.has_conflict() {
                StatusCode::CONFLICT
            } else {
                StatusCode::BAD_REQUEST
            };
            (status, Json(ImportResponse::rejected(rejection.violations()))).into_response()
        }
    }
}

/// POST /import/product
///
/// Body is a JSON array of import records; the whole batch commits or none of it.
pub async fn import_products(State(state): State<AppState>, body: Bytes) -> Response {
    respond(state.importer.import_bytes(&body, BatchSource::Body).await)
}

fn bad_file(message: impl Into<String>) -> Response {
    let errors = vec![Violation::batch("file", message)];
    (StatusCode::BAD_REQUEST, Json(ImportResponse::rejected(errors))).into_response()
}

fn is_json_file(content_type: Option<&str>) -> bool {
    matches!(content_type, Some(ct) if ct.contains("json") || ct == "application/octet-stream")
}

/// POST /import/product/upload
///
/// `multipart/form-data` with the batch in a part named `file`, whose content
/// type must be a JSON type or application/octet-stream. Other parts are ignored.
pub async fn upload_products(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return bad_file(rejection.body_text()),
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return bad_file("File is required"),
            Err(e) => return bad_file(e.body_text()),
        };
        if field.name() != Some("file") {
            continue;
        }

        if !is_json_file(field.content_type()) {
            return bad_file("Expected JSON file");
        }
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return bad_file(e.body_text()),
        };
        tracing::debug!("Upload file part: {} bytes", bytes.len());
        return respond(state.importer.import_bytes(&bytes, BatchSource::File).await);
    }
}

/// GET /import
///
/// Paged audit history, newest first unless `dir` says otherwise. Sortable by
/// id, startedAt, finishedAt, status and createdCount.
pub async fn list_imports(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> ApiResult<Json<Page<ImportOperation>>> {
    let Query(params) = params?;
    let request = PageRequest::resolve(&params, state.page_limits, SortDir::Desc);
    Ok(Json(state.importer.audit().list(&request).await?))
}

/// GET /import/:id
pub async fn get_import(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ImportOperation>> {
    Ok(Json(state.importer.audit().find(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_json_file() {
        assert!(is_json_file(Some("application/json")));
        assert!(is_json_file(Some("application/json; charset=utf-8")));
        assert!(is_json_file(Some("application/octet-stream")));
        assert!(!is_json_file(Some("text/csv")));
        assert!(!is_json_file(None));
    }
}

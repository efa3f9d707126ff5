/// CSV import and export
///
/// ```text
/// GET  /v1/export/employees?company_id=…      -> text/csv attachment
/// POST /v1/import/employees?company_id=…      <- text/csv body
/// ```
///
/// Imports run in one transaction. Rows whose natural key already exists are
/// skipped, malformed rows are reported with their line number, and the rest
/// are inserted.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
    routes::authorize,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    Extension,
};
use bytes::Bytes;
use hrms_shared::{
    auth::{
        authorization::{Action, Resource},
        middleware::AuthContext,
    },
    models::company::Company,
    transfer::{self, ImportReport, TransferEntity},
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct TransferQuery {
    pub company_id: Option<Uuid>,
}

fn csv_headers(entity: TransferEntity) -> ApiResult<HeaderMap> {
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        entity.file_name()
    ))
    .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(headers)
}

/// Exports every scoped row of an entity
///
/// # Errors
///
/// - `403 Forbidden`: `company_id` outside the caller's scope
/// - `404 Not Found`: unknown entity
pub async fn export_entity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(entity): Path<String>,
    Query(query): Query<TransferQuery>,
) -> ApiResult<impl IntoResponse> {
    let scope = authorize(&state, &auth, Resource::Transfer, Action::Read).await?;
    let entity: TransferEntity = entity.parse()?;

    let body = transfer::export(&state.db, entity, scope.company_filter(query.company_id)?).await?;

    tracing::info!(
        entity = entity.as_str(),
        bytes = body.len(),
        user_id = %auth.user_id,
        "Exported CSV"
    );

    Ok((csv_headers(entity)?, body))
}

/// Imports a CSV body into one company
///
/// # Errors
///
/// - `403 Forbidden`: company outside the caller's scope
/// - `404 Not Found`: unknown or export-only entity
/// - `422 Unprocessable Entity`: missing `company_id`, unknown company,
///   empty body or a bad header row
pub async fn import_entity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(entity): Path<String>,
    Query(query): Query<TransferQuery>,
    body: Bytes,
) -> ApiResult<ApiResponse<ImportReport>> {
    let scope = authorize(&state, &auth, Resource::Transfer, Action::Write).await?;
    let entity: TransferEntity = entity.parse()?;

    if !entity.importable() {
        return Err(transfer::TransferError::NotImportable(entity).into());
    }

    let company_id = query
        .company_id
        .ok_or_else(|| ApiError::field("company_id", "Company is required for imports"))?;
    scope.ensure(company_id)?;

    if !Company::exists(&state.db, company_id).await? {
        return Err(ApiError::field("company_id", "Company not found"));
    }

    if body.is_empty() {
        return Err(ApiError::Unprocessable("CSV body is empty".to_string()));
    }

    let mut tx = state.db.begin().await?;
    let report = transfer::import(&mut tx, entity, company_id, &body).await?;
    tx.commit().await?;

    tracing::info!(
        entity = entity.as_str(),
        %company_id,
        inserted = report.inserted,
        skipped = report.skipped,
        errors = report.errors.len(),
        "Imported CSV"
    );

    Ok(ApiResponse::ok("Import completed", report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_headers() {
        let headers = csv_headers(TransferEntity::Employees).unwrap();

        assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"employees.csv\""
        );
    }
}

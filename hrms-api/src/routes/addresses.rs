/// Bangladesh address reference data
///
/// Not company scoped: every caller holding `addresses.read` sees the same
/// rows. The lookup endpoints back cascading division / district / upazila
/// pickers.

use crate::{
    app::AppState,
    error::{validate_request, ApiError, ApiResult},
    response::ApiResponse,
    routes::non_empty,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use hrms_shared::{
    auth::{
        authorization::{require_permission, Action, Resource},
        middleware::AuthContext,
    },
    models::{
        address::{AddressData, AddressFilter, BangladeshAddress},
        Page, PageRequest,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 100, message = "Division must be 1 to 100 characters"))]
    pub division: String,

    #[validate(length(min = 1, max = 100, message = "District must be 1 to 100 characters"))]
    pub district: String,

    #[validate(length(min = 1, max = 100, message = "Upazila must be 1 to 100 characters"))]
    pub upazila: String,

    #[validate(length(max = 10, message = "Post code must be at most 10 characters"))]
    pub post_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressQuery {
    pub division: Option<String>,
    pub district: Option<String>,
    pub search: Option<String>,
}

pub async fn list_addresses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AddressQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<ApiResponse<Page<BangladeshAddress>>> {
    require_permission(&state.db, &auth, Resource::Addresses, Action::Read).await?;

    let filter = AddressFilter {
        division: non_empty(query.division),
        district: non_empty(query.district),
        search: query.search,
    };

    Ok(ApiResponse::ok(
        "Addresses retrieved",
        BangladeshAddress::list(&state.db, &filter, &page).await?,
    ))
}

pub async fn get_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<BangladeshAddress>> {
    require_permission(&state.db, &auth, Resource::Addresses, Action::Read).await?;

    let address = BangladeshAddress::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Address not found".to_string()))?;

    Ok(ApiResponse::ok("Address retrieved", address))
}

pub async fn list_divisions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<Vec<String>>> {
    require_permission(&state.db, &auth, Resource::Addresses, Action::Read).await?;

    Ok(ApiResponse::ok(
        "Divisions retrieved",
        BangladeshAddress::divisions(&state.db).await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct DistrictQuery {
    pub division: Option<String>,
}

/// `GET /v1/addresses/districts?division=Dhaka`
pub async fn list_districts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DistrictQuery>,
) -> ApiResult<ApiResponse<Vec<String>>> {
    require_permission(&state.db, &auth, Resource::Addresses, Action::Read).await?;

    let division = non_empty(query.division);
    let districts = BangladeshAddress::districts(&state.db, division.as_deref()).await?;

    Ok(ApiResponse::ok("Districts retrieved", districts))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpazilaQuery {
    pub division: Option<String>,
    pub district: Option<String>,
}

/// `GET /v1/addresses/upazilas?division=Dhaka&district=Gazipur`
pub async fn list_upazilas(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<UpazilaQuery>,
) -> ApiResult<ApiResponse<Vec<BangladeshAddress>>> {
    require_permission(&state.db, &auth, Resource::Addresses, Action::Read).await?;

    let division = non_empty(query.division);
    let district = non_empty(query.district);
    let upazilas =
        BangladeshAddress::upazilas(&state.db, division.as_deref(), district.as_deref()).await?;

    Ok(ApiResponse::ok("Upazilas retrieved", upazilas))
}

pub async fn create_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddressRequest>,
) -> ApiResult<ApiResponse<BangladeshAddress>> {
    require_permission(&state.db, &auth, Resource::Addresses, Action::Write).await?;
    validate_request(&req)?;

    let address = BangladeshAddress::create(
        &state.db,
        AddressData {
            division: req.division.trim().to_string(),
            district: req.district.trim().to_string(),
            upazila: req.upazila.trim().to_string(),
            post_code: non_empty(req.post_code),
        },
    )
    .await?;

    Ok(ApiResponse::created("Address created", address))
}

pub async fn delete_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    require_permission(&state.db, &auth, Resource::Addresses, Action::Delete).await?;

    if !BangladeshAddress::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Address not found".to_string()));
    }

    Ok(ApiResponse::empty("Address deleted"))
}

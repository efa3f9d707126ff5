/// System introspection endpoints
///
/// Both require `system.read`.

use crate::{app::AppState, error::ApiResult, response::ApiResponse};
use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use hrms_shared::{
    auth::{
        authorization::{require_permission, Action, Resource},
        middleware::AuthContext,
    },
    db::{
        introspection::{self, DatabaseInfo, TableStats},
        migrations::{self, MigrationStatus},
        pool::{self, PoolStats},
    },
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub production: bool,
}

#[derive(Debug, Serialize)]
pub struct DatabaseDetails {
    #[serde(flatten)]
    pub info: DatabaseInfo,

    pub tables: Vec<TableStats>,
    pub migrations: MigrationStatus,
    pub pool: PoolStats,
}

pub async fn system_info(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<SystemInfo>> {
    require_permission(&state.db, &auth, Resource::System, Action::Read).await?;

    let uptime = Utc::now() - state.started_at;

    Ok(ApiResponse::ok(
        "System information retrieved",
        SystemInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            started_at: state.started_at,
            uptime_seconds: uptime.num_seconds().max(0),
            production: state.config.api.production,
        },
    ))
}

/// Server version, size, table estimates, migrations and pool usage
pub async fn database_details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<DatabaseDetails>> {
    require_permission(&state.db, &auth, Resource::System, Action::Read).await?;

    let details = DatabaseDetails {
        info: introspection::database_info(&state.db).await?,
        tables: introspection::table_stats(&state.db).await?,
        migrations: migrations::get_migration_status(&state.db).await?,
        pool: pool::get_pool_stats(&state.db),
    };

    Ok(ApiResponse::ok("Database details retrieved", details))
}

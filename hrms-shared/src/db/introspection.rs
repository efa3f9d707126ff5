/// Database introspection for the system endpoints
///
/// Reads server-level facts from PostgreSQL catalogs. Row counts come from
/// `pg_stat_user_tables` and are estimates.

use serde::Serialize;
use sqlx::PgPool;

/// Server-level facts
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfo {
    /// `SELECT version()` output
    pub server_version: String,

    /// Current database name
    pub database_name: String,

    /// On-disk size of the current database
    pub size_bytes: i64,
}

/// Live row estimate for one table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TableStats {
    pub table_name: String,
    pub row_estimate: i64,
    pub total_size_bytes: i64,
}

pub async fn database_info(pool: &PgPool) -> Result<DatabaseInfo, sqlx::Error> {
    let (server_version, database_name, size_bytes): (String, String, i64) = sqlx::query_as(
        "SELECT version(), current_database(), pg_database_size(current_database())",
    )
    .fetch_one(pool)
    .await?;

    Ok(DatabaseInfo {
        server_version,
        database_name,
        size_bytes,
    })
}

/// Lists user tables in the public schema, largest first
pub async fn table_stats(pool: &PgPool) -> Result<Vec<TableStats>, sqlx::Error> {
    sqlx::query_as::<_, TableStats>(
        r#"
        SELECT relname::text AS table_name,
               n_live_tup AS row_estimate,
               pg_total_relation_size(relid) AS total_size_bytes
        FROM pg_stat_user_tables
        WHERE schemaname = 'public'
        ORDER BY pg_total_relation_size(relid) DESC, relname
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Database layer for HRMS
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: embedded migration runner and status
/// - `introspection`: server, table and size statistics for the system endpoints
///
/// Models live in the `models` module at crate root level.

pub mod introspection;
pub mod migrations;
pub mod pool;

/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use hrms_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = hrms_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{auth::jwt_auth_layer, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, FixedOffset, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Largest accepted CSV import body
const IMPORT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// When the process started serving
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            started_at: Utc::now(),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Local offset shift times are expressed in
    pub fn attendance_offset(&self) -> FixedOffset {
        self.config.attendance_offset()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /health                                   public
/// /v1/auth/login, /v1/auth/refresh          public
/// /v1/auth/{logout,me,change-password}      bearer token
/// /v1/{companies,departments,sections,designations,degrees,lines,shifts,employees}
/// /v1/addresses[/divisions|/districts|/upazilas]
/// /v1/rosters[/bulk|/summary|/:id/check-in|/:id/check-out]
/// /v1/users[/:id/companies]
/// /v1/permissions, /v1/roles[/:role/permissions]
/// /v1/export/:entity, /v1/import/:entity
/// /v1/system/{info,database}
/// ```
///
/// Every `/v1` route except login and refresh goes through [`jwt_auth_layer`].
pub fn build_router(state: AppState) -> Router {
    let public_auth = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let session = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me))
        .route("/change-password", post(routes::auth::change_password));

    let companies = Router::new()
        .route(
            "/",
            get(routes::companies::list_companies).post(routes::companies::create_company),
        )
        .route(
            "/:id",
            get(routes::companies::get_company)
                .put(routes::companies::update_company)
                .delete(routes::companies::delete_company),
        );

    let departments = Router::new()
        .route(
            "/",
            get(routes::departments::list_departments)
                .post(routes::departments::create_department),
        )
        .route(
            "/:id",
            get(routes::departments::get_department)
                .put(routes::departments::update_department)
                .delete(routes::departments::delete_department),
        );

    let sections = Router::new()
        .route(
            "/",
            get(routes::sections::list_sections).post(routes::sections::create_section),
        )
        .route(
            "/:id",
            get(routes::sections::get_section)
                .put(routes::sections::update_section)
                .delete(routes::sections::delete_section),
        );

    let designations = Router::new()
        .route(
            "/",
            get(routes::designations::list_designations)
                .post(routes::designations::create_designation),
        )
        .route(
            "/:id",
            get(routes::designations::get_designation)
                .put(routes::designations::update_designation)
                .delete(routes::designations::delete_designation),
        );

    let degrees = Router::new()
        .route(
            "/",
            get(routes::degrees::list_degrees).post(routes::degrees::create_degree),
        )
        .route(
            "/:id",
            get(routes::degrees::get_degree)
                .put(routes::degrees::update_degree)
                .delete(routes::degrees::delete_degree),
        );

    let lines = Router::new()
        .route("/", get(routes::lines::list_lines).post(routes::lines::create_line))
        .route(
            "/:id",
            get(routes::lines::get_line)
                .put(routes::lines::update_line)
                .delete(routes::lines::delete_line),
        );

    let shifts = Router::new()
        .route(
            "/",
            get(routes::shifts::list_shifts).post(routes::shifts::create_shift),
        )
        .route(
            "/:id",
            get(routes::shifts::get_shift)
                .put(routes::shifts::update_shift)
                .delete(routes::shifts::delete_shift),
        );

    let employees = Router::new()
        .route(
            "/",
            get(routes::employees::list_employees).post(routes::employees::create_employee),
        )
        .route(
            "/:id",
            get(routes::employees::get_employee)
                .put(routes::employees::update_employee)
                .delete(routes::employees::delete_employee),
        );

    let addresses = Router::new()
        .route(
            "/",
            get(routes::addresses::list_addresses).post(routes::addresses::create_address),
        )
        .route("/divisions", get(routes::addresses::list_divisions))
        .route("/districts", get(routes::addresses::list_districts))
        .route("/upazilas", get(routes::addresses::list_upazilas))
        .route(
            "/:id",
            get(routes::addresses::get_address).delete(routes::addresses::delete_address),
        );

    let rosters = Router::new()
        .route(
            "/",
            get(routes::rosters::list_rosters).post(routes::rosters::create_roster),
        )
        .route("/bulk", post(routes::rosters::bulk_create_rosters))
        .route("/summary", get(routes::rosters::roster_summary))
        .route(
            "/:id",
            get(routes::rosters::get_roster)
                .put(routes::rosters::update_roster)
                .delete(routes::rosters::delete_roster),
        )
        .route("/:id/check-in", post(routes::rosters::check_in))
        .route("/:id/check-out", post(routes::rosters::check_out));

    let users = Router::new()
        .route("/", get(routes::users::list_users).post(routes::users::create_user))
        .route(
            "/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route("/:id/companies", put(routes::users::replace_user_companies));

    let permissions = Router::new()
        .route(
            "/permissions",
            get(routes::permissions::list_permissions)
                .post(routes::permissions::create_permission),
        )
        .route("/roles", get(routes::permissions::list_roles))
        .route(
            "/roles/:role/permissions",
            get(routes::permissions::get_role_permissions)
                .put(routes::permissions::replace_role_permissions),
        );

    let transfer = Router::new()
        .route("/export/:entity", get(routes::transfer::export_entity))
        .route(
            "/import/:entity",
            post(routes::transfer::import_entity).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT)),
        );

    let system = Router::new()
        .route("/info", get(routes::system::system_info))
        .route("/database", get(routes::system::database_details));

    let protected = Router::new()
        .nest("/auth", session)
        .nest("/companies", companies)
        .nest("/departments", departments)
        .nest("/sections", sections)
        .nest("/designations", designations)
        .nest("/degrees", degrees)
        .nest("/lines", lines)
        .nest("/shifts", shifts)
        .nest("/employees", employees)
        .nest("/addresses", addresses)
        .nest("/rosters", rosters)
        .nest("/users", users)
        .nest("/system", system)
        .merge(permissions)
        .merge(transfer)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = public_auth.merge(protected);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_permissive() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

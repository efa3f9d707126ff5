/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first when present) and validated once at startup.
///
/// # Environment Variables
///
/// - `API_HOST` (default `0.0.0.0`), `API_PORT` (default `8080`)
/// - `CORS_ORIGINS`: comma separated origins, `*` for permissive (default `*`)
/// - `PRODUCTION`: enables HSTS (default `false`)
/// - `DATABASE_URL` (required), `DATABASE_MAX_CONNECTIONS` (default `10`)
/// - `RUN_MIGRATIONS`: apply migrations at startup (default `true`)
/// - `JWT_SECRET` (required, at least 32 characters)
/// - `JWT_ACCESS_TTL_MINUTES` (default `60`), `REFRESH_TOKEN_TTL_DAYS` (default `7`)
/// - `ATTENDANCE_UTC_OFFSET_MINUTES`: offset of shift times (default `360`)
/// - `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_PASSWORD`: first super admin
/// - `LOG_FORMAT`: `pretty` or `json` (default `pretty`)
///
/// # Example
///
/// ```no_run
/// use hrms_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use anyhow::{bail, Context};
use chrono::{Duration, FixedOffset};
use hrms_shared::attendance;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub attendance: AttendanceConfig,
    pub bootstrap: Option<BootstrapAdmin>,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` means permissive
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 secret, at least 32 characters. Generate with `openssl rand -hex 32`.
    pub secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct AttendanceConfig {
    /// Minutes east of UTC
    pub utc_offset_minutes: i32,

    /// The same offset, validated
    pub utc_offset: FixedOffset,
}

/// Credentials for the super admin created on first start
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(env::vars().collect())
    }

    /// Builds the configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> anyhow::Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL")
            .context("DATABASE_URL environment variable is required")?
            .to_string();

        let jwt_secret = get("JWT_SECRET")
            .context("JWT_SECRET environment variable is required")?
            .to_string();
        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_ttl_minutes: i64 = parse_or(get("JWT_ACCESS_TTL_MINUTES"), "JWT_ACCESS_TTL_MINUTES", 60)?;
        if access_ttl_minutes <= 0 {
            bail!("JWT_ACCESS_TTL_MINUTES must be positive");
        }
        let refresh_ttl_days: i64 = parse_or(get("REFRESH_TOKEN_TTL_DAYS"), "REFRESH_TOKEN_TTL_DAYS", 7)?;
        if refresh_ttl_days <= 0 {
            bail!("REFRESH_TOKEN_TTL_DAYS must be positive");
        }

        let utc_offset_minutes: i32 = parse_or(
            get("ATTENDANCE_UTC_OFFSET_MINUTES"),
            "ATTENDANCE_UTC_OFFSET_MINUTES",
            360,
        )?;
        let utc_offset = attendance::utc_offset(utc_offset_minutes)
            .context("ATTENDANCE_UTC_OFFSET_MINUTES must be within +/- 24 hours")?;

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or("*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let bootstrap = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email: email.to_lowercase(),
                password: password.to_string(),
            }),
            (None, None) => None,
            _ => bail!("BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            api: ApiConfig {
                host: get("API_HOST").unwrap_or("0.0.0.0").to_string(),
                port: parse_or(get("API_PORT"), "API_PORT", 8080)?,
                cors_origins,
                production: parse_bool(get("PRODUCTION"), "PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(get("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 10)?,
                run_migrations: parse_bool(get("RUN_MIGRATIONS"), "RUN_MIGRATIONS", true)?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            },
            attendance: AttendanceConfig {
                utc_offset_minutes,
                utc_offset,
            },
            bootstrap,
            log_format: get("LOG_FORMAT")
                .map(str::parse::<LogFormat>)
                .transpose()?
                .unwrap_or(LogFormat::Pretty),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.jwt.access_ttl_minutes)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::days(self.jwt.refresh_ttl_days)
    }

    /// Offset shift times are interpreted in
    pub fn attendance_offset(&self) -> FixedOffset {
        self.attendance.utc_offset
    }

    /// Permissive CORS when any configured origin is `*`
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_or<T>(value: Option<&str>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
    }
}

fn parse_bool(value: Option<&str>, key: &str, default: bool) -> anyhow::Result<bool> {
    match value.map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => bail!("{} must be a boolean, got '{}'", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = [
            ("DATABASE_URL", "postgresql://localhost/hrms_test"),
            ("JWT_SECRET", "test-secret-key-at-least-32-bytes-long"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&[])).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.cors_permissive());
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert_eq!(config.access_token_ttl(), Duration::minutes(60));
        assert_eq!(config.refresh_token_ttl(), Duration::days(7));
        assert_eq!(config.attendance_offset().local_minus_utc(), 6 * 3600);
        assert!(config.bootstrap.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9090"),
            ("CORS_ORIGINS", "https://hr.example.com, https://admin.example.com"),
            ("PRODUCTION", "true"),
            ("RUN_MIGRATIONS", "false"),
            ("JWT_ACCESS_TTL_MINUTES", "15"),
            ("ATTENDANCE_UTC_OFFSET_MINUTES", "-300"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9090");
        assert_eq!(config.api.cors_origins.len(), 2);
        assert!(!config.cors_permissive());
        assert!(config.api.production);
        assert!(!config.database.run_migrations);
        assert_eq!(config.jwt.access_ttl_minutes, 15);
        assert_eq!(config.attendance_offset().local_minus_utc(), -5 * 3600);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_required_and_invalid_values() {
        let mut missing = vars(&[]);
        missing.remove("DATABASE_URL");
        assert!(Config::from_vars(missing).is_err());

        assert!(Config::from_vars(vars(&[("JWT_SECRET", "short")])).is_err());
        assert!(Config::from_vars(vars(&[("API_PORT", "eighty")])).is_err());
        assert!(Config::from_vars(vars(&[("PRODUCTION", "maybe")])).is_err());
        assert!(Config::from_vars(vars(&[("ATTENDANCE_UTC_OFFSET_MINUTES", "2000")])).is_err());
        assert!(Config::from_vars(vars(&[("LOG_FORMAT", "xml")])).is_err());
    }

    #[test]
    fn test_bootstrap_admin_requires_both_values() {
        let config = Config::from_vars(vars(&[
            ("BOOTSTRAP_ADMIN_EMAIL", "Root@Example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "Sup3r$ecret!"),
        ]))
        .unwrap();
        let admin = config.bootstrap.unwrap();
        assert_eq!(admin.email, "root@example.com");
        assert!(!format!("{:?}", admin).contains("Sup3r"));

        assert!(Config::from_vars(vars(&[("BOOTSTRAP_ADMIN_EMAIL", "root@example.com")])).is_err());
    }
}

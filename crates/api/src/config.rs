use std::env;
use std::str::FromStr;

use record_lake_core::schema::{catalog, ResourceSchema};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
    #[error("unknown resource in RESOURCES: {0}")]
    UnknownResource(String),
}

/// Which storage adapter backs the resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            _ => Err(()),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// Storage adapter to run against.
    pub storage_backend: StorageBackend,
    /// PostgreSQL connection URL; required for the postgres backend.
    pub database_url: Option<String>,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Role required for POST/PUT/DELETE. Writes are open when unset.
    pub write_role: Option<String>,
    /// Path prefix for every resource route, e.g. `/api`.
    pub api_prefix: String,
    /// Single origin allowed by CORS (with credentials). Any origin when unset.
    pub cors_origin: Option<String>,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Resources to mount, by singular or plural name. `None` mounts all.
    pub resources: Option<Vec<String>>,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let storage_backend = parse_or(&var, "STORAGE_BACKEND", StorageBackend::Memory)?;
        let database_url = var("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "PORT", 3000)?,
            storage_backend,
            database_url,
            db_max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 20)?,
            db_min_connections: parse_or(&var, "DB_MIN_CONNECTIONS", 5)?,
            jwt_secret: var("JWT_SECRET")
                .unwrap_or_else(|| "dev-secret-change-me-in-production".to_string()),
            write_role: var("WRITE_ROLE"),
            api_prefix: normalize_prefix(var("API_PREFIX").as_deref().unwrap_or("")),
            cors_origin: var("CORS_ORIGIN"),
            max_body_bytes: parse_or(&var, "MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            resources: var("RESOURCES").map(|list| {
                list.split(',')
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect()
            }),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Schemas of the resources to mount, without duplicates.
    pub fn resource_schemas(&self) -> Result<Vec<ResourceSchema>, ConfigError> {
        let Some(names) = &self.resources else {
            return Ok(catalog::all());
        };
        let mut schemas: Vec<ResourceSchema> = Vec::with_capacity(names.len());
        for name in names {
            let schema =
                catalog::find(name).ok_or_else(|| ConfigError::UnknownResource(name.clone()))?;
            if !schemas.iter().any(|known| known.plural == schema.plural) {
                schemas.push(schema);
            }
        }
        Ok(schemas)
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: name,
            value: raw,
        }),
    }
}

/// `api/` and `/api/` both become `/api`; blank stays blank.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

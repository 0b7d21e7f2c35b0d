// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! [`AppConfig`] loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the redb database file | unset (in-memory) |
//! | `JWT_SECRET` | Base64-encoded HMAC-SHA256 signing key | Required |
//! | `JWT_EXPIRATION_MS` | Access token lifetime in milliseconds | `86400000` (24h) |
//! | `JWT_REFRESH_EXPIRATION_MS` | Refresh token lifetime in milliseconds | `604800000` (7d) |
//! | `SEED_ADMIN_USERNAME` | Bootstrap admin username | unset |
//! | `SEED_ADMIN_EMAIL` | Bootstrap admin email | unset |
//! | `SEED_ADMIN_PASSWORD` | Bootstrap admin password | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use thiserror::Error;

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the database directory.
///
/// When unset the server runs against an in-memory database and loses all
/// data on restart.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the base64-encoded JWT signing secret.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Environment variable name for the access token lifetime (ms).
pub const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION_MS";

/// Environment variable name for the refresh token lifetime (ms).
pub const JWT_REFRESH_EXPIRATION_ENV: &str = "JWT_REFRESH_EXPIRATION_MS";

pub const SEED_ADMIN_USERNAME_ENV: &str = "SEED_ADMIN_USERNAME";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default tracing filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// 24 hours.
pub const DEFAULT_ACCESS_TOKEN_TTL_MS: i64 = 86_400_000;

/// 7 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_MS: i64 = 604_800_000;

/// File name of the redb database inside `DATA_DIR`.
pub const DATABASE_FILE_NAME: &str = "registry.redb";

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse the `LOG_FORMAT` value. Unknown values fall back to pretty output.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Credentials for the optional bootstrap administrator.
#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// JWT settings consumed by the token codec.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Base64-encoded signing secret, decoded once by the codec.
    pub secret: String,
    /// Access token lifetime in milliseconds.
    pub access_ttl_ms: i64,
    /// Refresh token lifetime in milliseconds.
    pub refresh_ttl_ms: i64,
}

/// Complete application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub jwt: JwtConfig,
    pub seed_admin: Option<SeedAdmin>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        let access_ttl_ms = parse_ttl(get(JWT_EXPIRATION_ENV), JWT_EXPIRATION_ENV, DEFAULT_ACCESS_TOKEN_TTL_MS)?;
        let refresh_ttl_ms = parse_ttl(
            get(JWT_REFRESH_EXPIRATION_ENV),
            JWT_REFRESH_EXPIRATION_ENV,
            DEFAULT_REFRESH_TOKEN_TTL_MS,
        )?;

        let seed_admin = match (
            get(SEED_ADMIN_USERNAME_ENV),
            get(SEED_ADMIN_EMAIL_ENV),
            get(SEED_ADMIN_PASSWORD_ENV),
        ) {
            (Some(username), Some(email), Some(password)) => Some(SeedAdmin {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: SEED_ADMIN_USERNAME_ENV,
                    reason: "seed admin requires username, email and password together".into(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            jwt: JwtConfig {
                secret,
                access_ttl_ms,
                refresh_ttl_ms,
            },
            seed_admin,
            log_format: get(LOG_FORMAT_ENV)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        })
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path of the database file, if a data directory is configured.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DATABASE_FILE_NAME))
    }
}

fn parse_ttl(raw: Option<String>, name: &'static str, default: i64) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be a positive number of milliseconds".into(),
        });
    }
    Ok(value)
}

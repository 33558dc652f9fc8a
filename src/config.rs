use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;
use tracing::trace;

use crate::error::{ServiceError, ServiceResult};
use crate::uploads::DEFAULT_ALLOWED_EXTENSIONS;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub pool_size: u32,
    pub upload_dir: PathBuf,
    /// Prefix of the image paths stored on recipes.
    pub upload_prefix: String,
    pub allowed_extensions: Vec<String>,
    pub require_unit: bool,
}

impl Config {
    pub const DEFAULT_POOL_SIZE: u32 = 4;

    /// Reads the process environment after loading `.env` when one exists.
    pub fn from_env() -> ServiceResult<Self> {
        if dotenv().is_err() {
            trace!("No .env file loaded");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServiceResult<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::Config("DATABASE_URL must be set".to_owned())
            })?;

        let pool_size = parse_or(&lookup, "DATABASE_POOL_SIZE", Self::DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(ServiceError::Config(
                "DATABASE_POOL_SIZE must be at least 1".to_owned(),
            ));
        }

        let upload_dir = lookup("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads/images"));
        let upload_prefix = lookup("UPLOAD_PREFIX")
            .unwrap_or_else(|| upload_dir.to_string_lossy().replace('\\', "/"));

        let allowed_extensions = match lookup("ALLOWED_EXTENSIONS") {
            Some(list) => list
                .split(',')
                .map(|extension| {
                    extension
                        .trim()
                        .trim_start_matches('.')
                        .to_ascii_lowercase()
                })
                .filter(|extension| !extension.is_empty())
                .collect(),
            None => DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|extension| extension.to_string())
                .collect(),
        };

        let require_unit = parse_or(&lookup, "REQUIRE_UNIT", true)?;

        Ok(Self {
            database_url,
            pool_size,
            upload_dir,
            upload_prefix,
            allowed_extensions,
            require_unit,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> ServiceResult<T> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| {
                ServiceError::Config(format!("{key} has an invalid value: {value}"))
            }),
        None => Ok(default),
    }
}

/// Configuration management for Post Service
///
/// Loads configuration from environment variables (a `.env` file is honoured
/// in development).
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// gRPC server configuration
    pub grpc: GrpcConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Feed ranking configuration
    pub feed: FeedConfig,
    /// Media storage configuration
    pub media: MediaConfig,
    /// ZaloPay gateway configuration
    pub zalopay: ZaloPayConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port for health checks, metrics and payment callbacks
    pub http_port: u16,
}

/// gRPC server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcConfig {
    pub port: u16,
    /// Max encoded message size in both directions (media travels inline)
    pub max_message_bytes: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Feed paging limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Largest page a client may request from GetRandomPosts
    pub max_page_size: usize,
    /// Page size used by list endpoints when the client sends 0
    pub default_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub bucket: String,
    pub region: String,
    /// Public base URL objects are served from (CDN or bucket endpoint)
    pub public_base_url: String,
    pub key_prefix: String,
    /// Custom endpoint for S3-compatible storage (MinIO in development)
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZaloPayConfig {
    pub app_id: String,
    pub key1: String,
    pub key2: String,
    pub create_endpoint: String,
    pub query_endpoint: String,
    pub redirect_url: String,
    pub callback_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            default_page_size: 10,
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            bail!("FEED_MAX_PAGE_SIZE must be at least 1");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            bail!(
                "FEED_DEFAULT_PAGE_SIZE must be between 1 and {}",
                self.max_page_size
            );
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let env = var_or("APP_ENV", "development");
        let is_production = env.eq_ignore_ascii_case("production");

        let app = AppConfig {
            env: env.clone(),
            host: var_or("APP_HOST", "0.0.0.0"),
            http_port: parse_or(&lookup, "PORT", 8082)?,
        };

        let grpc = GrpcConfig {
            port: parse_or(&lookup, "GRPC_PORT", 50052)?,
            max_message_bytes: parse_or(&lookup, "GRPC_MAX_MESSAGE_BYTES", 20 * 1024 * 1024)?,
        };

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").context("DATABASE_URL environment variable not set")?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 20)?,
            min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", 5)?,
        };

        let feed = FeedConfig {
            max_page_size: parse_or(&lookup, "FEED_MAX_PAGE_SIZE", 100)?,
            default_page_size: parse_or(&lookup, "FEED_DEFAULT_PAGE_SIZE", 10)?,
        };
        feed.validate()?;

        let media = MediaConfig {
            bucket: var_or("S3_BUCKET", "nova-post-media"),
            region: var_or("AWS_REGION", "ap-southeast-1"),
            public_base_url: var_or(
                "MEDIA_PUBLIC_BASE_URL",
                "https://nova-post-media.s3.amazonaws.com",
            ),
            key_prefix: var_or("MEDIA_KEY_PREFIX", "posts"),
            endpoint: lookup("S3_ENDPOINT").filter(|v| !v.trim().is_empty()),
        };

        let zalopay = ZaloPayConfig {
            app_id: var_or("ZALOPAY_APP_ID", "2553"),
            key1: var_or("ZALOPAY_KEY1", ""),
            key2: var_or("ZALOPAY_KEY2", ""),
            create_endpoint: var_or(
                "ZALOPAY_ENDPOINT_CREATE",
                "https://sb-openapi.zalopay.vn/v2/create",
            ),
            query_endpoint: var_or(
                "ZALOPAY_ENDPOINT_QUERY",
                "https://sb-openapi.zalopay.vn/v2/query",
            ),
            redirect_url: var_or("ZALOPAY_REDIRC_URL", "http://localhost:3000"),
            callback_url: var_or(
                "ZALOPAY_CALLBACK_URL",
                "http://localhost:8082/donation/callback",
            ),
        };

        if is_production && (zalopay.key1.trim().is_empty() || zalopay.key2.trim().is_empty()) {
            bail!("ZALOPAY_KEY1 and ZALOPAY_KEY2 must be set in production");
        }

        Ok(Config {
            app,
            grpc,
            database,
            feed,
            media,
            zalopay,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}='{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://test")])).unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.host, "0.0.0.0");
        assert_eq!(config.app.http_port, 8082);
        assert_eq!(config.grpc.port, 50052);
        assert_eq!(config.grpc.max_message_bytes, 20 * 1024 * 1024);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.feed.max_page_size, 100);
        assert_eq!(config.feed.default_page_size, 10);
    }

    #[test]
    fn test_missing_database_url() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("FEED_MAX_PAGE_SIZE", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("FEED_MAX_PAGE_SIZE"));
    }

    #[test]
    fn test_default_page_size_must_fit_max() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("FEED_MAX_PAGE_SIZE", "5"),
            ("FEED_DEFAULT_PAGE_SIZE", "10"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_production_requires_zalopay_keys() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("APP_ENV", "production"),
        ]));
        assert!(result.is_err());

        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("APP_ENV", "production"),
            ("ZALOPAY_KEY1", "k1"),
            ("ZALOPAY_KEY2", "k2"),
        ]))
        .unwrap();
        assert_eq!(config.zalopay.key1, "k1");
    }
}

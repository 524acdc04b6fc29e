use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Where artifacts and daily picks are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    /// Process-local, lost on restart. For development and tests.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(StoreBackend::DynamoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("expected 'dynamodb' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_backend: StoreBackend,
    pub aws_region: String,
    // Optional endpoint for DynamoDB Local / LocalStack
    pub dynamodb_endpoint: Option<String>,
    pub artifacts_table: String,
    pub daily_picks_table: String,
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    /// How many artifacts `/featuredArtifacts` returns.
    pub featured_limit: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let store_backend = match lookup("STORE_BACKEND") {
            Some(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidVar("STORE_BACKEND".into(), e))?,
            None => StoreBackend::DynamoDb,
        };

        let aws_region = lookup("AWS_DEFAULT_REGION").unwrap_or_else(|| "us-east-1".to_string());
        let dynamodb_endpoint = lookup("AWS_ENDPOINT_URL");

        let artifacts_table = lookup("ARTIFACTS_TABLE").unwrap_or_else(|| "histotrack_artifacts".to_string());
        let daily_picks_table =
            lookup("DAILY_PICKS_TABLE").unwrap_or_else(|| "histotrack_daily_picks".to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("JWT_SECRET".into()))?;
        let jwt_issuer = lookup("JWT_ISSUER");

        let featured_limit = match lookup("FEATURED_LIMIT") {
            Some(value) => value
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidVar("FEATURED_LIMIT".into(), e.to_string()))?,
            None => 8,
        };

        Ok(Config {
            bind_address,
            store_backend,
            aws_region,
            dynamodb_endpoint,
            artifacts_table,
            daily_picks_table,
            jwt_secret,
            jwt_issuer,
            featured_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.bind_address.port(), 5000);
        assert_eq!(config.store_backend, StoreBackend::DynamoDb);
        assert_eq!(config.artifacts_table, "histotrack_artifacts");
        assert_eq!(config.daily_picks_table, "histotrack_daily_picks");
        assert_eq!(config.featured_limit, 8);
        assert!(config.dynamodb_endpoint.is_none());
    }

    #[test]
    fn jwt_secret_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(var)) if var == "JWT_SECRET"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = load(&[("JWT_SECRET", "s"), ("FEATURED_LIMIT", "six")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar(var, _) if var == "FEATURED_LIMIT"));

        let err = load(&[("JWT_SECRET", "s"), ("STORE_BACKEND", "mongo")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar(var, _) if var == "STORE_BACKEND"));
    }

    #[test]
    fn memory_backend_and_overrides() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("STORE_BACKEND", "Memory"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("FEATURED_LIMIT", "6"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.featured_limit, 6);
    }
}

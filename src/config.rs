use std::{env, time::Duration};

use crate::{
    discovery::{StaticServiceDiscovery, CATALOG_SERVICE, ORDER_SERVICE},
    repositories::MongoDbInitializationInfo,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: String, value: String },
}

#[derive(Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb: Option<MongoDbInitializationInfo>,
    pub discovery: StaticServiceDiscovery,
    pub remote_timeout: Duration,
    pub log_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| String::from(default));

        let mongodb = lookup("MONGODB_URI").map(|uri| MongoDbInitializationInfo {
            uri: uri,
            database: value_or("MONGODB_DB", "eshop"),
            collection: value_or("MONGODB_CARTS_COLLECTION", "carts"),
            counters_collection: value_or("MONGODB_COUNTERS_COLLECTION", "counters"),
        });

        let environment = value_or("DISCOVERY_ENVIRONMENT", "dev");

        Ok(AppConfig {
            host: value_or("AXUM_HOST", "0.0.0.0"),
            port: parse_number("AXUM_PORT", &value_or("AXUM_PORT", "8080"))?,
            mongodb: mongodb,
            discovery: StaticServiceDiscovery::from_lookup(&[CATALOG_SERVICE, ORDER_SERVICE], &environment, &lookup),
            remote_timeout: Duration::from_secs(parse_number("REMOTE_TIMEOUT_SECS", &value_or("REMOTE_TIMEOUT_SECS", "10"))?),
            log_path: lookup("LOG_PATH"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::discovery::ServiceDiscovery;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_run_in_memory_without_downstream_services() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.mongodb.is_none());
        assert_eq!(config.discovery.resolve(CATALOG_SERVICE), None);
        assert_eq!(config.discovery.resolve(ORDER_SERVICE), None);
        assert_eq!(config.remote_timeout, Duration::from_secs(10));
    }

    #[test]
    fn reads_store_and_services() {
        let config = config_from(&[
            ("AXUM_PORT", "9000"),
            ("MONGODB_URI", "mongodb://localhost:27017"),
            ("MONGODB_CARTS_COLLECTION", "shopping_carts"),
            ("ORDER_SERVICE_URL", "http://orders:8081"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        let mongodb = config.mongodb.unwrap();
        assert_eq!(mongodb.database, "eshop");
        assert_eq!(mongodb.collection, "shopping_carts");
        assert_eq!(
            config.discovery.resolve(ORDER_SERVICE),
            Some(String::from("http://orders:8081"))
        );
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(matches!(
            config_from(&[("AXUM_PORT", "eighty")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }
}

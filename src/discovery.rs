use std::collections::HashMap;

pub const CATALOG_SERVICE: &str = "catalog-service";
pub const ORDER_SERVICE: &str = "order-service";

/// Resolves a logical service name to the base URL it is reachable at.
pub trait ServiceDiscovery {
    fn resolve(&self, service_name: &str) -> Option<String>;
}

/// Discovery backed by a fixed set of endpoints, usually read from the
/// environment at startup.
///
/// For `catalog-service` in environment `dev` the lookup order is
/// `CATALOG_SERVICE_URL_DEV`, then `CATALOG_SERVICE_URL`.
#[derive(Debug, Clone, Default)]
pub struct StaticServiceDiscovery {
    endpoints: HashMap<String, String>,
}

impl StaticServiceDiscovery {
    pub fn new() -> Self {
        StaticServiceDiscovery {
            endpoints: HashMap::new(),
        }
    }

    pub fn with_endpoint(mut self, service_name: &str, base_url: &str) -> Self {
        self.endpoints
            .insert(service_name.to_string(), base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn from_lookup<F>(service_names: &[&str], environment: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut discovery = StaticServiceDiscovery::new();

        for service_name in service_names {
            let key = env_key(service_name);
            let scoped_key = format!("{}_{}", key, environment.to_uppercase());

            let configured = |key: &str| lookup(key).filter(|url| !url.trim().is_empty());
            let base_url = configured(&scoped_key).or_else(|| configured(&key));

            if let Some(url) = base_url {
                discovery = discovery.with_endpoint(service_name, url.trim());
            }
        }

        discovery
    }
}

impl ServiceDiscovery for StaticServiceDiscovery {
    fn resolve(&self, service_name: &str) -> Option<String> {
        self.endpoints.get(service_name).cloned()
    }
}

fn env_key(service_name: &str) -> String {
    format!("{}_URL", service_name.replace('-', "_").to_uppercase())
}

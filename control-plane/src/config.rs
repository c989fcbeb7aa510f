use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub object_store: ObjectStoreSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Mirrors [`objectstore::ObjectStoreConfig`] but loaded alongside the rest
/// of the control plane's configuration rather than read standalone.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreSettings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub path_style: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    20
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/flagship".to_string());
        let database_max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(default_max_connections);
        let server_host = std::env::var("SERVER_HOST").unwrap_or_else(|_| default_host());
        let server_port: u16 = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(default_port);

        let bucket =
            std::env::var("OBJECT_STORE_BUCKET").unwrap_or_else(|_| "flag-configs".to_string());
        let region =
            std::env::var("OBJECT_STORE_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let endpoint = std::env::var("OBJECT_STORE_ENDPOINT").ok();
        let path_style = std::env::var("OBJECT_STORE_PATH_STYLE")
            .map(|v| v == "true")
            .unwrap_or(true);

        Ok(Config {
            server: ServerConfig {
                host: server_host,
                port: server_port,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: database_max_connections,
            },
            object_store: ObjectStoreSettings {
                bucket,
                region,
                endpoint,
                path_style,
            },
        })
    }

    pub fn object_store_config(&self) -> objectstore::ObjectStoreConfig {
        objectstore::ObjectStoreConfig {
            bucket: self.object_store.bucket.clone(),
            region: self.object_store.region.clone(),
            endpoint: self.object_store.endpoint.clone(),
            path_style: self.object_store.path_style,
        }
    }
}

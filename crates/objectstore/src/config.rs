//! Object store configuration shared by the publisher (writer) and the
//! decision-side config store (reader).

#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, etc). `None` uses
    /// AWS's default endpoint resolution for `region`.
    pub endpoint: Option<String>,
    pub path_style: bool,
}

impl ObjectStoreConfig {
    /// Load from environment variables, with defaults suitable for a local
    /// MinIO instance during development.
    pub fn from_env() -> Self {
        Self {
            bucket: std::env::var("OBJECT_STORE_BUCKET").unwrap_or_else(|_| "flag-configs".into()),
            region: std::env::var("OBJECT_STORE_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: std::env::var("OBJECT_STORE_ENDPOINT").ok(),
            path_style: std::env::var("OBJECT_STORE_PATH_STYLE")
                .map(|v| v == "true")
                .unwrap_or(true),
        }
    }
}

/// Build the three key paths a publish writes.
pub fn snapshot_key(environment: &str, version: u64) -> String {
    format!("configs/{environment}/snapshots/{version}.json")
}

pub fn latest_key(environment: &str) -> String {
    format!("configs/{environment}/snapshots/latest.json")
}

pub fn version_key(environment: &str) -> String {
    format!("configs/{environment}/version.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_matches_wire_contract() {
        assert_eq!(
            snapshot_key("prod", 7),
            "configs/prod/snapshots/7.json"
        );
        assert_eq!(latest_key("prod"), "configs/prod/snapshots/latest.json");
        assert_eq!(version_key("prod"), "configs/prod/version.json");
    }
}

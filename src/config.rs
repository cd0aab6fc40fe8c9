use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; recommendation history is disabled when unset
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// JSON crop catalog; the embedded catalog is used when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Location of the persisted recommendation model
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Gaussian kernel bandwidth, in standardised feature units
    #[serde(default = "default_kernel_bandwidth")]
    pub kernel_bandwidth: f64,

    /// Defer loading/training the model until the first recommendation request
    #[serde(default)]
    pub lazy_model: bool,

    /// Allowed CORS origins, comma separated
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/crop_recommendation.json")
}

fn default_kernel_bandwidth() -> f64 {
    1.0
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::from_iter(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if !config.kernel_bandwidth.is_finite() || config.kernel_bandwidth <= 0.0 {
            anyhow::bail!(
                "KERNEL_BANDWIDTH must be a positive number, got {}",
                config.kernel_bandwidth
            );
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vars(&[])).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.catalog_path, None);
        assert_eq!(config.model_path, PathBuf::from("models/crop_recommendation.json"));
        assert_eq!(config.kernel_bandwidth, 1.0);
        assert!(!config.lazy_model);
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.cors_origins.len(), 4);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/farmer"),
            ("CATALOG_PATH", "/etc/farmer/crops.json"),
            ("KERNEL_BANDWIDTH", "0.5"),
            ("LAZY_MODEL", "true"),
            ("CORS_ORIGINS", "https://a.example,https://b.example"),
            ("PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/farmer"));
        assert_eq!(config.catalog_path, Some(PathBuf::from("/etc/farmer/crops.json")));
        assert_eq!(config.kernel_bandwidth, 0.5);
        assert!(config.lazy_model);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_rejects_non_positive_bandwidth() {
        assert!(Config::from_vars(vars(&[("KERNEL_BANDWIDTH", "0")])).is_err());
        assert!(Config::from_vars(vars(&[("PORT", "not-a-port")])).is_err());
    }
}

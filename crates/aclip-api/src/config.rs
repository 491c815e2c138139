//! API configuration.

use std::path::PathBuf;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins; "*" allows any
    pub cors_origins: Vec<String>,
    /// Max upload body size in bytes
    pub max_body_size: usize,
    /// Root directory of the project store
    pub data_dir: PathBuf,
    /// Directory of prompt template overrides
    pub prompt_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            max_body_size: 4 * 1024 * 1024 * 1024, // uploads carry whole videos
            data_dir: PathBuf::from("./data"),
            prompt_dir: PathBuf::from("./prompts"),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(d.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(d.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_body_size),
            data_dir: std::env::var("ACLIP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.data_dir),
            prompt_dir: std::env::var("ACLIP_PROMPT_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.prompt_dir),
        }
    }
}

use std::path::PathBuf;

/// Terminal configuration.
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | Working directory (database, logs) |
/// | CLOUD_URL | http://localhost:4000 | Cloud document-store base URL |
/// | COMPANY_ID | dev | Tenant partition this terminal writes into |
/// | API_TOKEN | (empty) | Bearer token identifying this device |
/// | SYNC_INTERVAL_SECS | 30 | Periodic sync cadence |
/// | PROBE_INTERVAL_SECS | 15 | Connectivity probe cadence |
/// | LOG_DIR | (unset) | Daily-rolling log file directory |
/// | ENVIRONMENT | development | development \| staging \| production |
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub cloud_url: String,
    pub company_id: String,
    pub api_token: String,
    pub sync_interval_secs: u64,
    pub probe_interval_secs: u64,
    pub log_dir: Option<String>,
    pub environment: String,
}

impl Config {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            cloud_url: std::env::var("CLOUD_URL")
                .unwrap_or_else(|_| "http://localhost:4000".into()),
            company_id: std::env::var("COMPANY_ID").unwrap_or_else(|_| "dev".into()),
            api_token: std::env::var("API_TOKEN").unwrap_or_default(),
            sync_interval_secs: std::env::var("SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            probe_interval_secs: std::env::var("PROBE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Path of the embedded database file.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("terminal.redb")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

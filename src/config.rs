use std::env;
use std::path::PathBuf;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Tab-separated compound table (`id`, `name`, `formula` columns).
    pub compounds_path: PathBuf,
    /// Directory holding one `<Name>.json` per reconstruction template.
    pub templates_dir: PathBuf,
    /// Upper bound on a single backend call (build, gapfill, FBA).
    pub compute_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            compounds_path: PathBuf::from(
                env::var("COMPOUNDS_PATH").unwrap_or_else(|_| "./data/compounds.tsv".to_string()),
            ),
            templates_dir: PathBuf::from(
                env::var("TEMPLATES_DIR").unwrap_or_else(|_| "./data/templates".to_string()),
            ),
            compute_timeout_secs: env::var("COMPUTE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
        })
    }
}

//! Environment-driven engine configuration

use std::path::PathBuf;
use std::time::Duration;

/// Default directory holding one `<builder_key>.json` rules document each.
pub const DEFAULT_CONTENT_DIR: &str = "./content";

/// Default base URL of the external PDF fill service.
pub const DEFAULT_PDF_FILL_BASE_URL: &str = "http://localhost:8090";

/// Default timeout for PDF fill requests, in seconds.
pub const DEFAULT_PDF_FILL_TIMEOUT_SECS: u64 = 30;

/// Engine settings, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory the filesystem source loader reads rules content from.
    pub content_dir: PathBuf,
    /// Base URL of the external PDF fill service.
    pub pdf_fill_base_url: String,
    /// Timeout applied to PDF fill requests.
    pub pdf_fill_timeout: Duration,
}

impl EngineConfig {
    /// Read configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let content_dir = std::env::var("CHARGEN_CONTENT_DIR")
            .unwrap_or_else(|_| DEFAULT_CONTENT_DIR.into());
        let pdf_fill_base_url = std::env::var("PDF_FILL_URL")
            .or_else(|_| std::env::var("PDF_FILL_BASE_URL"))
            .unwrap_or_else(|_| DEFAULT_PDF_FILL_BASE_URL.into());
        let pdf_fill_timeout_secs = std::env::var("PDF_FILL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PDF_FILL_TIMEOUT_SECS);

        Self {
            content_dir: PathBuf::from(content_dir),
            pdf_fill_base_url,
            pdf_fill_timeout: Duration::from_secs(pdf_fill_timeout_secs),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            pdf_fill_base_url: DEFAULT_PDF_FILL_BASE_URL.to_string(),
            pdf_fill_timeout: Duration::from_secs(DEFAULT_PDF_FILL_TIMEOUT_SECS),
        }
    }
}

/// Load `.env` files from the repository root, preferring local overrides.
pub fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = EngineConfig::default();
        assert_eq!(config.content_dir, PathBuf::from("./content"));
        assert_eq!(config.pdf_fill_timeout, Duration::from_secs(30));
    }
}

//! Pixel Insights configuration. Settings are layered: built-in defaults, an
//! optional `pixel-insights.toml`, then `PIXEL_INSIGHTS_*` environment
//! variables. `GEMINI_API_KEY`, when set, overrides the API key of every layer.

use crate::error::{Error, Result};
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default root of the generative language REST API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Multimodal model used by the classification, detection and attention flows
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Model used for image and text embeddings
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Address the HTTP server listens on
pub const DEFAULT_BIND: &str = "0.0.0.0:9002";

/// Log filter used when `RUST_LOG` is unset
pub const RUST_LOG: &str = "pixel_insights=info,actix_web=info";

/// Config file looked up in the working directory (any supported extension)
pub const CONFIG_FILE: &str = "pixel-insights";

pub const ENV_PREFIX: &str = "PIXEL_INSIGHTS";

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// The API key. Never printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(<redacted>)")
    }
}

#[derive(Deserialize)]
struct RawSettings {
    api_key: Option<ApiKey>,
    base_url: String,
    model: String,
    embedding_model: String,
    bind: String,
    request_timeout_secs: Option<u64>,
}

/// Validated settings. Holding one means an API key is present.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: ApiKey,
    pub base_url: Url,
    pub model: String,
    pub embedding_model: String,
    pub bind: String,
    pub request_timeout: Option<Duration>,
}

impl Settings {
    /// A config builder with every default filled in
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("model", DEFAULT_MODEL)?
            .set_default("embedding_model", DEFAULT_EMBEDDING_MODEL)?
            .set_default("bind", DEFAULT_BIND)?)
    }

    /// Load settings from the config file and environment. `path` replaces
    /// the default config file lookup and must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = Self::defaults()?;
        let mut builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(CONFIG_FILE).required(false)),
        }
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        // GEMINI_API_KEY wins over every other source
        if let Ok(key) = std::env::var(API_KEY_VAR) {
            builder = builder.set_override("api_key", key)?;
        }
        let config = builder.build()?;

        Self::from_config(config)
    }

    /// Validate an already assembled configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let raw: RawSettings = config.try_deserialize()?;

        let api_key = raw
            .api_key
            .filter(|key| !key.expose().trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "no API key: set {API_KEY_VAR} or {ENV_PREFIX}_API_KEY"
                ))
            })?;

        // A base URL without a trailing slash would lose its last segment on join
        let mut base_url = raw.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::Configuration(format!("invalid base_url {base_url:?}: {e}")))?;

        for (name, value) in [("model", &raw.model), ("embedding_model", &raw.embedding_model)] {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{name} must not be empty")));
            }
        }

        Ok(Settings {
            api_key,
            base_url,
            model: raw.model,
            embedding_model: raw.embedding_model,
            bind: raw.bind,
            request_timeout: raw.request_timeout_secs.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Settings::defaults()
            .unwrap()
            .set_override("api_key", "secret")
            .unwrap()
            .build()
            .unwrap();
        let settings = Settings::from_config(config).unwrap();

        assert_eq!(settings.api_key.expose(), "secret");
        assert_eq!(settings.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(settings.bind, DEFAULT_BIND);
        assert_eq!(settings.request_timeout, None);
    }

    #[test]
    fn test_missing_api_key() {
        let config = Settings::defaults().unwrap().build().unwrap();
        let err = Settings::from_config(config).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err:?}");

        let config = Settings::defaults()
            .unwrap()
            .set_override("api_key", "  ")
            .unwrap()
            .build()
            .unwrap();
        assert!(Settings::from_config(config).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Settings::defaults()
            .unwrap()
            .set_override("api_key", "secret")
            .unwrap()
            .set_override("base_url", "http://127.0.0.1:8080/v1beta")
            .unwrap()
            .set_override("model", "gemini-2.5-pro")
            .unwrap()
            .set_override("request_timeout_secs", 30_i64)
            .unwrap()
            .build()
            .unwrap();
        let settings = Settings::from_config(config).unwrap();

        assert_eq!(settings.base_url.as_str(), "http://127.0.0.1:8080/v1beta/");
        assert_eq!(settings.model, "gemini-2.5-pro");
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_load_layers() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "api_key = \"file-key\"\nmodel = \"gemini-2.5-pro\"").unwrap();

        // the only test that touches these variables
        std::env::remove_var(API_KEY_VAR);
        std::env::remove_var("PIXEL_INSIGHTS_API_KEY");
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.api_key.expose(), "file-key");
        assert_eq!(settings.model, "gemini-2.5-pro");
        assert_eq!(settings.bind, DEFAULT_BIND);

        std::env::set_var(API_KEY_VAR, "env-key");
        let settings = Settings::load(Some(file.path()));
        std::env::remove_var(API_KEY_VAR);
        let settings = settings.unwrap();
        assert_eq!(settings.api_key.expose(), "env-key");
        assert_eq!(settings.model, "gemini-2.5-pro");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err:?}");
    }

    #[test]
    fn test_api_key_is_redacted() {
        let key = ApiKey::new("secret");
        assert!(!format!("{key:?}").contains("secret"));
    }
}

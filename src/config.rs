use std::time::Duration;
use url::Url;

/// The environment variable holding the backend's base URL.
pub const BACKEND_URL_VAR: &str = "TASKBOARD_BACKEND_URL";

/// Everything needed to talk to a Taskboard backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    base_url: Url,
    timeout: Option<Duration>,
}

impl Config {
    /// Create a [`Config`] for the backend at `base_url`.
    ///
    /// The URL's path is treated as a directory, so `http://host/api` and
    /// `http://host/api/` both send logins to `http://host/api/loginUser`.
    pub fn new(base_url: &str) -> Result<Config, ConfigError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingBackendUrl);
        }

        let mut url =
            Url::parse(base_url).map_err(|inner| ConfigError::InvalidUrl {
                url: base_url.to_string(),
                inner,
            })?;

        match url.scheme() {
            "http" | "https" => {},
            other => {
                return Err(ConfigError::UnsupportedScheme {
                    scheme: other.to_string(),
                })
            },
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(Config {
            base_url: url,
            timeout: None,
        })
    }

    /// Read the configuration from the [`BACKEND_URL_VAR`] environment
    /// variable.
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(BACKEND_URL_VAR) {
            Some(url) => Config::new(&url),
            None => Err(ConfigError::MissingBackendUrl),
        }
    }

    /// Abort requests which take longer than `timeout`.
    pub fn with_timeout(self, timeout: Duration) -> Config {
        Config {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn base_url(&self) -> &Url { &self.base_url }

    pub fn timeout(&self) -> Option<Duration> { self.timeout }
}

/// Reasons a [`Config`] can't be created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("The backend URL is not configured (set {})", BACKEND_URL_VAR)]
    MissingBackendUrl,
    #[error("\"{url}\" is not a valid backend URL")]
    InvalidUrl {
        url: String,
        #[source]
        inner: url::ParseError,
    },
    #[error("Backend URLs must use http or https, not \"{scheme}\"")]
    UnsupportedScheme { scheme: String },
}

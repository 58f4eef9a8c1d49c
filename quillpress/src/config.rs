//! Server and store configuration loaded from a TOML file.
//!
//! Every section is optional. String values written as `${NAME}` are
//! replaced by the environment variable `NAME` when the settings are
//! resolved. The Redis URL is resolved separately, only when a Redis store is
//! actually opened, so memory-backed runs never need `REDIS_URL`.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "quillpress.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {0} not set")]
    MissingVariable(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub redis: RedisSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Scheme used in image URLs when the request carries no
    /// `X-Forwarded-Proto`.
    #[serde(default = "default_public_scheme")]
    pub public_scheme: String,
    /// Host used in image URLs when the request names none. Falls back to
    /// `bind`, with a wildcard address replaced by `localhost`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_host: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_scheme: default_public_scheme(),
            public_host: None,
        }
    }
}

impl ServerSettings {
    pub fn public_host(&self) -> String {
        match &self.public_host {
            Some(host) => host.clone(),
            None => advertised_host(&self.bind),
        }
    }
}

/// The host clients can reach a listener bound to `bind` at. `0.0.0.0` and
/// `[::]` are not routable, so they become `localhost` on the same port.
pub fn advertised_host(bind: &str) -> String {
    match bind.parse::<SocketAddr>() {
        Ok(addr) if addr.ip().is_unspecified() => format!("localhost:{}", addr.port()),
        _ => bind.to_string(),
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_public_scheme() -> String {
    "http".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_service")]
    pub service: String,
}

impl RedisSettings {
    /// The connection URL with any `${NAME}` placeholder expanded.
    pub fn resolved_url<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        expand_placeholders(&self.url, lookup)
    }

    pub fn resolved_url_from_env(&self) -> Result<String, ConfigError> {
        self.resolved_url(|name| std::env::var(name).ok())
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: default_prefix(),
            service: default_service(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "quill".to_string()
}

fn default_service() -> String {
    "blog".to_string()
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` if it exists and returns the defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("no configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Expands `${NAME}` placeholders in the server section through `lookup`.
    /// The Redis URL is left as written; see [`RedisSettings::resolved_url`].
    pub fn resolve_with<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.server.bind = expand_placeholders(&self.server.bind, &lookup)?;
        self.server.public_scheme = expand_placeholders(&self.server.public_scheme, &lookup)?;
        if let Some(host) = &self.server.public_host {
            self.server.public_host = Some(expand_placeholders(host, &lookup)?);
        }
        Ok(self)
    }

    pub fn resolve_from_env(self) -> Result<Self, ConfigError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }
}

/// Replaces a whole-value `${NAME}` with `lookup(NAME)`. Any other value is
/// returned unchanged.
pub fn expand_placeholders<F>(value: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(name) => lookup(name).ok_or_else(|| ConfigError::MissingVariable(name.to_string())),
        None => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "REDIS_URL" => Some("redis://cache:6379".to_string()),
            "PUBLIC_HOST" => Some("blog.example.com".to_string()),
            _ => None,
        }
    }

    #[test]
    fn defaults_cover_every_section() {
        let settings = Settings::default();
        assert_eq!(settings.server.bind, "127.0.0.1:5000");
        assert_eq!(settings.server.public_host(), "127.0.0.1:5000");
        assert_eq!(settings.store.backend, StoreBackend::Redis);
        assert_eq!(settings.redis.url, "${REDIS_URL}");
        assert_eq!(settings.redis.prefix, "quill");
    }

    #[test]
    fn partial_files_keep_defaults() {
        let settings = Settings::from_toml_str("[store]\nbackend = \"memory\"\n").unwrap();
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert_eq!(settings.server.public_scheme, "http");
        assert_eq!(settings.redis.service, "blog");
    }

    #[test]
    fn placeholders_expand_through_lookup() {
        assert_eq!(expand_placeholders("${REDIS_URL}", lookup).unwrap(), "redis://cache:6379");
        assert_eq!(expand_placeholders("plain", lookup).unwrap(), "plain");
        let err = expand_placeholders("${NOPE}", lookup).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(ref name) if name == "NOPE"));
    }

    #[test]
    fn resolving_does_not_require_redis_url() {
        let settings = Settings::default().resolve_with(|_| None).unwrap();
        assert_eq!(settings.store.backend, StoreBackend::Redis);
        assert_eq!(settings.redis.url, "${REDIS_URL}");

        let err = settings.redis.resolved_url(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(ref name) if name == "REDIS_URL"));
        assert_eq!(settings.redis.resolved_url(lookup).unwrap(), "redis://cache:6379");
    }

    #[test]
    fn wildcard_bind_is_advertised_as_localhost() {
        assert_eq!(advertised_host("0.0.0.0:5000"), "localhost:5000");
        assert_eq!(advertised_host("[::]:8080"), "localhost:8080");
        assert_eq!(advertised_host("127.0.0.1:5000"), "127.0.0.1:5000");
        assert_eq!(advertised_host("blog.local:80"), "blog.local:80");

        let settings = Settings::from_toml_str("[server]\nbind = \"0.0.0.0:9000\"\n").unwrap();
        assert_eq!(settings.server.public_host(), "localhost:9000");
    }

    #[test]
    fn loads_file_and_resolves() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nbind = \"0.0.0.0:8080\"\npublic_host = \"${{PUBLIC_HOST}}\"\n\n[redis]\nprefix = \"test\""
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap().resolve_with(lookup).unwrap();
        assert_eq!(settings.server.bind, "0.0.0.0:8080");
        assert_eq!(settings.server.public_host(), "blog.example.com");
        assert_eq!(settings.redis.resolved_url(lookup).unwrap(), "redis://cache:6379");
        assert_eq!(settings.redis.prefix, "test");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.server.bind, "127.0.0.1:5000");
        assert!(Settings::load(&dir.path().join("absent.toml")).is_err());
    }
}

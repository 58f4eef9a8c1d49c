use std::path::PathBuf;

use anyhow::{Context, Result};
use quillpress::{
    MemoryStore, RedisStore, ServingOrigin,
    config::{DEFAULT_CONFIG_FILE, Settings, StoreBackend},
};

/// A connected store, chosen by configuration or `--memory`.
pub enum Backend {
    Redis(RedisStore),
    Memory(MemoryStore),
}

/// Settings resolved for one CLI invocation.
pub struct AppContext {
    pub config_path: PathBuf,
    pub settings: Settings,
}

impl AppContext {
    /// Loads the configuration. An explicitly named file must exist; the
    /// default `quillpress.toml` is optional.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        let (config_path, settings) = match explicit {
            Some(path) => {
                let settings =
                    Settings::load(&path).with_context(|| format!("Failed to load {}", path.display()))?;
                (path, settings)
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                let settings = Settings::load_or_default(&path).context("Failed to load quillpress.toml")?;
                (path, settings)
            }
        };

        let settings = settings
            .resolve_from_env()
            .context("Failed to resolve configuration")?;
        Ok(Self { config_path, settings })
    }

    /// Origin used for image URLs outside of an HTTP request.
    pub fn origin(&self) -> ServingOrigin {
        ServingOrigin::new(
            self.settings.server.public_scheme.clone(),
            self.settings.server.public_host(),
        )
    }

    pub async fn open_store(&self, force_memory: bool) -> Result<Backend> {
        if force_memory || self.settings.store.backend == StoreBackend::Memory {
            log::info!("using the in-memory store");
            return Ok(Backend::Memory(MemoryStore::new()));
        }

        let redis = &self.settings.redis;
        let url = redis
            .resolved_url_from_env()
            .context("Failed to resolve the Redis URL")?;
        log::info!("connecting to redis (prefix {}:{})", redis.prefix, redis.service);
        let store = RedisStore::connect(&url, &redis.prefix, &redis.service)
            .await
            .context("Failed to connect to Redis")?;
        Ok(Backend::Redis(store))
    }
}

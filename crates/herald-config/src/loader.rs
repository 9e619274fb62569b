use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::HeraldConfig;

/// Loads and optionally hot-reloads the Herald configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<HeraldConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > HERALD_CONFIG env > ~/.herald/herald.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("HERALD_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".herald")
            .join("herald.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> herald_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::parse_file(&config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            HeraldConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Validate config: log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(herald_core::HeraldError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    fn parse_file(path: &Path) -> herald_core::Result<HeraldConfig> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str::<HeraldConfig>(&raw).map_err(|e| {
            herald_core::HeraldError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> HeraldConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<HeraldConfig>> {
        Arc::clone(&self.config)
    }

    /// Path being watched.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply process env var overrides (HERALD_MODEL, HERALD_MAX_ROUNDS, etc.)
    pub fn apply_env_overrides(config: HeraldConfig) -> HeraldConfig {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from(
        mut config: HeraldConfig,
        var: impl Fn(&str) -> Option<String>,
    ) -> HeraldConfig {
        if let Some(v) = var("HERALD_MODEL") {
            config.agent.model = v;
        }
        if let Some(v) = var("HERALD_MAX_ROUNDS")
            && let Ok(rounds) = v.parse::<u32>()
        {
            config.agent.max_rounds = rounds;
        }
        if let Some(v) = var("HERALD_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = var("HERALD_DB_PATH") {
            config.memory.db_path = PathBuf::from(v);
        }
        // Config file takes priority, env is the fallback.
        if config.services.openai_api_key.is_none()
            && let Some(v) = var("OPENAI_API_KEY")
        {
            config.services.openai_api_key = Some(v);
        }
        if config.services.openai_base_url.is_none()
            && let Some(v) = var("OPENAI_BASE_URL")
        {
            config.services.openai_base_url = Some(v);
        }
        config
    }

    /// Reload the config from disk.
    pub fn reload(&self) -> herald_core::Result<()> {
        if !self.config_path.exists() {
            return Err(herald_core::HeraldError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::apply_env_overrides(Self::parse_file(&self.config_path)?);
        new_config
            .validate()
            .map_err(herald_core::HeraldError::Config)?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }

    /// Start a background file watcher that swaps in the new config when the file changes.
    /// Returns a handle to the watcher (must be kept alive for watching to continue).
    pub fn watch(&self) -> herald_core::Result<notify::RecommendedWatcher> {
        let config = Arc::clone(&self.config);
        let path_for_event = self.config_path.clone();

        info!(config_path = ?self.config_path, "starting config file watcher");

        let mut watcher =
            notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        return;
                    }
                    let is_our_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == path_for_event.file_name());
                    if !is_our_file {
                        return;
                    }

                    info!("config file changed, reloading");
                    match ConfigLoader::parse_file(&path_for_event) {
                        Ok(new_config) => {
                            let new_config = ConfigLoader::apply_env_overrides(new_config);
                            match new_config.validate() {
                                Ok(_) => {
                                    *config.write() = new_config;
                                    info!("configuration hot-reloaded successfully");
                                }
                                Err(e) => {
                                    warn!(error = %e, "config file is invalid, keeping current config");
                                }
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "config file has errors, keeping current config");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "file watcher error");
                }
            })
            .map_err(|e| {
                herald_core::HeraldError::Config(format!("failed to create file watcher: {}", e))
            })?;

        // Watch the parent directory (some editors create temp files + rename)
        let watch_path = self.config_path.parent().unwrap_or(Path::new("."));
        watcher
            .watch(watch_path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                herald_core::HeraldError::Config(format!("failed to watch config directory: {}", e))
            })?;

        Ok(watcher)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Renderer settings.
///
/// ```toml
/// template_dir = "~/site/templates"
///
/// [globals]
/// site_name = "Example"
///
/// [handlers]
/// header = "layout.html#header"
/// footer = "partials/footer.html"
/// ```
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory that relative template paths are resolved against.
    pub template_dir: PathBuf,
    /// Values bound as globals in every render.
    #[serde(default)]
    pub globals: BTreeMap<String, String>,
    /// Handler name to `path[#block]`: the template (relative to `template_dir`)
    /// it renders, and optionally the one top-level block to resolve first.
    #[serde(default)]
    pub handlers: BTreeMap<String, String>,
}

/// What a configured handler renders.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerTarget {
    /// Template path as written, relative to `template_dir` unless absolute.
    pub template: PathBuf,
    pub block: Option<String>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded template path
        config.template_dir =
            Self::expand_path(&config.template_dir).unwrap_or(config.template_dir);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/blocktpl");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Configured handlers, split into template path and optional block.
    pub fn handler_targets(&self) -> impl Iterator<Item = (&str, HandlerTarget)> {
        self.handlers.iter().map(|(name, spec)| {
            let (path, block) = match spec.split_once('#') {
                Some((path, block)) if !block.is_empty() => (path, Some(block.to_string())),
                Some((path, _)) => (path, None),
                None => (spec.as_str(), None),
            };
            let target = HandlerTarget {
                template: PathBuf::from(path),
                block,
            };
            (name.as_str(), target)
        })
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

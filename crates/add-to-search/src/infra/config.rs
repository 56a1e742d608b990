//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".add-to-search/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub merge: Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// File extension that marks aggregation documents.
    #[serde(default = "Defaults::default_extension")]
    pub extension: String,
    /// Directory under the project root holding project settings.
    #[serde(default = "Defaults::default_state_dir")]
    pub state_dir: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "Defaults::default_log_filter")]
    pub log_filter: String,
}

impl Defaults {
    fn default_extension() -> String {
        ".search".to_owned()
    }

    fn default_state_dir() -> String {
        ".add-to-search".into()
    }

    fn default_log_filter() -> String {
        "warn".into()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            extension: Self::default_extension(),
            state_dir: Self::default_state_dir(),
            log_filter: Self::default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Merge {
    #[serde(default)]
    select_inserted: Option<bool>,
}

impl Merge {
    fn default_select_inserted() -> bool {
        true
    }

    /// Whether inserted lines become the target's selection.
    pub fn select_inserted(&self) -> bool {
        self.select_inserted
            .unwrap_or_else(Self::default_select_inserted)
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    extension: Option<String>,
    log_filter: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            extension: env::var("ADD_TO_SEARCH_EXTENSION").ok(),
            log_filter: env::var("ADD_TO_SEARCH_LOG").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(extension: &str, log_filter: &str) -> Self {
        Self {
            extension: Some(extension.to_owned()),
            log_filter: Some(log_filter.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            merge: merge_merge(self.merge, other.merge),
        }
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        extension: choose(base.extension, overlay.extension, Defaults::default_extension),
        state_dir: choose(base.state_dir, overlay.state_dir, Defaults::default_state_dir),
        log_filter: choose(base.log_filter, overlay.log_filter, Defaults::default_log_filter),
    }
}

fn merge_merge(mut base: Merge, overlay: Merge) -> Merge {
    if let Some(value) = overlay.select_inserted {
        base.select_inserted = Some(value);
    }
    base
}

fn choose(base: String, overlay: String, default_fn: fn() -> String) -> String {
    if overlay != default_fn() {
        overlay
    } else {
        base
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("add-to-search/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    Ok(Some(project_root()?.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

/// Root of the project the current directory belongs to: the nearest ancestor
/// holding `.git`, or the current directory itself.
pub fn project_root() -> Result<PathBuf> {
    let cwd = env::current_dir().context("unable to determine working directory")?;
    Ok(find_repo_root(&cwd).unwrap_or(cwd))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(extension) = env.extension {
        config.defaults.extension = extension;
    }
    if let Some(log_filter) = env.log_filter {
        config.defaults.log_filter = log_filter;
    }
    config
}

use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const CONFIG_ENV: &str = "AGENTCONF_CONFIG";
pub(crate) const DATA_DIR_ENV: &str = "AGENTCONF_DATA_DIR";
const DEFAULT_CONFIG_FILE: &str = "agentconf.toml";
const DEFAULT_DATA_DIR: &str = ".agentconf/data";
const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// On-disk `agentconf.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    data_dir: Option<PathBuf>,
    bind: Option<String>,
    policy: Option<PathBuf>,
    integrations: Option<toml::Table>,
}

/// Effective settings after file, environment and flag overrides
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub data_dir: PathBuf,
    pub bind: String,
    pub policy: Option<PathBuf>,
    pub integrations: serde_json::Value,
}

#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub policy: Option<PathBuf>,
    pub bind: Option<String>,
}

impl Settings {
    pub(crate) fn load(overrides: Overrides) -> Result<Self> {
        let file = match config_path(overrides.config) {
            Some(path) => read_settings_file(&path)?,
            None => SettingsFile::default(),
        };

        let integrations = match file.integrations {
            Some(table) => serde_json::to_value(table)
                .context("Failed to convert [integrations] to JSON")?,
            None => serde_json::Value::Object(serde_json::Map::new()),
        };

        let data_dir = overrides
            .data_dir
            .or_else(|| env::var_os(DATA_DIR_ENV).map(PathBuf::from))
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Self {
            data_dir,
            bind: overrides
                .bind
                .or(file.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            policy: overrides.policy.or(file.policy),
            integrations,
        })
    }
}

/// Explicit path, then `AGENTCONF_CONFIG`, then `./agentconf.toml` if present
fn config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.is_file().then_some(local)
        })
}

fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

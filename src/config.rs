use crate::executor::Executor;
use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Variables set on the executor before the first script runs.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Print each console line back before running it.
    #[serde(default)]
    pub echo_commands: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            echo_commands: false,
            log_level: default_log_level(),
        }
    }
}

fn default_prompt() -> String {
    "$> ".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    prompt: Option<String>,
    echo_commands: Option<bool>,
    log_level: Option<String>,
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Result<Self> {
        toml::from_str(DEFAULT_CONFIG).context("embedded default config does not parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge `path` if given, otherwise ~/.config/cmdscript/config.toml if it exists
    ///
    /// Scalars in the overlay override defaults; variables are added on top.
    /// An explicitly requested file must exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config()?;
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read config {}", path.display()))?;
                let overlay: ConfigOverlay = toml::from_str(&content)
                    .with_context(|| format!("cannot parse config {}", path.display()))?;
                config.apply_overlay(overlay);
            }
            None => {
                if let Some(overlay) = Self::load_user_overlay() {
                    config.apply_overlay(overlay);
                }
            }
        }
        Ok(config)
    }

    fn user_config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(Path::new(&home).join(".config/cmdscript/config.toml"))
    }

    /// Try to load user overlay from ~/.config/cmdscript/config.toml.
    fn load_user_overlay() -> Option<ConfigOverlay> {
        let content = std::fs::read_to_string(Self::user_config_path()?).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                // The logger is configured from this file, so it is not up yet.
                eprintln!("cmdscript: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.prompt {
            self.settings.prompt = v;
        }
        if let Some(v) = s.echo_commands {
            self.settings.echo_commands = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }
        self.variables.extend(overlay.variables);
    }

    /// Configured log level; unknown names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.settings
            .log_level
            .trim()
            .parse()
            .unwrap_or(LevelFilter::Info)
    }

    /// Sets the configured variables on `executor`.
    pub fn apply(&self, executor: &mut Executor) {
        for (name, value) in &self.variables {
            executor.set_variable(name.as_str(), value.as_str());
        }
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

//! Layered configuration: JSON file, then environment, then CLI flags.
//!
//! ```json
//! { "ollama": { "host": "127.0.0.1:11434", "model": "llama3:8b", "temperature": 0.3 }, "verbose": false }
//! ```
//!
//! Every field is optional in the file; missing ones take their defaults.

use std::path::{Path, PathBuf};

use gitsage_ollama::Ollama;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Prefix of the environment overrides (`GITSAGE_OLLAMA_HOST`, ...).
pub const ENV_PREFIX: &str = "GITSAGE";

/// File name looked up under `$HOME/.config` when no `--config` is given.
pub const DEFAULT_FILE_NAME: &str = "gitsage.json";

/// Connection settings for the local Ollama server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// `host:port`, or a full URL with scheme.
    pub host: String,
    /// Model name passed in every chat request.
    pub model: String,
    /// Sampling temperature, `0.0..=1.0`.
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:11434".into(),
            model: "llama3:8b".into(),
            temperature: 0.3,
        }
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ollama connection settings.
    pub ollama: OllamaConfig,
    /// Print progress details.
    pub verbose: bool,
}

impl Config {
    /// Parse a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Load from `explicit` if given (it must exist), otherwise from
    /// [`Config::default_path`] when that file exists, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "using config file");
                Self::from_path(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `$HOME/.config/gitsage.json`, if `HOME` is set.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config").join(DEFAULT_FILE_NAME))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), Error> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply `GITSAGE_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        if let Some(host) = var("OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(model) = var("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(raw) = var("OLLAMA_TEMPERATURE") {
            self.ollama.temperature = raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{ENV_PREFIX}_OLLAMA_TEMPERATURE is not a number: {raw}"
                ))
            })?;
        }
        if let Some(raw) = var("VERBOSE") {
            self.verbose = parse_bool(&raw).ok_or_else(|| {
                Error::Config(format!("{ENV_PREFIX}_VERBOSE is not a boolean: {raw}"))
            })?;
        }
        Ok(())
    }

    /// Reject settings no request could be built from.
    pub fn validate(&self) -> Result<(), Error> {
        let temperature = self.ollama.temperature;
        if !(0.0..=1.0).contains(&temperature) {
            return Err(Error::Config(format!(
                "temperature must be between 0.0 and 1.0, got {temperature}"
            )));
        }
        if self.ollama.host.trim().is_empty() {
            return Err(Error::Config("ollama host is empty".into()));
        }
        if self.ollama.model.trim().is_empty() {
            return Err(Error::Config("ollama model is empty".into()));
        }
        Ok(())
    }

    /// Server base URL, with `http://` added when the host has no scheme.
    pub fn base_url(&self) -> String {
        let host = self.ollama.host.trim();
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        }
    }

    /// A client pointed at [`Config::base_url`] using the configured model.
    pub fn client(&self) -> Ollama {
        Ollama::new()
            .base_url(self.base_url())
            .model(self.ollama.model.clone())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

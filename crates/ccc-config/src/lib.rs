//! Driver configuration: defaults, `ccc.toml` discovery, and environment
//! variables, overlaid in precedence order (highest first):
//!
//! 1. CLI flags (applied by the caller, outside this crate)
//! 2. environment variables (`CCC_CLANG`, `CCC_ECHO`, `CCC_FALLBACK`)
//! 3. `ccc.toml`, discovered by walking up from the start directory
//! 4. built-in defaults
//!
//! Each resolved field remembers which of these layers it came from, so
//! callers (and `-ccc-print-options`-style diagnostics) can explain a
//! setting's provenance rather than just its value.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Where a single resolved field's value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    ConfigFile(PathBuf),
    Environment(&'static str),
}

/// The on-disk shape of `ccc.toml`. Every field is optional: an absent
/// field simply leaves the default (or environment override) in place.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    default_arch: Option<String>,
    toolchain_root: Option<PathBuf>,
    ccc_clang: Option<bool>,
    ccc_echo: Option<bool>,
    ccc_fallback: Option<bool>,
}

/// Resolved driver configuration, with per-field provenance.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub default_arch: Option<String>,
    pub toolchain_root: Option<PathBuf>,
    pub ccc_clang: bool,
    pub ccc_echo: bool,
    pub ccc_fallback: bool,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        let mut source_attribution = HashMap::new();
        for field in ["default_arch", "toolchain_root", "ccc_clang", "ccc_echo", "ccc_fallback"] {
            source_attribution.insert(field.to_string(), ConfigSource::Defaults);
        }
        Self {
            default_arch: None,
            toolchain_root: None,
            ccc_clang: false,
            ccc_echo: false,
            ccc_fallback: false,
            source_attribution,
        }
    }
}

impl DriverConfig {
    /// Discover and resolve configuration starting from the current
    /// directory, reading environment variables from the process.
    pub fn discover() -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::discover_from(&start_dir, &EnvReader::process())
    }

    /// Discover and resolve configuration starting from an explicit
    /// directory, with an explicit environment source. Kept separate from
    /// [`Self::discover`] so tests can avoid touching process-global state.
    pub fn discover_from(start_dir: &Path, env: &EnvReader) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(config_path) = discover_config_file_from(start_dir) {
            let toml_config = load_config_file(&config_path)?;
            let source = ConfigSource::ConfigFile(config_path.clone());
            config.apply_toml(toml_config, source);
        }

        config.apply_env(env);

        Ok(config)
    }

    fn apply_toml(&mut self, toml_config: TomlConfig, source: ConfigSource) {
        if let Some(value) = toml_config.default_arch {
            self.default_arch = Some(value);
            self.source_attribution.insert("default_arch".to_string(), source.clone());
        }
        if let Some(value) = toml_config.toolchain_root {
            self.toolchain_root = Some(value);
            self.source_attribution.insert("toolchain_root".to_string(), source.clone());
        }
        if let Some(value) = toml_config.ccc_clang {
            self.ccc_clang = value;
            self.source_attribution.insert("ccc_clang".to_string(), source.clone());
        }
        if let Some(value) = toml_config.ccc_echo {
            self.ccc_echo = value;
            self.source_attribution.insert("ccc_echo".to_string(), source.clone());
        }
        if let Some(value) = toml_config.ccc_fallback {
            self.ccc_fallback = value;
            self.source_attribution.insert("ccc_fallback".to_string(), source.clone());
        }
    }

    fn apply_env(&mut self, env: &EnvReader) {
        if let Some(value) = env.bool_var("CCC_CLANG") {
            self.ccc_clang = value;
            self.source_attribution
                .insert("ccc_clang".to_string(), ConfigSource::Environment("CCC_CLANG"));
        }
        if let Some(value) = env.bool_var("CCC_ECHO") {
            self.ccc_echo = value;
            self.source_attribution
                .insert("ccc_echo".to_string(), ConfigSource::Environment("CCC_ECHO"));
        }
        if let Some(value) = env.bool_var("CCC_FALLBACK") {
            self.ccc_fallback = value;
            self.source_attribution
                .insert("ccc_fallback".to_string(), ConfigSource::Environment("CCC_FALLBACK"));
        }
    }
}

/// Walks up from `start_dir` looking for `ccc.toml`, stopping at a VCS
/// root marker (or the filesystem root) if none is found.
fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
    let mut current_dir = start_dir.to_path_buf();
    loop {
        let candidate = current_dir.join("ccc.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        if current_dir.join(".git").exists() {
            return None;
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A thin indirection over environment-variable lookups, so configuration
/// resolution can be tested without mutating the real process environment.
#[derive(Debug, Default, Clone)]
pub struct EnvReader {
    overrides: HashMap<&'static str, String>,
}

impl EnvReader {
    /// Reads directly from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self::default()
    }

    /// Builds a reader backed by an explicit map instead of the process
    /// environment, for tests.
    #[must_use]
    pub fn from_map(overrides: HashMap<&'static str, String>) -> Self {
        Self { overrides }
    }

    fn raw_var(&self, name: &'static str) -> Option<String> {
        if let Some(value) = self.overrides.get(name) {
            return Some(value.clone());
        }
        if self.overrides.is_empty() {
            std::env::var(name).ok()
        } else {
            None
        }
    }

    /// A variable is "true" if set to a non-zero integer,
    /// "false" if set to anything else (including empty), and unset maps
    /// to `None` so the caller's existing value is left alone.
    #[must_use]
    pub fn bool_var(&self, name: &'static str) -> Option<bool> {
        self.raw_var(name).map(|value| value.trim().parse::<i64>().is_ok_and(|n| n != 0))
    }
}

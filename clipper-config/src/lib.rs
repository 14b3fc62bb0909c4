//! Loader for workspace configuration with YAML + environment overlays.
//!
//! The core clients take endpoints, headers, and the cookie path
//! programmatically; this crate is the standard way for a surrounding
//! application to supply them. Sources merge in order: YAML file(s), then
//! `CLIPPER_`-prefixed environment variables; `${VAR}` placeholders are
//! expanded (bounded depth) before typed deserialization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct ClipperConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    pub archive: Option<ArchiveConfig>,
}

/// Session defaults applied by the surrounding application when it builds
/// a `Session`.
#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Where the cookie snapshot lives between runs.
    pub cookie_file: Option<PathBuf>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Scheme → proxy endpoint, e.g. `https: "http://proxy:3128"`.
    #[serde(default)]
    pub proxies: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    12
}

#[derive(Debug, Deserialize)]
pub struct ArchiveConfig {
    /// Base URL the article paths are resolved against.
    pub api_prefix: String,
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct ClipperConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ClipperConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipperConfigLoader {
    /// Start with the defaults: `CLIPPER_`-prefixed env overrides on top of
    /// whatever file or inline sources are attached next.
    ///
    /// ```
    /// use clipper_config::ClipperConfigLoader;
    ///
    /// let config = ClipperConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.feed.page_size, 12);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("CLIPPER").separator("__"));
        Self { builder }
    }

    /// Attach a config file; the `config` crate infers the format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self.builder.add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Merge an inline YAML snippet (tests, embedded defaults).
    ///
    /// ```
    /// use clipper_config::ClipperConfigLoader;
    ///
    /// let config = ClipperConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// archive:
    ///   api_prefix: "https://api.example.com/v1/"
    /// session:
    ///   proxies:
    ///     https: "http://proxy:3128"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(
    ///     config.archive.unwrap().api_prefix,
    ///     "https://api.example.com/v1/"
    /// );
    /// assert_eq!(config.session.proxies["https"], "http://proxy:3128");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, and deserialize.
    pub fn load(self) -> Result<ClipperConfig, ConfigError> {
        let merged = self.builder.build()?;
        let mut raw: Value = merged.try_deserialize()?;
        expand_env_in_value(&mut raw);
        serde_json::from_value(raw).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_stops_at_unknown_variables() {
        let mut v = Value::String("${CLIPPER_TEST_SURELY_UNSET_VAR}".into());
        expand_env_in_value(&mut v);
        assert_eq!(v, Value::String("${CLIPPER_TEST_SURELY_UNSET_VAR}".into()));
    }

    #[test]
    fn expansion_recurses_into_containers() {
        temp_env::with_var("CLIPPER_TEST_TOKEN", Some("tok"), || {
            let mut v = serde_json::json!({"headers": {"authorization": "${CLIPPER_TEST_TOKEN}"}});
            expand_env_in_value(&mut v);
            assert_eq!(v["headers"]["authorization"], "tok");
        });
    }
}

use anyhow::Result;
use config::{Config, ConfigError, Environment, File, Map, Source, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::{marker::PhantomData, path::PathBuf, time::Duration};
use url::Url;

use crate::paths::{config_file, default_session_file};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the portal backend's REST API
    pub api_endpoint: Url,
    /// Base URL of the portal's web front end, used for post-verification redirects
    pub portal_url: Url,
    /// Where a login that still needs a second factor is remembered
    pub session_file: PathBuf,
    /// Timer and polling configuration of the verification screens
    pub timing: TimingSettings,
}

/// All values in milliseconds except `poll_secs` and `request_timeout_secs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    pub tick_ms: u64,
    pub poll_secs: u64,
    pub request_timeout_secs: u64,
    pub status_throttle_ms: u64,
    pub reconcile_delay_ms: u64,
    pub redirect_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: Url::parse("http://localhost:5000").expect("Valid hardcoded API URL"),
            portal_url: Url::parse("http://localhost:3000").expect("Valid hardcoded portal URL"),
            session_file: default_session_file(),
            timing: TimingSettings::default(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            poll_secs: 30,
            request_timeout_secs: 10,
            status_throttle_ms: 3000,
            reconcile_delay_ms: 1000,
            redirect_delay_ms: 1500,
        }
    }
}

impl TimingSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn status_throttle(&self) -> Duration {
        Duration::from_millis(self.status_throttle_ms)
    }

    pub fn reconcile_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_delay_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = config_file();

        let s = Config::builder()
            .add_source(DefaultImplSource::<Settings>::new())
            .add_source(File::with_name(&path.as_path().display().to_string()).required(false))
            .add_source(
                Environment::with_prefix("SK_PORTAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(s.try_deserialize()?)
    }
}

// Loading without a config file still needs every value, so the defaults
// from `Settings::default()` are fed in as the lowest-priority source.
// This serializes them into a `toml::Value` and converts that the same way
// `config` converts toml files.

struct DefaultImplSource<T: Default>(PhantomData<T>);

impl<T: Default> Clone for DefaultImplSource<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Default> std::fmt::Debug for DefaultImplSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DefaultImplSource").finish()
    }
}

impl<T: Default> DefaultImplSource<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Default + Serialize + Send + Sync + 'static> Source for DefaultImplSource<T> {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        let toml_value =
            toml::Value::try_from(T::default()).map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        let value = from_toml_value(&toml_value);
        match value.kind {
            ValueKind::Table(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

fn from_toml_value(value: &toml::Value) -> Value {
    match *value {
        toml::Value::String(ref value) => Value::new(None, value.to_string()),
        toml::Value::Float(value) => Value::new(None, value),
        toml::Value::Integer(value) => Value::new(None, value),
        toml::Value::Boolean(value) => Value::new(None, value),

        toml::Value::Table(ref table) => {
            let mut m = Map::new();

            for (key, value) in table {
                m.insert(key.clone(), from_toml_value(value));
            }

            Value::new(None, m)
        }

        toml::Value::Array(ref array) => {
            let mut l = Vec::new();

            for value in array {
                l.push(from_toml_value(value));
            }

            Value::new(None, l)
        }

        toml::Value::Datetime(ref datetime) => Value::new(None, datetime.to_string()),
    }
}

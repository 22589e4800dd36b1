//! Store configuration lookups for the carrier.
//!
//! The host exposes its settings as a flat key-value store. Carrier settings
//! live under `carriers/parcify_carrier/`, the store origin under
//! `shipping/origin/`.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use serde_json::{Error as SerdeError, Value};

use crate::domain::StoreOrigin;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "Parcify";
const APP_NAME: &str = "ParcifyCarrier";

pub const CARRIER_PREFIX: &str = "carriers/parcify_carrier/";
pub const ORIGIN_PREFIX: &str = "shipping/origin/";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read access to host configuration.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Turns the at-rest form of a stored secret into its plain value.
pub trait SecretDecryptor: Send + Sync {
    fn decrypt(&self, stored: &str) -> String;
}

/// For hosts that already hand out plain secrets.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaintextSecrets;

impl SecretDecryptor for PlaintextSecrets {
    fn decrypt(&self, stored: &str) -> String {
        stored.to_string()
    }
}

/// In-memory configuration, also the shape of the JSON settings file.
#[derive(Clone, Debug, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a carrier key, prefixing it with `carriers/parcify_carrier/`.
    pub fn with_carrier(self, field: &str, value: impl Into<String>) -> Self {
        self.with(format!("{CARRIER_PREFIX}{field}"), value)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SettingsError> {
        let parsed: HashMap<String, Value> = serde_json::from_str(raw)?;
        let values = parsed
            .into_iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|value| (key, value)))
            .collect();
        Ok(Self { values })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Loads `settings.json` from the platform config directory.
    pub fn load_default() -> Result<Self, SettingsError> {
        let path = settings_file().ok_or(SettingsError::StorageUnavailable)?;
        Self::from_json_file(&path)
    }
}

impl ConfigSource for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

pub fn settings_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(string) => Some(string),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(if flag { "1" } else { "0" }.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Carrier settings resolved from a [`ConfigSource`].
#[derive(Clone, Debug, PartialEq)]
pub struct CarrierConfig {
    pub active: bool,
    pub title: String,
    pub price: f64,
    pub free_shipping_subtotal: f64,
    pub parcel_name: String,
    pub user_id: String,
    /// Password as stored, still encrypted.
    pub password: String,
    pub gateway_url: String,
    pub pickup_address: String,
    pub debug: bool,
    pub verify_tls: bool,
    pub request_timeout: Duration,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            active: true,
            title: String::new(),
            price: 0.0,
            free_shipping_subtotal: 0.0,
            parcel_name: String::new(),
            user_id: String::new(),
            password: String::new(),
            gateway_url: String::new(),
            pickup_address: String::new(),
            debug: false,
            verify_tls: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CarrierConfig {
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let get = |field: &str| source.get(&format!("{CARRIER_PREFIX}{field}"));
        let text = |field: &str| get(field).unwrap_or_default();
        let defaults = Self::default();

        Self {
            active: get("active").map_or(defaults.active, |raw| parse_flag(&raw)),
            title: text("title"),
            price: parse_amount(&text("price")),
            free_shipping_subtotal: parse_amount(&text("free_shipping_subtotal")),
            parcel_name: text("parcelname"),
            user_id: text("userid"),
            password: text("password"),
            gateway_url: text("gateway_url"),
            pickup_address: text("pickup_address"),
            debug: get("debug").is_some_and(|raw| parse_flag(&raw)),
            verify_tls: get("verify_tls").map_or(defaults.verify_tls, |raw| parse_flag(&raw)),
            request_timeout: get("request_timeout")
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(defaults.request_timeout, Duration::from_secs),
        }
    }
}

impl StoreOrigin {
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let get = |field: &str| {
            source
                .get(&format!("{ORIGIN_PREFIX}{field}"))
                .filter(|value| !value.trim().is_empty())
        };
        Self {
            street_line1: get("street_line1"),
            street_line2: get("street_line2"),
            postcode: get("postcode"),
            city: get("city"),
            country_id: get("country_id"),
        }
    }
}

/// Leading numeric prefix of `raw`, or 0 when there is none.
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let end = trimmed
        .char_indices()
        .take_while(|(idx, ch)| {
            ch.is_ascii_digit() || *ch == '.' || (*idx == 0 && (*ch == '-' || *ch == '+'))
        })
        .map(|(idx, ch)| idx + ch.len_utf8())
        .last()
        .unwrap_or(0);
    trimmed[..end].parse::<f64>().unwrap_or(0.0)
}

pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

//! Process-lifetime cache of carrier responses keyed on a request fingerprint.
//!
//! The table never evicts. One instance is shared (behind an `Arc`) by every
//! caller that should see the same entries.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

pub type CacheKey = u32;

/// Parameters of a carrier request, as fed to [`fingerprint`].
#[derive(Clone, Debug, PartialEq)]
pub enum RequestParams {
    /// Named fields in the order the request lists them.
    Fields(Vec<(String, String)>),
    /// An already serialized request.
    Raw(String),
}

/// CRC-32 of the request. For [`RequestParams::Fields`] the hashed text is the
/// carrier code, then every field name, then every field value, comma joined.
/// Field order matters.
pub fn fingerprint(carrier_code: &str, params: &RequestParams) -> CacheKey {
    match params {
        RequestParams::Raw(raw) => crc32fast::hash(raw.as_bytes()),
        RequestParams::Fields(fields) => {
            let joined = std::iter::once(carrier_code)
                .chain(fields.iter().map(|(name, _)| name.as_str()))
                .chain(fields.iter().map(|(_, value)| value.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            crc32fast::hash(joined.as_bytes())
        }
    }
}

pub struct QuoteCache<V> {
    carrier_code: String,
    entries: Mutex<HashMap<CacheKey, V>>,
}

impl<V: Clone> QuoteCache<V> {
    pub fn new(carrier_code: impl Into<String>) -> Self {
        Self {
            carrier_code: carrier_code.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared(carrier_code: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(carrier_code))
    }

    pub fn key(&self, params: &RequestParams) -> CacheKey {
        fingerprint(&self.carrier_code, params)
    }

    pub async fn get(&self, key: CacheKey) -> Option<V> {
        self.entries.lock().await.get(&key).cloned()
    }

    pub async fn set(&self, key: CacheKey, value: V) {
        self.entries.lock().await.insert(key, value);
    }

    pub async fn cached(&self, params: &RequestParams) -> Option<V> {
        self.get(self.key(params)).await
    }

    pub async fn store(&self, params: &RequestParams, value: V) {
        self.set(self.key(params), value).await;
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

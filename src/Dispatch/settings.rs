// Key/value configuration bundle handed to channels.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::warn;

/// String settings with typed, defaulted lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSettings {
    values: HashMap<String, String>,
}

impl ChannelSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }

    /// Collect every environment variable starting with `prefix`, keyed by
    /// the remainder of its name (`DMXP_ServerAddress` -> `ServerAddress`).
    pub fn from_env(prefix: &str) -> Self {
        Self::from_pairs(std::env::vars().filter_map(|(k, v)| {
            k.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest.to_owned(), v))
        }))
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value. Keys match exactly first, then ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .or_else(|| {
                self.values
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Parsed value, or `default` when missing or unparsable.
    pub fn try_get<T: FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.trim().parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(key, value = raw, "ignoring unparsable setting");
                    default
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Caller-supplied request headers.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::error::{Error, Result};

/// Sent when the caller sets no `User-Agent`. Some proxies in front of the
/// platform treat unidentified clients differently.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:105.0) Gecko/20100101 Firefox/105.0";

/// Sent when the caller sets no `Content-Type`.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Ordered header bag: name → values, names compared case-insensitively.
///
/// Headers are applied to the outgoing request in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any existing values for `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1.push(value),
            None => self.entries.push((name, vec![value])),
        }
        self
    }

    /// Replace all values for `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = vec![value],
            None => self.entries.push((name, vec![value])),
        }
        self
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|idx| self.entries[idx].1.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Convert to a `HeaderMap`, then fill in `User-Agent` and `Content-Type`
    /// where the caller left them unset or empty.
    pub(crate) fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, values) in &self.entries {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(format!("invalid header name '{}'", name)))?;
            for value in values {
                let header_value = HeaderValue::from_str(value).map_err(|_| {
                    Error::InvalidHeader(format!("invalid value for header '{}'", name))
                })?;
                map.append(header_name.clone(), header_value);
            }
        }

        default_header(&mut map, USER_AGENT, DEFAULT_USER_AGENT);
        default_header(&mut map, CONTENT_TYPE, DEFAULT_CONTENT_TYPE);
        Ok(map)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

fn default_header(map: &mut HeaderMap, name: HeaderName, value: &'static str) {
    if map.get(&name).is_none_or(|v| v.is_empty()) {
        map.insert(name, HeaderValue::from_static(value));
    }
}

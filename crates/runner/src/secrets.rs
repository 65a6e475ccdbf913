//! The secret resolution pipeline.
//!
//! Node code may embed `{{{secret::KEY}}}` placeholders. Before dispatch the
//! runner decodes the code blob, substitutes every placeholder with the
//! value held by the secret manager, and re-encodes. Resolution is a single
//! pass: fetched values are never rescanned, so a secret whose value itself
//! contains placeholder syntax passes through verbatim.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::SecretError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\{secret::([^}]*)\}\}\}").expect("placeholder pattern"));

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize)]
struct SecretValue {
    #[allow(dead_code)]
    key: String,
    value: Option<String>,
}

pub struct SecretResolver {
    client: reqwest::Client,
    base_url: String,
}

impl SecretResolver {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { client, base_url: base_url.into() })
    }

    /// Resolve placeholders in plain source text.
    ///
    /// Text without placeholders comes back byte-identical.
    pub async fn resolve_text(&self, text: &str) -> Result<String, SecretError> {
        let mut keys: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(text) {
            let key = caps[1].to_string();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        if keys.is_empty() {
            return Ok(text.to_string());
        }

        let mut values: HashMap<String, String> = HashMap::new();
        for key in keys {
            let value = self.fetch(&key).await?;
            values.insert(key, value);
        }

        // One pass over the original text; substituted values are not
        // rescanned.
        let resolved = PLACEHOLDER.replace_all(text, |caps: &regex::Captures<'_>| {
            values
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(resolved.into_owned())
    }

    /// Decode a base64 code blob, resolve its placeholders, re-encode.
    pub async fn resolve_encoded(&self, blob: &str) -> Result<String, SecretError> {
        let source = protocol::decode_code(blob)?;
        let resolved = self.resolve_text(&source).await?;
        Ok(protocol::encode_code(&resolved))
    }

    async fn fetch(&self, key: &str) -> Result<String, SecretError> {
        debug!(key, "fetching secret");
        let response = self
            .client
            .get(format!("{}/get/{key}", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SecretError::FetchFailed { key: key.to_string(), status: status.as_u16() });
        }

        let body: SecretValue = response
            .json()
            .await
            .map_err(|_| SecretError::EmptyValue(key.to_string()))?;
        match body.value {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(SecretError::EmptyValue(key.to_string())),
        }
    }
}

//! Registry configuration, loaded from environment variables.

use std::collections::HashMap;

use thiserror::Error;
use url::Url;

use tagmint_id::{
    CodecError, ExternalIdScheme, TagCodec, DEFAULT_ALPHABET, DEFAULT_MIN_LENGTH,
};

use crate::db::DbConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// TAGMINT_DEVICEHUBS is not a JSON object of token to URL.
    #[error("TAGMINT_DEVICEHUBS is not valid JSON: {0}")]
    InvalidDevicehubs(#[from] serde_json::Error),

    /// A devicehub or link target URL failed validation.
    #[error("invalid devicehub URL {value:?}: {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Codec settings shared by the service and the CLI.
///
/// Both sides must hold the same salt and provider id or labels printed by
/// one will not resolve on the other.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Keying salt for the id codec. Secret in the sense that anyone holding
    /// it can mint valid-looking labels.
    pub hash_salt: String,

    /// This registry's provider namespace, e.g. `FO`.
    pub provider_id: String,
}

impl CodecConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            hash_salt: require("TAGMINT_HASH_SALT")?,
            provider_id: require("TAGMINT_PROVIDER_ID")?,
        })
    }

    /// Builds the external id scheme these settings describe.
    pub fn build_scheme(&self) -> Result<ExternalIdScheme, CodecError> {
        let codec = TagCodec::new(&self.hash_salt, DEFAULT_MIN_LENGTH, DEFAULT_ALPHABET)?;
        ExternalIdScheme::new(codec, &self.provider_id)
    }
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen_addr: String,

    /// Log level filter, e.g. `info` or `tagmint_registry=debug`.
    pub log_level: String,

    /// Development mode: runs migrations on startup.
    pub dev_mode: bool,

    pub codec: CodecConfig,

    /// Bearer token to devicehub base URL. Tokens authorize tag creation;
    /// minted tags are pre-linked to the token's devicehub.
    pub devicehubs: HashMap<String, String>,

    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr = std::env::var("TAGMINT_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let log_level =
            std::env::var("TAGMINT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("TAGMINT_DEV")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let raw = require("TAGMINT_DEVICEHUBS")?;
        let parsed: HashMap<String, String> = serde_json::from_str(&raw)?;
        let mut devicehubs = HashMap::with_capacity(parsed.len());
        for (token, url) in parsed {
            devicehubs.insert(token, validate_link_target(&url)?);
        }

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            codec: CodecConfig::from_env()?,
            devicehubs,
            database: DbConfig::from_env(),
        })
    }
}

/// Validates a link target and returns it in canonical form.
///
/// Must be an absolute http(s) URL; trailing slashes are stripped so the
/// redirect path can be appended without doubling separators.
pub fn validate_link_target(value: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(value).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }

    Ok(value.trim_end_matches('/').to_string())
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_target_accepts_absolute_http_urls() {
        assert_eq!(
            validate_link_target("https://dh.example").unwrap(),
            "https://dh.example"
        );
        assert_eq!(
            validate_link_target("http://dh.example:8080/path").unwrap(),
            "http://dh.example:8080/path"
        );
    }

    #[test]
    fn link_target_strips_trailing_slashes() {
        assert_eq!(
            validate_link_target("https://dh.example/").unwrap(),
            "https://dh.example"
        );
    }

    #[test]
    fn link_target_rejects_non_http_and_relative_urls() {
        assert!(validate_link_target("ftp://dh.example").is_err());
        assert!(validate_link_target("dh.example/tags").is_err());
        assert!(validate_link_target("").is_err());
    }

    #[test]
    fn codec_config_builds_a_scheme() {
        let config = CodecConfig {
            hash_salt: "So salty".to_string(),
            provider_id: "FO".to_string(),
        };
        let scheme = config.build_scheme().unwrap();
        assert_eq!(scheme.provider_id(), "FO");
    }
}

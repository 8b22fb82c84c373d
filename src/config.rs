//! Client configuration: API host and cloud project credentials.

use crate::error::{Result, TuyaError};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

pub const ENV_HOST: &str = "TUYA_HOST";
pub const ENV_CLIENT_ID: &str = "TUYA_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "TUYA_CLIENT_SECRET";

/// Connection settings for a Tuya cloud project.
///
/// `host` is the regional OpenAPI base URL (e.g. `https://openapi.tuyaeu.com`),
/// `access_key` the project's client id and `secret_key` its client secret.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub access_key: String,
    pub secret_key: SecretString,
}

impl Config {
    pub fn new<H, A, S>(host: H, access_key: A, secret_key: S) -> Self
    where
        H: Into<String>,
        A: Into<String>,
        S: Into<String>,
    {
        Self {
            host: host.into(),
            access_key: access_key.into(),
            secret_key: SecretString::from(secret_key.into()),
        }
    }

    /// Reads `TUYA_HOST`, `TUYA_CLIENT_ID` and `TUYA_CLIENT_SECRET`.
    ///
    /// Unset variables are left empty; [`validate`](Self::validate) reports them.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self::new(var(ENV_HOST), var(ENV_CLIENT_ID), var(ENV_CLIENT_SECRET))
    }

    /// Fills every empty field from the environment.
    pub fn or_env(self) -> Self {
        let env = Self::from_env();
        Self {
            host: if self.host.is_empty() { env.host } else { self.host },
            access_key: if self.access_key.is_empty() {
                env.access_key
            } else {
                self.access_key
            },
            secret_key: if self.secret_key.expose_secret().is_empty() {
                env.secret_key
            } else {
                self.secret_key
            },
        }
    }

    /// Checks that every field is set and the host is an absolute URL.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.host.is_empty() {
            missing.push(format!("host ({})", ENV_HOST));
        }
        if self.access_key.is_empty() {
            missing.push(format!("access key ({})", ENV_CLIENT_ID));
        }
        if self.secret_key.expose_secret().is_empty() {
            missing.push(format!("secret key ({})", ENV_CLIENT_SECRET));
        }
        if !missing.is_empty() {
            return Err(TuyaError::Configuration(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        let url = Url::parse(&self.host)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TuyaError::Configuration(format!(
                "host must be an http(s) URL, got {}",
                self.host
            )));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready to prefix absolute API paths.
    pub(crate) fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub(crate) fn secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_config_is_valid() {
        let config = Config::new("https://openapi.tuyaeu.com/", "key", "secret");
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "https://openapi.tuyaeu.com");
    }

    #[test]
    fn missing_fields_are_named() {
        let err = Config::new("", "key", "").validate().unwrap_err();
        match err {
            TuyaError::Configuration(msg) => {
                assert!(msg.contains("host"));
                assert!(msg.contains("secret key"));
                assert!(!msg.contains("access key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_host_is_rejected() {
        let err = Config::new("openapi.tuyaeu.com", "key", "secret")
            .validate()
            .unwrap_err();
        assert!(matches!(err, TuyaError::Configuration(_)));

        let err = Config::new("ftp://openapi.tuyaeu.com", "key", "secret")
            .validate()
            .unwrap_err();
        assert!(matches!(err, TuyaError::Configuration(_)));
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = Config::new("https://openapi.tuyaeu.com", "key", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}

//! Signed Tuya cloud client.
//! Owns the configuration, the lazily fetched access token and the transport.

use crate::config::Config;
use crate::error::{Result, TuyaError};
use crate::protocol::{
    ApiResponse, EMPTY_BODY, SignedHeaders, TOKEN_PATH, TokenGrant, sign_request, token_headers,
};
use crate::transport::{HttpRequest, HttpTransport, Transport};
use log::{debug, info};
use parking_lot::RwLock;
use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Client for the Tuya cloud OpenAPI.
///
/// The access token is fetched on the first signed call and reused for the
/// lifetime of the client. Concurrent first calls may each fetch a token; the
/// last one stored wins.
pub struct TuyaClient<T = HttpTransport> {
    config: Config,
    token: RwLock<Option<String>>,
    transport: T,
}

impl TuyaClient<HttpTransport> {
    /// Validates `config` and binds an HTTP transport to its host.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.base_url())?;
        Ok(Self::from_parts(config, transport))
    }
}

impl<T: Transport> TuyaClient<T> {
    /// Validates `config` and uses a custom transport.
    ///
    /// Validation happens before the transport is touched.
    pub fn with_transport(config: Config, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, transport))
    }

    fn from_parts(config: Config, transport: T) -> Self {
        Self {
            config,
            token: RwLock::new(None),
            transport,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Currently cached access token, if one has been fetched.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Performs the signed token handshake and caches the returned token.
    pub async fn fetch_token(&self) -> Result<String> {
        let timestamp = timestamp_millis();
        let request = HttpRequest {
            method: Method::GET,
            path: TOKEN_PATH.to_string(),
            headers: token_headers(&self.config, &timestamp)?,
            body: None,
        };

        debug!("Requesting access token for client {}", self.config.access_key);
        let login = match self.transport.send(request).await? {
            Some(value) => serde_json::from_value::<ApiResponse>(value)?,
            None => {
                return Err(TuyaError::Authentication(
                    "empty response from token endpoint".to_string(),
                ));
            }
        };
        if !login.success {
            return Err(TuyaError::Authentication(login.message()));
        }

        let grant: TokenGrant = serde_json::from_value(login.result)?;
        info!("Access token obtained for client {}", self.config.access_key);
        *self.token.write() = Some(grant.access_token.clone());
        Ok(grant.access_token)
    }

    /// Signs a call with the cached token and the current time.
    ///
    /// Signs with an empty token when none has been fetched yet.
    pub fn build_signed_headers(
        &self,
        path: &str,
        method: &Method,
        query: &BTreeMap<String, String>,
        body: &str,
    ) -> Result<SignedHeaders> {
        let token = self.token().unwrap_or_default();
        sign_request(
            &self.config,
            &token,
            &timestamp_millis(),
            path,
            method.as_str(),
            query,
            body,
        )
    }

    /// Issues a signed call, fetching the token first if needed.
    ///
    /// `body` defaults to `{}`. Fails with [`TuyaError::Request`] if the
    /// server reports `success: false` or the transport fails.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        if self.token().is_none() {
            self.fetch_token().await?;
        }

        let body = match body {
            Some(body) => serde_json::to_string(body)?,
            None => EMPTY_BODY.to_string(),
        };
        let signed = self.build_signed_headers(path, &method, &BTreeMap::new(), &body)?;
        debug!("request: {} {} body={}", method, signed.path, body);

        let request = HttpRequest {
            method,
            headers: signed.to_headers(),
            path: signed.path,
            body: Some(body),
        };
        let data = match self.transport.send(request).await? {
            Some(value) => serde_json::from_value::<ApiResponse>(value)?,
            None => return Err(TuyaError::Request("empty response".to_string())),
        };
        if !data.success {
            return Err(TuyaError::Request(data.message()));
        }
        Ok(data)
    }
}

/// Milliseconds since the Unix epoch as a decimal string.
fn timestamp_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_milliseconds() {
        let t = timestamp_millis();
        assert_eq!(t.len(), 13);
        assert!(t.chars().all(|c| c.is_ascii_digit()));
    }
}

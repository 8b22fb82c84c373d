//! Error types and result definitions for the tuya-cloud crate.
//! Includes Tuya cloud error codes and conversion from HTTP/JSON errors.

use thiserror::Error;

/// Represents all possible errors that can occur when talking to the Tuya cloud.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TuyaError {
    /// Host or credentials missing or malformed; raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The token handshake was rejected or returned nothing
    #[error("Authorization Failed: {0}")]
    Authentication(String),

    /// A signed call reported failure, or the transport failed (network, timeout, HTTP status)
    #[error("Request Failed: {0}")]
    Request(String),

    /// The response payload could not be decoded
    #[error("JSON error: {0}")]
    Json(String),
}

/// A specialized Result type for Tuya cloud operations.
pub type Result<T> = std::result::Result<T, TuyaError>;

impl From<reqwest::Error> for TuyaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TuyaError::Request(format!("timeout waiting for response: {}", err))
        } else {
            TuyaError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TuyaError {
    fn from(err: serde_json::Error) -> Self {
        TuyaError::Json(err.to_string())
    }
}

impl From<url::ParseError> for TuyaError {
    fn from(err: url::ParseError) -> Self {
        TuyaError::Configuration(format!("invalid host: {}", err))
    }
}

impl TuyaError {
    pub fn code(&self) -> u32 {
        match self {
            TuyaError::Configuration(_) => ERR_CLOUDKEY,
            TuyaError::Authentication(_) => ERR_CLOUDTOKEN,
            TuyaError::Request(_) => ERR_CLOUD,
            TuyaError::Json(_) => ERR_CLOUDRESP,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            ERR_CLOUDKEY => TuyaError::Configuration(get_error_message(code).to_string()),
            ERR_CLOUDTOKEN => TuyaError::Authentication(get_error_message(code).to_string()),
            ERR_CLOUDRESP | ERR_JSON => TuyaError::Json(get_error_message(code).to_string()),
            _ => TuyaError::Request(get_error_message(code).to_string()),
        }
    }
}

// TinyTuya Error Response Codes (cloud subset)
define_error_codes! {
    ERR_SUCCESS = 0 => "Connection Successful",
    ERR_JSON = 900 => "Invalid JSON Response from Device",
    ERR_CONNECT = 901 => "Network Error: Unable to Connect",
    ERR_TIMEOUT = 902 => "Timeout Waiting for Device",
    ERR_CLOUDKEY = 909 => "Missing Tuya Cloud Key and Secret",
    ERR_CLOUDRESP = 910 => "Invalid JSON Response from Cloud",
    ERR_CLOUDTOKEN = 911 => "Unable to Get Cloud Token",
    ERR_PARAMS = 912 => "Missing Function Parameters",
    ERR_CLOUD = 913 => "Error Response from Tuya Cloud",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        assert_eq!(TuyaError::Configuration("x".into()).code(), 909);
        assert_eq!(TuyaError::Authentication("x".into()).code(), 911);
        assert_eq!(TuyaError::Request("x".into()).code(), 913);
        assert_eq!(TuyaError::Json("x".into()).code(), 910);
    }

    #[test]
    fn from_code_round_trips_variant() {
        for err in [
            TuyaError::Configuration(String::new()),
            TuyaError::Authentication(String::new()),
            TuyaError::Request(String::new()),
            TuyaError::Json(String::new()),
        ] {
            assert_eq!(TuyaError::from_code(err.code()).code(), err.code());
        }
        assert_eq!(get_error_message(12345), "Unknown Error");
    }

    #[test]
    fn display_carries_server_message() {
        let err = TuyaError::Request("permission deny".into());
        assert_eq!(err.to_string(), "Request Failed: permission deny");
    }
}

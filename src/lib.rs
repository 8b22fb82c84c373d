//! # tuya-cloud
//!
//! Minimal asynchronous client for the Tuya Cloud OpenAPI: signed token
//! handshake, HMAC-SHA256 request signing and a few device control helpers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tuya_cloud::{Config, TuyaClient};
//!
//! # async fn run() -> tuya_cloud::Result<()> {
//! let client = TuyaClient::new(Config::new(
//!     "https://openapi.tuyaeu.com",
//!     "ACCESS_KEY",
//!     "SECRET_KEY",
//! ))?;
//! client.switch_on("DEVICE_ID", None).await?;
//! let on = client.get_device_status_switch("DEVICE_ID", None).await?;
//! # let _ = on;
//! # Ok(())
//! # }
//! ```
//!
#[macro_use]
mod macros;
pub mod client;
pub mod config;
pub mod crypto;
pub mod device;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::TuyaClient;
pub use config::Config;
pub use device::{Command, CommandOutcome, CommandRequest, PowerUsage, StatusEntry};
pub use error::{Result, TuyaError};
pub use protocol::{ApiResponse, SignedHeaders, TokenGrant};
pub use transport::{HttpRequest, HttpTransport, Transport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

// TuyaClient is shared across tasks; keep it Send + Sync.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<TuyaClient>;
    let _ = assert_send_sync::<TuyaError>;
};

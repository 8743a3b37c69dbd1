//! # cfr-gateway
//! Network implementations of the fundraiser collaborator traits.
//!
//! - [`esplora::EsploraGateway`]: Bitcoin UTXOs, fee estimates, payment
//!   watching and broadcast over an Esplora HTTP API
//! - [`ethereum::EthRpcClient`]: ATOM/ETH rate from the fundraiser contract
//! - [`status::HttpStatusSource`]: campaign status document

pub mod esplora;
pub mod ethereum;
pub mod status;

#[cfg(test)]
mod testing;

pub use esplora::EsploraGateway;
pub use ethereum::EthRpcClient;
pub use status::HttpStatusSource;

use std::time::Duration;

use cfr_core::error::GatewayError;

/// Per-request timeout for every gateway call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| GatewayError::Http(format!("build HTTP client: {e}")))
}

pub(crate) fn http_error(e: reqwest::Error) -> GatewayError {
    GatewayError::Http(e.to_string())
}

/// Turn a non-success response into [`GatewayError::Status`].
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

//! Campaign status over HTTP.

use async_trait::async_trait;
use cfr_core::error::GatewayError;
use cfr_core::traits::StatusSource;
use cfr_core::types::FundraiserStatus;
use reqwest::Client;

use crate::{check_status, http_client, http_error};

/// Status document served by the fundraiser site.
pub const DEFAULT_STATUS_URL: &str = "https://fundraiser.cosmos.network/status.json";

pub struct HttpStatusSource {
    client: Client,
    url: String,
}

impl HttpStatusSource {
    pub fn new(url: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client()?,
            url: url.to_owned(),
        })
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self) -> Result<FundraiserStatus, GatewayError> {
        let resp = self.client.get(&self.url).send().await.map_err(http_error)?;
        check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("status document: {e}")))
    }
}

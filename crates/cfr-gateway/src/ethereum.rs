//! Ethereum JSON-RPC client for the fundraiser contract.

use async_trait::async_trait;
use cfr_core::error::GatewayError;
use cfr_core::traits::EthereumGateway;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{check_status, http_client, http_error};

/// Public Ethereum mainnet endpoint.
pub const DEFAULT_RPC_URL: &str = "https://cloudflare-eth.com";

/// Calldata for `weiPerAtom()`: keccak256("weiPerAtom()")[0..4].
pub const WEI_PER_ATOM_CALL: &str = "0x574a5e31";

const WEI_PER_ETH: f64 = 1e18;

pub struct EthRpcClient {
    client: Client,
    endpoint: String,
}

impl EthRpcClient {
    pub fn new(endpoint: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client()?,
            endpoint: endpoint.to_owned(),
        })
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, GatewayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(http_error)?;
        let resp: Value = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        if let Some(err) = resp.get("error") {
            if !err.is_null() {
                return Err(GatewayError::Rpc(err.to_string()));
            }
        }
        serde_json::from_value(resp["result"].clone())
            .map_err(|e| GatewayError::Decode(format!("{method} result: {e}")))
    }

    /// `eth_call` against the latest block.
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String, GatewayError> {
        self.call("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }
}

#[async_trait]
impl EthereumGateway for EthRpcClient {
    async fn fetch_atom_rate(&self, contract: &str) -> Result<f64, GatewayError> {
        let result = self.eth_call(contract, WEI_PER_ATOM_CALL).await?;
        let rate = atom_rate_from_word(&result)?;
        tracing::debug!(contract, rate, "fetched ATOM/ETH rate");
        Ok(rate)
    }
}

/// ATOM per ETH from the ABI-encoded `uint256` returned by `weiPerAtom()`.
pub fn atom_rate_from_word(word: &str) -> Result<f64, GatewayError> {
    let digits = word.trim().trim_start_matches("0x");
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Err(GatewayError::Decode("weiPerAtom is zero".into()));
    }
    let wei_per_atom = u128::from_str_radix(significant, 16)
        .map_err(|e| GatewayError::Decode(format!("weiPerAtom {word}: {e}")))?;
    Ok(WEI_PER_ETH / wei_per_atom as f64)
}

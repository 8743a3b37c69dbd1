//! Bitcoin gateway over the Esplora HTTP API.
//!
//! Endpoints used:
//! - `GET  /address/{address}/utxo`
//! - `GET  /fee-estimates`
//! - `POST /tx` (hex body, txid response)

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use cfr_core::error::GatewayError;
use cfr_core::traits::BitcoinGateway;
use cfr_core::types::{PaymentEvent, Utxo};
use reqwest::Client;
use serde::Deserialize;

use crate::{check_status, http_client, http_error};

/// Mainnet Esplora instance.
pub const DEFAULT_MAINNET_URL: &str = "https://blockstream.info/api";

/// Testnet Esplora instance.
pub const DEFAULT_TESTNET_URL: &str = "https://blockstream.info/testnet/api";

/// Confirmation target used when none is configured.
pub const DEFAULT_FEE_TARGET_BLOCKS: u32 = 6;

/// Delay between payment polls when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
}

impl From<EsploraUtxo> for Utxo {
    fn from(u: EsploraUtxo) -> Self {
        Utxo {
            txid: u.txid,
            vout: u.vout,
            value: u.value,
            script: None,
        }
    }
}

/// Esplora-backed [`BitcoinGateway`].
pub struct EsploraGateway {
    client: Client,
    base_url: String,
    fee_target_blocks: u32,
    poll_interval: Duration,
}

impl EsploraGateway {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            fee_target_blocks: DEFAULT_FEE_TARGET_BLOCKS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Confirmation target, in blocks, for [`fetch_fee_rate`](BitcoinGateway::fetch_fee_rate).
    pub fn with_fee_target(mut self, blocks: u32) -> Self {
        self.fee_target_blocks = blocks;
        self
    }

    /// Delay between polls in [`wait_for_payment`](BitcoinGateway::wait_for_payment).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl BitcoinGateway for EsploraGateway {
    async fn fetch_utxos(&self, address: &str) -> Result<Vec<Utxo>, GatewayError> {
        let resp = self
            .client
            .get(self.url(&format!("/address/{address}/utxo")))
            .send()
            .await
            .map_err(http_error)?;
        let utxos: Vec<EsploraUtxo> = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("utxo list: {e}")))?;
        tracing::debug!(address, count = utxos.len(), "fetched utxos");
        Ok(utxos.into_iter().map(Utxo::from).collect())
    }

    async fn fetch_fee_rate(&self) -> Result<u64, GatewayError> {
        let resp = self
            .client
            .get(self.url("/fee-estimates"))
            .send()
            .await
            .map_err(http_error)?;
        let raw: BTreeMap<String, f64> = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("fee estimates: {e}")))?;
        let estimates: BTreeMap<u32, f64> = raw
            .into_iter()
            .filter_map(|(k, v)| k.parse().ok().map(|k| (k, v)))
            .collect();
        let rate = select_fee_rate(&estimates, self.fee_target_blocks)
            .ok_or_else(|| GatewayError::Decode("no fee estimates returned".into()))?;
        tracing::debug!(target_blocks = self.fee_target_blocks, rate, "fetched fee rate");
        Ok(rate)
    }

    async fn wait_for_payment(&self, address: &str) -> Result<PaymentEvent, GatewayError> {
        poll_until_funded(address, self.poll_interval, || self.fetch_utxos(address)).await
    }

    async fn push_tx(&self, tx_hex: &str) -> Result<String, GatewayError> {
        let resp = self
            .client
            .post(self.url("/tx"))
            .body(tx_hex.to_owned())
            .send()
            .await
            .map_err(http_error)?;
        let txid = check_status(resp)
            .await?
            .text()
            .await
            .map_err(|e| GatewayError::Decode(format!("broadcast response: {e}")))?;
        let txid = txid.trim().to_string();
        tracing::info!(%txid, "transaction broadcast");
        Ok(txid)
    }
}

/// Fee rate in whole sat/byte for a confirmation target.
///
/// Uses the estimate for exactly `target` blocks, else the nearest slower
/// target, else the slowest one available. Rounded up, never below 1.
pub fn select_fee_rate(estimates: &BTreeMap<u32, f64>, target: u32) -> Option<u64> {
    let rate = estimates
        .range(target..)
        .next()
        .or_else(|| estimates.iter().next_back())
        .map(|(_, &rate)| rate)?;
    if !rate.is_finite() {
        return None;
    }
    Some((rate.ceil() as u64).max(1))
}

/// Poll `fetch` every `interval` until the address holds any value.
///
/// There is no timeout: the caller cancels by dropping the future.
pub async fn poll_until_funded<F, Fut>(
    address: &str,
    interval: Duration,
    mut fetch: F,
) -> Result<PaymentEvent, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<Utxo>, GatewayError>>,
{
    let mut polls: u64 = 0;
    loop {
        let utxos = fetch().await?;
        polls += 1;
        let event = PaymentEvent::from_utxos(address, utxos);
        if event.amount > 0 {
            tracing::info!(address, amount = event.amount, polls, "payment received");
            return Ok(event);
        }
        tracing::debug!(address, polls, "no payment yet");
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::testing::serve;

    fn estimates(pairs: &[(u32, f64)]) -> BTreeMap<u32, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn fee_rate_exact_target() {
        let e = estimates(&[(1, 87.9), (6, 68.2), (144, 1.02)]);
        assert_eq!(select_fee_rate(&e, 6), Some(69));
    }

    #[test]
    fn fee_rate_next_slower_target() {
        let e = estimates(&[(1, 87.9), (10, 30.0), (144, 1.0)]);
        assert_eq!(select_fee_rate(&e, 6), Some(30));
    }

    #[test]
    fn fee_rate_falls_back_to_slowest() {
        let e = estimates(&[(1, 20.5), (2, 10.0)]);
        assert_eq!(select_fee_rate(&e, 6), Some(10));
    }

    #[test]
    fn fee_rate_minimum_one() {
        let e = estimates(&[(6, 0.2)]);
        assert_eq!(select_fee_rate(&e, 6), Some(1));
        assert_eq!(select_fee_rate(&BTreeMap::new(), 6), None);
    }

    #[tokio::test]
    async fn poll_returns_once_funded() {
        let calls = AtomicUsize::new(0);
        let event = poll_until_funded("1Addr", Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Ok(vec![])
                } else {
                    Ok(vec![Utxo { txid: "aa".repeat(32), vout: 0, value: 5_000, script: None }])
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(event.amount, 5_000);
        assert_eq!(event.address, "1Addr");
    }

    #[tokio::test]
    async fn poll_propagates_errors() {
        let err = poll_until_funded("1Addr", Duration::from_millis(1), || async {
            Err(GatewayError::Http("connection refused".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err, GatewayError::Http("connection refused".into()));
    }

    #[tokio::test]
    async fn fetch_utxos_parses_esplora_json() {
        let body = r#"[{"txid":"e9a66845e05d5abc0ad04ec80f774a7e585c6e8db975962d069a522137b80c1d","vout":1,"status":{"confirmed":true,"block_height":700000},"value":100000}]"#;
        let server = serve(vec![(200, body.into())]).await;
        let gw = EsploraGateway::new(&server.url).unwrap();

        let utxos = gw.fetch_utxos("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA").await.unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].vout, 1);
        assert_eq!(utxos[0].value, 100_000);

        let requests = server.requests();
        assert_eq!(requests[0].method, axum::http::Method::GET);
        assert_eq!(requests[0].target, "/address/1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA/utxo");
    }

    #[tokio::test]
    async fn fetch_fee_rate_uses_target() {
        let server = serve(vec![(200, r#"{"1":50.1,"3":20.7,"6":12.3}"#.into())]).await;
        let gw = EsploraGateway::new(&server.url).unwrap().with_fee_target(3);
        assert_eq!(gw.fetch_fee_rate().await.unwrap(), 21);
    }

    #[tokio::test]
    async fn push_tx_posts_hex_and_returns_txid() {
        let server = serve(vec![(200, "abcd1234\n".into())]).await;
        let gw = EsploraGateway::new(&format!("{}/", server.url)).unwrap();
        assert_eq!(gw.push_tx("0100").await.unwrap(), "abcd1234");

        let requests = server.requests();
        assert_eq!(requests[0].method, axum::http::Method::POST);
        assert_eq!(requests[0].target, "/tx");
        assert_eq!(requests[0].body, "0100");
    }

    #[tokio::test]
    async fn push_tx_rejection_is_status_error() {
        let server = serve(vec![(400, "bad-txns-inputs-missingorspent".into())]).await;
        let gw = EsploraGateway::new(&server.url).unwrap();
        let err = gw.push_tx("0100").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Status { status: 400, body: "bad-txns-inputs-missingorspent".into() }
        );
    }

    #[tokio::test]
    async fn wait_for_payment_polls_gateway() {
        let funded = r#"[{"txid":"4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b","vout":0,"value":250000}]"#;
        let server = serve(vec![(200, "[]".into()), (200, funded.into())]).await;
        let gw = EsploraGateway::new(&server.url)
            .unwrap()
            .with_poll_interval(Duration::from_millis(5));
        let event = gw.wait_for_payment("1Addr").await.unwrap();
        assert_eq!(event.amount, 250_000);
    }
}

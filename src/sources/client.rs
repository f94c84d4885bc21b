//! Read Gateway Client
//!
//! A JSON client for the read gateway that fronts the pool contracts, the
//! price oracle and the governance token.

use crate::amount::NativeAmount;
use crate::consts::portal_consts::network;
use crate::pool::{Pool, PoolApy};
use crate::sources::error::SourceError;
use crate::sources::{
    ApySource, GovernanceSource, NewsSource, PoolBalanceSource, PriceOracle, TvlSource,
};
use alloy_primitives::Address;
use reqwest::{Client, ClientBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

// User-Agent string with portal version
const USER_AGENT: &str = concat!("pool-portal/", env!("CARGO_PKG_VERSION"));

/// Body of every amount endpoint.
#[derive(Debug, Deserialize)]
struct AmountResponse {
    amount: String,
}

impl AmountResponse {
    fn into_native(self) -> Result<NativeAmount, SourceError> {
        Ok(self.amount.parse::<NativeAmount>()?)
    }
}

/// Body of the pool yield endpoint. Rates are decimal percent strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApyResponse {
    pool_apy: String,
    rgt_apr: String,
}

impl ApyResponse {
    fn into_apy(self) -> Result<PoolApy, SourceError> {
        Ok(PoolApy {
            pool_apy: self.pool_apy.trim().parse()?,
            rgt_apr: self.rgt_apr.trim().parse()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = ClientBuilder::new()
            .connect_timeout(network::request_timeout())
            .timeout(network::request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn handle_response_status(response: Response) -> Result<Response, SourceError> {
        if !response.status().is_success() {
            return Err(SourceError::from_response(response).await);
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, SourceError> {
        let url = self.build_url(endpoint);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = Self::handle_response_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_amount(&self, endpoint: &str) -> Result<NativeAmount, SourceError> {
        let body: AmountResponse = self.get_json(endpoint).await?;
        body.into_native()
    }
}

#[async_trait::async_trait]
impl PriceOracle for GatewayClient {
    async fn eth_usd_rate(&self) -> Result<NativeAmount, SourceError> {
        self.get_amount("v1/prices/eth-usd").await
    }
}

#[async_trait::async_trait]
impl PoolBalanceSource for GatewayClient {
    async fn balance_of(&self, pool: Pool, address: Address) -> Result<NativeAmount, SourceError> {
        self.get_amount(&format!("v1/pools/{}/balances/{}", pool, address))
            .await
    }

    async fn interest_accrued_by(
        &self,
        pool: Pool,
        address: Address,
    ) -> Result<NativeAmount, SourceError> {
        self.get_amount(&format!("v1/pools/{}/interest/{}", pool, address))
            .await
    }
}

#[async_trait::async_trait]
impl GovernanceSource for GatewayClient {
    async fn rgt_exchange_rate(&self) -> Result<NativeAmount, SourceError> {
        self.get_amount("v1/governance/rgt/exchange-rate").await
    }

    async fn rgt_balance_of(&self, address: Address) -> Result<NativeAmount, SourceError> {
        self.get_amount(&format!("v1/governance/rgt/balances/{}", address))
            .await
    }
}

#[async_trait::async_trait]
impl TvlSource for GatewayClient {
    async fn total_value_locked(&self) -> Result<NativeAmount, SourceError> {
        self.get_amount("v1/tvl").await
    }
}

#[async_trait::async_trait]
impl ApySource for GatewayClient {
    async fn pool_apy(&self, pool: Pool) -> Result<PoolApy, SourceError> {
        let body: ApyResponse = self.get_json(&format!("v1/pools/{}/apy", pool)).await?;
        body.into_apy()
    }
}

#[async_trait::async_trait]
impl NewsSource for GatewayClient {
    async fn fetch_news_items(&self) -> Result<Vec<String>, SourceError> {
        self.get_json("api/news").await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_joins_without_double_slashes() {
        let client = GatewayClient::new("http://localhost:8545/").unwrap();
        assert_eq!(
            client.build_url("/v1/prices/eth-usd"),
            "http://localhost:8545/v1/prices/eth-usd"
        );
    }

    #[test]
    fn amount_body_decodes_to_native_amount() {
        let body: AmountResponse =
            serde_json::from_str(r#"{"amount":"1800000000000000000000"}"#).unwrap();
        assert_eq!(body.into_native().unwrap(), NativeAmount::from_units(1_800));
    }

    #[test]
    /// A negative amount on the wire is a contract violation, not a zero.
    fn negative_amount_body_is_rejected() {
        let body: AmountResponse = serde_json::from_str(r#"{"amount":"-1"}"#).unwrap();
        assert!(matches!(body.into_native(), Err(SourceError::Amount(_))));
    }

    #[test]
    fn apy_body_decodes_percent_strings() {
        let body: ApyResponse =
            serde_json::from_str(r#"{"poolApy":"12.5","rgtApr":"3.25"}"#).unwrap();
        let apy = body.into_apy().unwrap();
        assert_eq!(apy.pool_apy, rust_decimal::Decimal::new(125, 1));
        assert_eq!(apy.rgt_apr, rust_decimal::Decimal::new(325, 2));
    }

    #[test]
    fn malformed_apy_body_is_rejected() {
        let body: ApyResponse =
            serde_json::from_str(r#"{"poolApy":"n/a","rgtApr":"1"}"#).unwrap();
        assert!(matches!(body.into_apy(), Err(SourceError::Rate(_))));
    }

    #[tokio::test]
    /// Nothing listens on port 9; the read must surface as a source error.
    async fn unreachable_gateway_is_a_source_error() {
        let client = GatewayClient::new("http://127.0.0.1:9").unwrap();
        let result = client.eth_usd_rate().await;
        assert!(matches!(result, Err(SourceError::Reqwest(_))));
    }
}

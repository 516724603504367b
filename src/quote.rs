//! 聚合器报价
//!
//! 单次 HTTP GET，不缓存、不重试

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::types::{Quote, QuoteRequest};

/// 报价来源
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote>;
}

/// Jupiter v6 报价客户端
pub struct JupiterQuoteClient {
    client: Client,
    api_url: String,
}

impl JupiterQuoteClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl QuoteSource for JupiterQuoteClient {
    async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote> {
        debug!(
            "📡 GET {} inputMint={} outputMint={} amount={}",
            self.api_url, request.input_mint, request.output_mint, request.amount
        );

        let response = self
            .client
            .get(&self.api_url)
            .query(request)
            .send()
            .await
            .context("Quote request failed")?
            .error_for_status()
            .context("Quote API returned an error status")?;

        let quote = response
            .json::<Quote>()
            .await
            .context("Failed to parse quote response")?;

        Ok(quote)
    }
}

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::monitor::QuoteProvider;

const LISTINGS_URL: &str = "https://pro-api.coinmarketcap.com/v1/cryptocurrency/listings/latest";
const QUOTES_URL: &str = "https://pro-api.coinmarketcap.com/v1/cryptocurrency/quotes/latest";

#[derive(Clone)]
pub struct CmcClient {
    http: Client,
    api_key: String,
    top_limit: u32,
}

impl CmcClient {
    pub fn new(api_key: String, top_limit: u32) -> Self {
        Self {
            http: Client::new(),
            api_key,
            top_limit,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Top tokens by market cap, as symbol => display name.
    pub async fn list_top_tokens(&self) -> Result<BTreeMap<String, String>, String> {
        if !self.has_key() {
            return Err("COINMARKETCAP_API_KEY is missing in .env".to_string());
        }

        let limit = self.top_limit.to_string();
        let res = self
            .http
            .get(LISTINGS_URL)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header("Accepts", "application/json")
            .query(&[("start", "1"), ("limit", limit.as_str()), ("convert", "USD")])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("CMC listings failed: {status} {body}"));
        }

        let listings = res
            .json::<ListingsResponse>()
            .await
            .map_err(|e| e.to_string())?;

        Ok(listings
            .data
            .into_iter()
            .map(|t| (t.symbol, t.name))
            .collect())
    }

    /// Current USD price for one symbol.
    pub async fn quote_usd(&self, symbol: &str) -> Result<f64, String> {
        if !self.has_key() {
            return Err("COINMARKETCAP_API_KEY is missing in .env".to_string());
        }

        let res = self
            .http
            .get(QUOTES_URL)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header("Accepts", "application/json")
            .query(&[("symbol", symbol), ("convert", "USD")])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("CMC quote failed: {status} {body}"));
        }

        let quotes = res
            .json::<QuotesResponse>()
            .await
            .map_err(|e| e.to_string())?;

        // Expected shape: data.<SYMBOL>.quote.USD.price
        quotes
            .data
            .get(symbol)
            .and_then(|token| token.quote.get("USD"))
            .map(|usd| usd.price)
            .ok_or_else(|| format!("unexpected CMC quote payload for {symbol}"))
    }
}

#[async_trait]
impl QuoteProvider for CmcClient {
    async fn price_usd(&self, symbol: &str) -> Result<f64, String> {
        self.quote_usd(symbol).await
    }
}

#[derive(Debug, Deserialize)]
struct ListingsResponse {
    data: Vec<ListedToken>,
}

#[derive(Debug, Deserialize)]
struct ListedToken {
    symbol: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    data: HashMap<String, TokenQuote>,
}

#[derive(Debug, Deserialize)]
struct TokenQuote {
    quote: HashMap<String, CurrencyQuote>,
}

#[derive(Debug, Deserialize)]
struct CurrencyQuote {
    price: f64,
}

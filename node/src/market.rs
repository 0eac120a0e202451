//! Market data from a DexScreener-style API.
//!
//! `GET {base}/latest/dex/tokens/{mint,mint,...}` accepts at most 30 mints,
//! so requests are chunked. For each mint one pair is chosen: the SOL-quoted
//! Solana pair with a price and 24 h volume, else any Solana pair with a
//! price, else the first pair returned.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fomo_types::{ListedToken, MintAddress};

use crate::NodeError;

pub const MAX_MINTS_PER_REQUEST: usize = 30;
pub const TRENDING_LEN: usize = 8;

const SOLANA_CHAIN: &str = "solana";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TokensResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    chain_id: String,
    #[serde(default)]
    pair_address: Option<String>,
    base_token: PairToken,
    quote_token: PairToken,
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    volume: Option<Window>,
    #[serde(default)]
    price_change: Option<Window>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
    #[serde(default)]
    fdv: Option<f64>,
    #[serde(default)]
    info: Option<PairInfo>,
}

#[derive(Clone, Debug, Deserialize)]
struct PairToken {
    address: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Window {
    #[serde(default)]
    h24: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Liquidity {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairInfo {
    #[serde(default)]
    image_url: Option<String>,
}

impl DexPair {
    fn price(&self) -> Option<f64> {
        self.price_usd.as_deref().and_then(|p| p.parse().ok())
    }

    fn volume_24h(&self) -> f64 {
        self.volume.as_ref().and_then(|w| w.h24).unwrap_or(0.0)
    }

    fn on_solana(&self) -> bool {
        self.chain_id == SOLANA_CHAIN
    }
}

/// One token's market row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MarketToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub price_usd: f64,
    pub price_change_24h: f64,
    pub volume_24h: f64,
    pub liquidity_usd: f64,
    pub pair_address: Option<String>,
    pub logo_uri: Option<String>,
    pub fdv: Option<f64>,
}

impl From<&DexPair> for MarketToken {
    fn from(p: &DexPair) -> Self {
        Self {
            address: p.base_token.address.clone(),
            name: p.base_token.name.clone(),
            symbol: p.base_token.symbol.clone(),
            price_usd: p.price().unwrap_or(0.0),
            price_change_24h: p.price_change.as_ref().and_then(|w| w.h24).unwrap_or(0.0),
            volume_24h: p.volume_24h(),
            liquidity_usd: p.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0),
            pair_address: p.pair_address.clone(),
            logo_uri: p.info.as_ref().and_then(|i| i.image_url.clone()),
            fdv: p.fdv,
        }
    }
}

/// All priced tokens (24 h volume descending) and the top gainers.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub tokens: Vec<MarketToken>,
    pub trending: Vec<MarketToken>,
}

impl MarketSnapshot {
    /// De-duplicate by address (first wins), sort by volume, pick trending.
    pub fn from_tokens(tokens: Vec<MarketToken>) -> Self {
        let mut seen = HashSet::new();
        let mut tokens: Vec<MarketToken> = tokens
            .into_iter()
            .filter(|t| seen.insert(t.address.clone()))
            .collect();
        tokens.sort_by(|a, b| b.volume_24h.total_cmp(&a.volume_24h));

        let mut trending = tokens.clone();
        trending.sort_by(|a, b| b.price_change_24h.total_cmp(&a.price_change_24h));
        trending.truncate(TRENDING_LEN);
        Self { tokens, trending }
    }

    /// Fill missing logos from the registry.
    pub fn apply_listings(&mut self, listed: &[ListedToken]) {
        let logos: HashMap<&str, &str> = listed
            .iter()
            .filter_map(|t| Some((t.mint_address.as_str(), t.logo_uri.as_deref()?)))
            .collect();
        for token in self.tokens.iter_mut().chain(self.trending.iter_mut()) {
            if token.logo_uri.is_none() {
                token.logo_uri = logos.get(token.address.as_str()).map(|s| s.to_string());
            }
        }
    }

    pub fn price_of(&self, mint: &str) -> Option<f64> {
        self.tokens
            .iter()
            .find(|t| t.address == mint)
            .map(|t| t.price_usd)
    }
}

/// Result of one refresh: the snapshot and how many chunks were skipped.
#[derive(Debug, Default)]
pub struct MarketFetch {
    pub snapshot: MarketSnapshot,
    pub failed_chunks: usize,
}

pub struct MarketFeed {
    http: reqwest::Client,
    base_url: String,
}

impl MarketFeed {
    pub fn new(base_url: impl Into<String>) -> Result<Self, NodeError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| NodeError::Market(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch every mint, chunked. A failed chunk is logged and skipped.
    pub async fn fetch(&self, mints: &[MintAddress]) -> MarketFetch {
        let mut unique = HashSet::new();
        let mints: Vec<&str> = mints
            .iter()
            .map(MintAddress::as_str)
            .filter(|m| unique.insert(*m))
            .collect();

        let mut rows = Vec::new();
        let mut failed_chunks = 0;
        for chunk in mints.chunks(MAX_MINTS_PER_REQUEST) {
            match self.fetch_chunk(chunk).await {
                Ok(pairs) => rows.extend(select_pairs(chunk, &pairs)),
                Err(e) => {
                    failed_chunks += 1;
                    warn!(mints = chunk.len(), error = %e, "market chunk failed; skipping");
                }
            }
        }
        debug!(tokens = rows.len(), failed_chunks, "market refreshed");
        MarketFetch {
            snapshot: MarketSnapshot::from_tokens(rows),
            failed_chunks,
        }
    }

    async fn fetch_chunk(&self, chunk: &[&str]) -> Result<Vec<DexPair>, NodeError> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, chunk.join(","));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| NodeError::Market(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NodeError::Market(format!("HTTP status {}", response.status())));
        }
        let body: TokensResponse = response
            .json()
            .await
            .map_err(|e| NodeError::Market(format!("invalid market response: {e}")))?;
        Ok(body.pairs.unwrap_or_default())
    }
}

fn select_pairs(chunk: &[&str], pairs: &[DexPair]) -> Vec<MarketToken> {
    let mut by_mint: HashMap<&str, Vec<&DexPair>> = HashMap::new();
    for pair in pairs {
        by_mint
            .entry(pair.base_token.address.as_str())
            .or_default()
            .push(pair);
    }
    chunk
        .iter()
        .filter_map(|mint| preferred_pair(by_mint.get(mint)?))
        .map(MarketToken::from)
        .collect()
}

fn preferred_pair<'a>(pairs: &[&'a DexPair]) -> Option<&'a DexPair> {
    pairs
        .iter()
        .find(|p| {
            p.quote_token.address == MintAddress::SOL
                && p.on_solana()
                && p.price().is_some()
                && p.volume_24h() > 0.0
        })
        .or_else(|| pairs.iter().find(|p| p.on_solana() && p.price().is_some()))
        .or_else(|| pairs.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JUP: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";
    const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn pair(base: &str, quote: &str, chain: &str, price: Option<&str>, vol: f64, change: f64) -> serde_json::Value {
        json!({
            "chainId": chain,
            "pairAddress": format!("{base}-{quote}-{chain}"),
            "baseToken": { "address": base, "name": "n", "symbol": "S" },
            "quoteToken": { "address": quote, "symbol": "Q" },
            "priceUsd": price,
            "volume": { "h24": vol },
            "priceChange": { "h24": change },
            "liquidity": { "usd": 1000.0 }
        })
    }

    fn parse(v: serde_json::Value) -> DexPair {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn prefers_sol_quoted_pair_with_volume() {
        let pairs = [
            parse(pair(JUP, USDC, "solana", Some("1.0"), 50.0, 0.0)),
            parse(pair(JUP, MintAddress::SOL, "solana", Some("1.1"), 0.0, 0.0)),
            parse(pair(JUP, MintAddress::SOL, "solana", Some("1.2"), 10.0, 0.0)),
        ];
        let refs: Vec<&DexPair> = pairs.iter().collect();
        assert_eq!(preferred_pair(&refs).unwrap().price(), Some(1.2));
    }

    #[test]
    fn falls_back_to_any_priced_solana_pair_then_first() {
        let pairs = [
            parse(pair(JUP, USDC, "ethereum", Some("9.0"), 5.0, 0.0)),
            parse(pair(JUP, USDC, "solana", Some("1.0"), 0.0, 0.0)),
        ];
        let refs: Vec<&DexPair> = pairs.iter().collect();
        assert_eq!(preferred_pair(&refs).unwrap().price(), Some(1.0));

        let only = [parse(pair(JUP, USDC, "ethereum", None, 0.0, 0.0))];
        let refs: Vec<&DexPair> = only.iter().collect();
        assert_eq!(preferred_pair(&refs).unwrap().chain_id, "ethereum");
    }

    fn token(address: &str, vol: f64, change: f64) -> MarketToken {
        MarketToken {
            address: address.into(),
            name: address.into(),
            symbol: address.into(),
            price_usd: 1.0,
            price_change_24h: change,
            volume_24h: vol,
            liquidity_usd: 0.0,
            pair_address: None,
            logo_uri: None,
            fdv: None,
        }
    }

    #[test]
    fn snapshot_dedupes_sorts_and_picks_top_gainers() {
        let mut rows: Vec<MarketToken> = (0..10)
            .map(|i| token(&format!("t{i}"), i as f64, (10 - i) as f64))
            .collect();
        rows.push(token("t3", 999.0, 999.0));
        let snap = MarketSnapshot::from_tokens(rows);
        assert_eq!(snap.tokens.len(), 10);
        assert_eq!(snap.tokens[0].address, "t9");
        assert_eq!(snap.trending.len(), TRENDING_LEN);
        assert_eq!(snap.trending[0].address, "t0");
    }

    #[tokio::test]
    async fn fetch_chunks_requests_by_thirty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pairs": [] })))
            .expect(2)
            .mount(&server)
            .await;

        let feed = MarketFeed::new(server.uri()).unwrap();
        let mints: Vec<MintAddress> = (0..31u64)
            .map(|i| fomo_nullables::test_wallet(i).as_str().parse().unwrap())
            .collect();
        let fetched = feed.fetch(&mints).await;
        assert_eq!(fetched.failed_chunks, 0);
        assert!(fetched.snapshot.tokens.is_empty());
    }

    #[tokio::test]
    async fn failed_chunk_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/latest/dex/tokens/{JUP},{BONK}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pairs": [
                    pair(JUP, MintAddress::SOL, "solana", Some("0.9"), 100.0, 5.0),
                    pair(BONK, MintAddress::SOL, "solana", Some("0.00002"), 500.0, -3.0),
                ]
            })))
            .mount(&server)
            .await;

        let feed = MarketFeed::new(server.uri()).unwrap();
        let ok = feed
            .fetch(&[JUP.parse().unwrap(), BONK.parse().unwrap()])
            .await;
        assert_eq!(ok.snapshot.tokens.len(), 2);
        assert_eq!(ok.snapshot.tokens[0].address, BONK);
        assert_eq!(ok.snapshot.price_of(JUP), Some(0.9));

        // No mock for this path: wiremock answers 404.
        let failed = feed.fetch(&[USDC.parse().unwrap()]).await;
        assert_eq!(failed.failed_chunks, 1);
        assert!(failed.snapshot.tokens.is_empty());
    }
}

//! Raw upstream JSON → canonical dashboard shapes
//!
//! Upstream payloads are loosely typed: numbers arrive as strings, fields go
//! missing, nested JSON hides in string fields. Every transform here is total:
//! anything unexpected becomes `0`, an empty string or an empty list instead
//! of an error.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::{HomeData, KLineBar, RankTopic, TokenData, TokenDetail, TokenPair, TokenPrices};

/// Timestamps above this are taken to be milliseconds
const MILLIS_THRESHOLD: i64 = 2_000_000_000;

/// Converts an Ave.ai token list response (`{ status, data: [...] }`)
pub fn transform_ave_tokens(raw: &Value) -> Vec<TokenData> {
    raw.get("data")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(ave_token).collect())
        .unwrap_or_default()
}

/// Converts a DexScreener token list
///
/// Accepts either a bare array (the boosts endpoint) or `{ data: [...] }`.
/// DexScreener has no 24h change, volume or holder counts; those stay 0.
pub fn transform_dexscreener_tokens(raw: &Value) -> Vec<TokenData> {
    let items = raw
        .as_array()
        .or_else(|| raw.get("data").and_then(Value::as_array));

    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| {
            let symbol = first_non_empty(&[item.get("symbol")]).unwrap_or_else(|| "Unknown".to_string());
            let name = first_non_empty(&[item.get("name"), item.get("symbol")])
                .unwrap_or_else(|| "Unknown Token".to_string());

            TokenData {
                token: first_non_empty(&[item.get("tokenAddress"), item.get("address")])
                    .unwrap_or_default(),
                chain: first_non_empty(&[item.get("chainId"), item.get("chain")])
                    .unwrap_or_else(|| "ethereum".to_string()),
                symbol,
                name,
                logo_url: first_non_empty(&[item.get("icon"), item.get("logo")]).unwrap_or_default(),
                current_price_usd: number(
                    item.get("price")
                        .and_then(|p| p.get("usd"))
                        .or_else(|| item.get("priceUsd")),
                ),
                description: first_non_empty(&[item.get("description")]),
                ..Default::default()
            }
        })
        .collect()
}

/// Converts an Ave.ai token detail response
///
/// Returns `None` unless `status == 1` and the response carries a token.
pub fn transform_ave_token_detail(raw: &Value) -> Option<TokenDetail> {
    if integer(raw.get("status")) != 1 {
        return None;
    }

    let data = raw.get("data")?;
    let token = data.get("token").filter(|t| t.is_object())?;

    let pairs = data
        .get("pairs")
        .and_then(Value::as_array)
        .map(|pairs| pairs.iter().map(token_pair).collect())
        .unwrap_or_default();

    Some(TokenDetail {
        token: ave_token(token),
        pairs,
    })
}

/// Whether an Ave.ai list response reports success and carries a data array
pub fn is_valid_ave_list(raw: &Value) -> bool {
    integer(raw.get("status")) == 1 && raw.get("data").is_some_and(Value::is_array)
}

/// Converts an Ave.ai batch price response (`{ status, data: { id: {...} } }`)
///
/// `None` unless `status == 1` and `data` is an object.
pub fn transform_token_prices(raw: &Value) -> Option<TokenPrices> {
    if integer(raw.get("status")) != 1 {
        return None;
    }
    let prices: BTreeMap<String, TokenData> = raw
        .get("data")?
        .as_object()?
        .iter()
        .map(|(id, info)| (id.clone(), ave_token(info)))
        .collect();

    Some(TokenPrices {
        count: prices.len(),
        prices,
    })
}

/// Extracts topics from an Ave.ai rank topics response
pub fn transform_rank_topics(raw: &Value) -> Vec<RankTopic> {
    raw.get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let id = first_non_empty(&[item.get("id")])?;
                    Some(RankTopic {
                        id,
                        name_en: text(item.get("name_en")),
                        name_zh: text(item.get("name_zh")),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Converts an Ave.ai K-line response (`{ status, data: { points: [...] } }`)
///
/// Points missing a field or holding a non-numeric value are dropped.
/// Millisecond timestamps are converted to seconds, and timestamps more than a
/// day in the future are clamped to `now_secs`.
pub fn transform_kline_points(raw: &Value, now_secs: i64) -> Vec<KLineBar> {
    if integer(raw.get("status")) != 1 {
        return Vec::new();
    }

    let Some(points) = raw
        .get("data")
        .and_then(|d| d.get("points"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let bars: Vec<KLineBar> = points
        .iter()
        .filter_map(|point| kline_bar(point, now_secs))
        .collect();

    if bars.len() < points.len() {
        debug!("Dropped {} invalid K-line points", points.len() - bars.len());
    }
    bars
}

fn kline_bar(point: &Value, now_secs: i64) -> Option<KLineBar> {
    let mut time = strict_integer(point.get("time"))?;
    if time <= 0 {
        return None;
    }
    if time > MILLIS_THRESHOLD {
        time /= 1000;
    }
    if time > now_secs + 86_400 {
        time = now_secs;
    }

    Some(KLineBar {
        time,
        open: strict_number(point.get("open"))?,
        high: strict_number(point.get("high"))?,
        low: strict_number(point.get("low"))?,
        close: strict_number(point.get("close"))?,
        volume: strict_number(point.get("volume"))?,
    })
}

/// Builds the home page bundle from a token list
pub fn prepare_home_data(tokens: Vec<TokenData>, source: &str, now_millis: i64) -> HomeData {
    let trending = tokens.iter().take(10).cloned().collect();

    let mut by_price = tokens.clone();
    by_price.sort_by(|a, b| b.current_price_usd.total_cmp(&a.current_price_usd));
    by_price.truncate(15);

    let new_tokens = tokens[tokens.len().saturating_sub(20)..].to_vec();

    HomeData {
        count: tokens.len(),
        tokens,
        trending,
        popular: by_price,
        new_tokens,
        success: true,
        timestamp: now_millis,
        source: source.to_string(),
    }
}

/// Placeholder token list served when every upstream is unavailable
pub fn dummy_tokens(count: usize) -> Vec<TokenData> {
    (0..count)
        .map(|i| TokenData {
            token: format!("0xtoken{}", i),
            chain: if i % 2 == 0 { "bsc" } else { "eth" }.to_string(),
            symbol: format!("TKN{}", i),
            name: format!("Token {}", i),
            logo_url: format!("https://example.com/token{}.png", i),
            current_price_usd: ((i * 37) % 1000) as f64 + 0.5,
            price_change_24h: ((i * 7) % 21) as f64 - 10.0,
            tx_volume_u_24h: ((i + 1) * 100_000) as f64,
            holders: ((i + 1) * 1_000) as u64,
            ..Default::default()
        })
        .collect()
}

/// Placeholder topic list served when Ave.ai is unavailable
pub fn dummy_topics() -> Vec<RankTopic> {
    [
        ("hot", "Hot", "热门"),
        ("new", "New", "新币"),
        ("meme", "Meme", "Meme"),
        ("defi", "DeFi", "DeFi"),
        ("metaverse", "Metaverse", "元宇宙"),
    ]
    .into_iter()
    .map(|(id, en, zh)| RankTopic {
        id: id.to_string(),
        name_en: en.to_string(),
        name_zh: zh.to_string(),
    })
    .collect()
}

/// Ave.ai K-line interval in minutes for a chart interval label
///
/// Unknown labels fall back to daily bars.
pub fn interval_minutes(interval: &str) -> u32 {
    match interval {
        "1m" => 1,
        "5m" => 5,
        "15m" => 15,
        "30m" => 30,
        "1h" => 60,
        "2h" => 120,
        "4h" => 240,
        "1d" => 1440,
        "3d" => 4320,
        "1w" => 10080,
        "1M" => 43200,
        "1y" => 525600,
        _ => 1440,
    }
}

/// Bar width in seconds used for synthesized K-line data
fn interval_seconds(interval: &str) -> i64 {
    match interval {
        "1m" => 60,
        "5m" => 300,
        "15m" => 900,
        "30m" => 1800,
        "4h" => 14_400,
        "1d" => 86_400,
        "1w" => 604_800,
        _ => 3600,
    }
}

/// Synthesized K-line series ending at `now_secs`, used when no real data exists
///
/// Deterministic for a given `(count, interval, offset)`, so paging through
/// offsets yields a continuous series.
pub fn mock_kline(count: usize, interval: &str, offset: usize, now_secs: i64) -> Vec<KLineBar> {
    const BASE_PRICE: f64 = 0.007354;

    let step = interval_seconds(interval);
    let total = (offset + count) as i64;
    let price_at = |n: usize| BASE_PRICE * (1.0 + 0.05 * (n as f64 * 0.3).sin());

    (0..count)
        .map(|i| {
            // bars before now
            let n = offset + count - i;
            let open = price_at(n);
            let close = price_at(n - 1);
            let wick = ((n % 5) as f64 + 1.0) * 0.002;

            KLineBar {
                time: now_secs - (total - i as i64) * step,
                open,
                high: open.max(close) * (1.0 + wick),
                low: (open.min(close) * (1.0 - wick)).max(0.000_001),
                close,
                volume: 100.0 + ((n * 131) % 2000) as f64,
            }
        })
        .collect()
}

fn ave_token(item: &Value) -> TokenData {
    let appendix = item.get("appendix").and_then(Value::as_str);
    let extra = appendix
        .filter(|s| !s.is_empty())
        .and_then(|s| match serde_json::from_str::<Value>(s) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Ignoring unparsable token appendix: {}", e);
                None
            }
        })
        .unwrap_or(Value::Null);

    let name = first_non_empty(&[extra.get("tokenName"), item.get("name"), item.get("symbol")])
        .unwrap_or_else(|| "Unknown Token".to_string());

    let decimal = match integer(item.get("decimal")) {
        d if d > 0 => d as u32,
        _ => 18,
    };

    TokenData {
        token: text(item.get("token")),
        chain: text(item.get("chain")),
        symbol: text(item.get("symbol")),
        name,
        logo_url: text(item.get("logo_url")),
        current_price_usd: number(item.get("current_price_usd")),
        price_change_24h: number(item.get("price_change_24h")),
        tx_volume_u_24h: number(item.get("tx_volume_u_24h")),
        holders: integer(item.get("holders")).max(0) as u64,
        market_cap: Some(text_or(item.get("market_cap"), "0")),
        fdv: Some(text_or(item.get("fdv"), "0")),
        risk_score: Some(text_or(item.get("risk_score"), "0")),
        risk_level: Some(integer(item.get("risk_level"))),
        burn_amount: Some(text_or(item.get("burn_amount"), "0")),
        other_amount: Some(text_or(item.get("other_amount"), "0")),
        decimal: Some(decimal),
        total: Some(text_or(item.get("total"), "0")),
        locked_percent: Some(text_or(item.get("locked_percent"), "0")),
        appendix: appendix.map(str::to_string),
        description: Some(text(extra.get("description"))),
        website: Some(text(extra.get("website"))),
        twitter: Some(text(extra.get("twitter"))),
        telegram: Some(text(extra.get("telegram"))),
        created_at: Some(integer(item.get("created_at"))),
        tx_count_24h: Some(integer(item.get("tx_count_24h"))),
    }
}

fn token_pair(pair: &Value) -> TokenPair {
    TokenPair {
        exchange: text(pair.get("exchange")),
        pair_address: text(pair.get("pair_address")),
        reserve0: text_or(pair.get("reserve0"), "0"),
        reserve1: text_or(pair.get("reserve1"), "0"),
        token0_price_eth: text_or(pair.get("token0_price_eth"), "0"),
        token0_price_usd: text_or(pair.get("token0_price_usd"), "0"),
        token1_price_eth: text_or(pair.get("token1_price_eth"), "0"),
        token1_price_usd: text_or(pair.get("token1_price_usd"), "0"),
        price_change: text_or(pair.get("price_change"), "0"),
        price_change_24h: text_or(pair.get("price_change_24h"), "0"),
        volume_u: text_or(pair.get("volume_u"), "0"),
        low_u: text_or(pair.get("low_u"), "0"),
        high_u: text_or(pair.get("high_u"), "0"),
    }
}

/// A string or number rendered as text; `None` when absent or empty
fn as_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_non_empty(candidates: &[Option<&Value>]) -> Option<String> {
    candidates.iter().find_map(|v| as_text(*v))
}

fn text(value: Option<&Value>) -> String {
    as_text(value).unwrap_or_default()
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    as_text(value).unwrap_or_else(|| default.to_string())
}

fn strict_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn strict_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

fn number(value: Option<&Value>) -> f64 {
    strict_number(value).unwrap_or(0.0)
}

fn integer(value: Option<&Value>) -> i64 {
    strict_integer(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ave_tokens_parse_string_numbers_and_appendix() {
        let raw = json!({
            "status": 1,
            "data": [{
                "token": "0xabc",
                "chain": "bsc",
                "symbol": "CAKE",
                "name": "PancakeSwap",
                "logo_url": "https://logo",
                "current_price_usd": "2.5",
                "price_change_24h": -3.25,
                "tx_volume_u_24h": "1000000",
                "holders": "12345",
                "decimal": "9",
                "appendix": "{\"tokenName\":\"Pancake Token\",\"website\":\"https://pancakeswap.finance\"}"
            }]
        });

        let tokens = transform_ave_tokens(&raw);

        assert_eq!(tokens.len(), 1);
        let t = &tokens[0];
        assert_eq!(t.token, "0xabc");
        assert_eq!(t.name, "Pancake Token");
        assert_eq!(t.current_price_usd, 2.5);
        assert_eq!(t.price_change_24h, -3.25);
        assert_eq!(t.holders, 12345);
        assert_eq!(t.decimal, Some(9));
        assert_eq!(t.website.as_deref(), Some("https://pancakeswap.finance"));
        assert_eq!(t.market_cap.as_deref(), Some("0"));
    }

    #[test]
    fn test_ave_tokens_defaults_on_garbage() {
        let raw = json!({
            "data": [{
                "current_price_usd": "n/a",
                "holders": null,
                "appendix": "{broken"
            }]
        });

        let t = &transform_ave_tokens(&raw)[0];
        assert_eq!(t.token, "");
        assert_eq!(t.name, "Unknown Token");
        assert_eq!(t.current_price_usd, 0.0);
        assert_eq!(t.holders, 0);
        assert_eq!(t.decimal, Some(18));
    }

    #[test]
    fn test_ave_tokens_missing_data_is_empty() {
        assert!(transform_ave_tokens(&json!({"status": 0})).is_empty());
        assert!(transform_ave_tokens(&json!({"data": {"not": "a list"}})).is_empty());
        assert!(transform_ave_tokens(&Value::Null).is_empty());
    }

    #[test]
    fn test_dexscreener_boosts_array() {
        let raw = json!([
            {
                "chainId": "solana",
                "tokenAddress": "So1111",
                "icon": "https://icon",
                "description": "a boosted token",
                "totalAmount": 500
            },
            "not an object"
        ]);

        let tokens = transform_dexscreener_tokens(&raw);

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, "So1111");
        assert_eq!(tokens[0].chain, "solana");
        assert_eq!(tokens[0].symbol, "Unknown");
        assert_eq!(tokens[0].name, "Unknown Token");
        assert_eq!(tokens[0].logo_url, "https://icon");
        assert_eq!(tokens[0].holders, 0);
    }

    #[test]
    fn test_dexscreener_wrapped_data() {
        let raw = json!({"data": [{"address": "0x1", "symbol": "DOGE", "price": {"usd": 0.12}}]});

        let tokens = transform_dexscreener_tokens(&raw);

        assert_eq!(tokens[0].token, "0x1");
        assert_eq!(tokens[0].chain, "ethereum");
        assert_eq!(tokens[0].name, "DOGE");
        assert_eq!(tokens[0].current_price_usd, 0.12);
    }

    #[test]
    fn test_token_detail_requires_status_one() {
        let raw = json!({"status": 0, "data": {"token": {"token": "0x1"}}});
        assert!(transform_ave_token_detail(&raw).is_none());

        let raw = json!({"status": 1, "data": {}});
        assert!(transform_ave_token_detail(&raw).is_none());
    }

    #[test]
    fn test_token_detail_with_pairs() {
        let raw = json!({
            "status": 1,
            "data": {
                "token": {"token": "0x1", "chain": "bsc", "symbol": "ONE"},
                "pairs": [{"exchange": "pancake", "volume_u": 123.4}]
            }
        });

        let detail = transform_ave_token_detail(&raw).unwrap();
        assert_eq!(detail.token.symbol, "ONE");
        assert_eq!(detail.pairs.len(), 1);
        assert_eq!(detail.pairs[0].exchange, "pancake");
        assert_eq!(detail.pairs[0].volume_u, "123.4");
        assert_eq!(detail.pairs[0].reserve0, "0");
    }

    #[test]
    fn test_rank_topics_skip_entries_without_id() {
        let raw = json!({"status": 1, "data": [{"id": "hot", "name_en": "Hot"}, {"name_en": "?"}]});

        let topics = transform_rank_topics(&raw);

        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].id, "hot");
        assert_eq!(topics[0].name_zh, "");
    }

    #[test]
    fn test_valid_ave_list() {
        assert!(is_valid_ave_list(&json!({"status": 1, "data": []})));
        assert!(is_valid_ave_list(&json!({"status": "1", "data": []})));
        assert!(!is_valid_ave_list(&json!({"status": 1, "data": {}})));
        assert!(!is_valid_ave_list(&json!({"status": 0, "data": []})));
    }

    #[test]
    fn test_token_prices_keyed_by_id() {
        let raw = json!({
            "status": 1,
            "data": {
                "0xa-bsc": {"token": "0xa", "chain": "bsc", "symbol": "A", "current_price_usd": "1.25"},
                "0xb-eth": {"token": "0xb", "chain": "eth", "current_price_usd": 3}
            }
        });

        let prices = transform_token_prices(&raw).unwrap();

        assert_eq!(prices.count, 2);
        assert_eq!(prices.prices["0xa-bsc"].current_price_usd, 1.25);
        assert_eq!(prices.prices["0xa-bsc"].symbol, "A");
        assert_eq!(prices.prices["0xb-eth"].current_price_usd, 3.0);
    }

    #[test]
    fn test_token_prices_rejects_bad_status_or_shape() {
        assert!(transform_token_prices(&json!({"status": 0, "data": {}})).is_none());
        assert!(transform_token_prices(&json!({"status": 1, "data": []})).is_none());
        assert_eq!(
            transform_token_prices(&json!({"status": 1, "data": {}})).unwrap(),
            TokenPrices::default()
        );
    }

    #[test]
    fn test_kline_points_normalization() {
        let now = 1_700_000_000;
        let raw = json!({
            "status": 1,
            "data": {"points": [
                {"time": 1_699_990_000_000i64, "open": "1.0", "high": "1.5", "low": "0.9", "close": "1.2", "volume": "10"},
                {"time": now + 200_000, "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1},
                {"time": 1_699_990_000, "open": "x", "high": 1, "low": 1, "close": 1, "volume": 1},
                {"open": 1, "high": 1, "low": 1, "close": 1, "volume": 1}
            ]}
        });

        let bars = transform_kline_points(&raw, now);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 1_699_990_000);
        assert_eq!(bars[0].close, 1.2);
        assert_eq!(bars[1].time, now);
    }

    #[test]
    fn test_kline_points_bad_status_is_empty() {
        let raw = json!({"status": 0, "msg": "rate limited"});
        assert!(transform_kline_points(&raw, 0).is_empty());
    }

    #[test]
    fn test_prepare_home_data_slices() {
        let tokens = dummy_tokens(30);

        let home = prepare_home_data(tokens.clone(), "ave", 42);

        assert_eq!(home.count, 30);
        assert_eq!(home.trending, tokens[..10].to_vec());
        assert_eq!(home.new_tokens, tokens[10..].to_vec());
        assert_eq!(home.popular.len(), 15);
        assert!(home
            .popular
            .windows(2)
            .all(|w| w[0].current_price_usd >= w[1].current_price_usd));
        assert_eq!(home.timestamp, 42);
        assert_eq!(home.source, "ave");
        assert!(home.success);
    }

    #[test]
    fn test_prepare_home_data_small_list() {
        let home = prepare_home_data(dummy_tokens(3), "dexscreener", 0);
        assert_eq!(home.trending.len(), 3);
        assert_eq!(home.popular.len(), 3);
        assert_eq!(home.new_tokens.len(), 3);
    }

    #[test]
    fn test_dummy_data_shapes() {
        let tokens = dummy_tokens(50);
        assert_eq!(tokens.len(), 50);
        assert_eq!(tokens[1].chain, "eth");
        assert_eq!(dummy_topics()[0].id, "hot");
        assert_eq!(dummy_topics().len(), 5);
    }

    #[test]
    fn test_interval_minutes() {
        assert_eq!(interval_minutes("1h"), 60);
        assert_eq!(interval_minutes("1M"), 43200);
        assert_eq!(interval_minutes("bogus"), 1440);
    }

    #[test]
    fn test_mock_kline_is_continuous_and_ends_at_now() {
        let now = 1_700_000_000;
        let bars = mock_kline(10, "1h", 0, now);

        assert_eq!(bars.len(), 10);
        assert_eq!(bars[9].time, now - 3600);
        assert!(bars.windows(2).all(|w| w[1].time - w[0].time == 3600));
        assert!(bars.windows(2).all(|w| w[0].close == w[1].open));
        assert!(bars.iter().all(|b| b.low <= b.open.min(b.close) && b.high >= b.open.max(b.close)));

        let older = mock_kline(10, "1h", 10, now);
        assert_eq!(older[9].time, bars[0].time - 3600);
        assert_eq!(older[9].close, bars[0].open);
    }
}

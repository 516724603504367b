use serde::{de, Deserialize, Deserializer, Serialize};

/// Wrapped SOL mint（原生 SOL 在 DEX 中以 wSOL 形式出现）
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// 报价请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// 输入 token 最小单位数量
    pub amount: u64,
}

/// 报价结果（每次请求临时创建，用完即弃）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawQuote")]
pub struct Quote {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    /// 候选路由/市场地址，顺序与聚合器返回一致
    pub route_addresses: Vec<String>,
    pub price_impact_pct: Option<String>,
    pub slippage_bps: Option<u16>,
}

impl Quote {
    /// 聚合器报告的第一个路由地址
    pub fn first_route_address(&self) -> Option<&str> {
        self.route_addresses.first().map(String::as_str)
    }
}

/// 聚合器原始响应
///
/// `outAmount` 等数量字段既可能是字符串也可能是数字；
/// 路由地址优先取 `marketAddresses`，否则取 `routePlan[].swapInfo.ammKey`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    #[serde(default)]
    input_mint: String,
    #[serde(default)]
    output_mint: String,
    #[serde(default, deserialize_with = "amount_from_str_or_number")]
    in_amount: u64,
    #[serde(default, deserialize_with = "amount_from_str_or_number")]
    out_amount: u64,
    #[serde(default)]
    market_addresses: Vec<String>,
    #[serde(default)]
    route_plan: Vec<RawRoutePlanStep>,
    #[serde(default)]
    price_impact_pct: Option<String>,
    #[serde(default)]
    slippage_bps: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRoutePlanStep {
    swap_info: RawSwapInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSwapInfo {
    amm_key: String,
}

impl From<RawQuote> for Quote {
    fn from(raw: RawQuote) -> Self {
        let route_addresses = if raw.market_addresses.is_empty() {
            raw.route_plan
                .into_iter()
                .map(|step| step.swap_info.amm_key)
                .collect()
        } else {
            raw.market_addresses
        };

        Self {
            input_mint: raw.input_mint,
            output_mint: raw.output_mint,
            in_amount: raw.in_amount,
            out_amount: raw.out_amount,
            route_addresses,
            price_impact_pct: raw.price_impact_pct,
            slippage_bps: raw.slippage_bps,
        }
    }
}

fn amount_from_str_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(u64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// 一次兑换（买入或卖出）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapLeg {
    pub label: &'static str,
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
}

impl SwapLeg {
    /// 1 SOL 买入 USDC
    pub fn default_buy() -> Self {
        Self {
            label: "buy",
            input_mint: SOL_MINT.to_string(),
            output_mint: USDC_MINT.to_string(),
            amount: 1_000_000_000,
        }
    }

    /// 10 USDC（6 位小数）卖回 SOL
    pub fn default_sell() -> Self {
        Self {
            label: "sell",
            input_mint: USDC_MINT.to_string(),
            output_mint: SOL_MINT.to_string(),
            amount: 10_000_000,
        }
    }
}

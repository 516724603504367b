//! Raydium AMM v4 池子列表
//!
//! 启动时从 JSON 文件加载一次，之后只读。
//! 文件格式兼容 Raydium 的流动性列表：顶层数组，
//! 或 `{ "official": [...], "unOfficial": [...] }`

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Deserializer};
use solana_sdk::pubkey::Pubkey;
use std::path::Path;
use std::str::FromStr;

/// 单个 AMM 池子描述
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDescriptor {
    #[serde(deserialize_with = "pubkey_from_str")]
    pub id: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub base_mint: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub quote_mint: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub program_id: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub authority: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub open_orders: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub target_orders: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub base_vault: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub quote_vault: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub market_program_id: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub market_id: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub market_authority: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub market_base_vault: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub market_quote_vault: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub market_bids: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub market_asks: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub market_event_queue: Pubkey,
}

impl PoolDescriptor {
    /// 池子是否为给定两个 mint 的交易对（不区分方向）
    pub fn pairs(&self, a: &Pubkey, b: &Pubkey) -> bool {
        (self.base_mint == *a && self.quote_mint == *b)
            || (self.base_mint == *b && self.quote_mint == *a)
    }
}

fn pubkey_from_str<'de, D>(deserializer: D) -> std::result::Result<Pubkey, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Pubkey::from_str(&s).map_err(serde::de::Error::custom)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryFile {
    Flat(Vec<PoolDescriptor>),
    Split {
        #[serde(default)]
        official: Vec<PoolDescriptor>,
        #[serde(default, rename = "unOfficial")]
        unofficial: Vec<PoolDescriptor>,
    },
}

/// 只读池子列表，保留文件中的顺序
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: Vec<PoolDescriptor>,
}

impl PoolRegistry {
    pub fn new(pools: Vec<PoolDescriptor>) -> Self {
        Self { pools }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: RegistryFile =
            serde_json::from_str(json).context("Failed to parse pool registry JSON")?;

        let pools = match file {
            RegistryFile::Flat(pools) => pools,
            RegistryFile::Split {
                mut official,
                unofficial,
            } => {
                official.extend(unofficial);
                official
            }
        };

        Ok(Self { pools })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pool registry {}", path.display()))?;

        let registry = Self::from_json(&json)
            .with_context(|| format!("Invalid pool registry {}", path.display()))?;

        info!("📚 已加载 {} 个 Raydium 池子 ({})", registry.len(), path.display());

        Ok(registry)
    }

    /// 按 market id 查找，多个匹配时取列表中第一个
    pub fn find_by_market(&self, market_id: &Pubkey) -> Option<&PoolDescriptor> {
        self.pools.iter().find(|pool| pool.market_id == *market_id)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

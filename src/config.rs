use anyhow::{Context, Result};
use serde::Deserialize;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::signature::Keypair;
use std::time::Duration;

use crate::schedule::SequenceMode;

const DEFAULT_QUOTE_API_URL: &str = "https://quote-api.jup.ag/v6/quote";

fn default_commitment_level() -> String {
    "confirmed".to_string()
}

fn default_quote_api_url() -> String {
    DEFAULT_QUOTE_API_URL.to_string()
}

fn default_quote_timeout_secs() -> u64 {
    10
}

fn default_pool_registry_path() -> String {
    "pools.json".to_string()
}

fn default_sell_delay_ms() -> u64 {
    10_000
}

fn default_sequence_mode() -> String {
    "timer".to_string()
}

/// 全局配置
///
/// 字段名即环境变量名（大写），例如 `private_key` <- `PRIVATE_KEY`
#[derive(Clone, Deserialize)]
pub struct Config {
    // 钱包配置（JSON 字节数组，兼容 base58）
    pub private_key: String,

    // 网络配置
    pub solana_rpc: String,
    #[serde(default = "default_commitment_level")]
    pub commitment_level: String,

    // 报价 API
    #[serde(default = "default_quote_api_url")]
    pub quote_api_url: String,
    #[serde(default = "default_quote_timeout_secs")]
    pub quote_timeout_secs: u64,

    // 池子列表
    #[serde(default = "default_pool_registry_path")]
    pub pool_registry_path: String,

    // 调度参数
    #[serde(default = "default_sell_delay_ms")]
    pub sell_delay_ms: u64,
    #[serde(default = "default_sequence_mode")]
    pub sequence_mode: String,

    // Compute Budget 配置（可选）
    #[serde(default)]
    pub compute_unit_limit: Option<u32>,
    #[serde(default)]
    pub compute_unit_price: Option<u64>,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = envy::from_env::<Config>()
            .context("Failed to load configuration from environment variables")?;

        config.validate()?;

        Ok(config)
    }

    /// 验证配置参数
    pub fn validate(&self) -> Result<()> {
        if self.solana_rpc.trim().is_empty() {
            anyhow::bail!("SOLANA_RPC must not be empty");
        }

        if self.quote_api_url.trim().is_empty() {
            anyhow::bail!("QUOTE_API_URL must not be empty");
        }

        if self.quote_timeout_secs == 0 {
            anyhow::bail!("quote_timeout_secs must be > 0");
        }

        if !["processed", "confirmed", "finalized"]
            .contains(&self.commitment_level.to_lowercase().as_str())
        {
            anyhow::bail!("commitment_level must be one of: processed, confirmed, finalized");
        }

        self.get_sequence_mode()?;

        if self.compute_unit_limit == Some(0) {
            anyhow::bail!("compute_unit_limit must be > 0");
        }

        Ok(())
    }

    /// 获取钱包 Keypair
    pub fn get_keypair(&self) -> Result<Keypair> {
        parse_keypair(&self.private_key)
    }

    /// 获取 CommitmentConfig
    pub fn get_commitment_config(&self) -> CommitmentConfig {
        match self.commitment_level.to_lowercase().as_str() {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        }
    }

    pub fn get_sequence_mode(&self) -> Result<SequenceMode> {
        self.sequence_mode.parse()
    }

    pub fn get_sell_delay(&self) -> Duration {
        Duration::from_millis(self.sell_delay_ms)
    }

    pub fn get_quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }

    /// 打印配置摘要（不输出私钥）
    pub fn print_summary(&self) {
        log::info!("=== Configuration Summary ===");
        log::info!("Network:");
        log::info!("  RPC: {}", self.solana_rpc);
        log::info!("  Commitment: {}", self.commitment_level);
        log::info!("");
        log::info!("Quote:");
        log::info!("  API: {}", self.quote_api_url);
        log::info!("  Timeout: {}s", self.quote_timeout_secs);
        log::info!("");
        log::info!("Pools:");
        log::info!("  Registry: {}", self.pool_registry_path);
        log::info!("");
        log::info!("Schedule:");
        log::info!("  Sell Delay: {}ms", self.sell_delay_ms);
        log::info!("  Mode: {}", self.sequence_mode);
        if self.compute_unit_limit.is_some() || self.compute_unit_price.is_some() {
            log::info!("");
            log::info!("Compute Budget:");
            if let Some(limit) = self.compute_unit_limit {
                log::info!("  CU Limit: {}", limit);
            }
            if let Some(price) = self.compute_unit_price {
                log::info!("  CU Price: {}", price);
            }
        }
        log::info!("=============================");
    }
}

/// 解析私钥：优先 JSON 字节数组（`[12,34,...]`），否则按 base58 解码
pub fn parse_keypair(raw: &str) -> Result<Keypair> {
    let trimmed = raw.trim();

    let bytes: Vec<u8> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("PRIVATE_KEY is not a valid JSON byte array")?
    } else {
        bs58::decode(trimmed)
            .into_vec()
            .context("PRIVATE_KEY is neither a JSON byte array nor a base58 string")?
    };

    Keypair::try_from(bytes.as_slice())
        .map_err(|e| anyhow::anyhow!("Invalid keypair bytes ({} bytes): {}", bytes.len(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;

    fn sample_config() -> Config {
        Config {
            private_key: "[]".to_string(),
            solana_rpc: "http://127.0.0.1:8899".to_string(),
            commitment_level: default_commitment_level(),
            quote_api_url: default_quote_api_url(),
            quote_timeout_secs: default_quote_timeout_secs(),
            pool_registry_path: default_pool_registry_path(),
            sell_delay_ms: default_sell_delay_ms(),
            sequence_mode: default_sequence_mode(),
            compute_unit_limit: None,
            compute_unit_price: None,
        }
    }

    #[test]
    fn parses_json_byte_array_key() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();

        let parsed = parse_keypair(&json).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());
    }

    #[test]
    fn parses_base58_key() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();

        let parsed = parse_keypair(&encoded).unwrap();
        assert_eq!(parsed.pubkey(), keypair.pubkey());
    }

    #[test]
    fn rejects_malformed_key() {
        assert!(parse_keypair("[1, 2, 3]").is_err());
        assert!(parse_keypair("[not json").is_err());
        assert!(parse_keypair("0OIl").is_err());
    }

    #[test]
    fn defaults_are_valid() {
        let config = sample_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.get_commitment_config(), CommitmentConfig::confirmed());
        assert_eq!(config.get_sell_delay(), Duration::from_millis(10_000));
        assert_eq!(config.get_sequence_mode().unwrap(), SequenceMode::Timer);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = sample_config();
        config.commitment_level = "recent".to_string();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.sequence_mode = "parallel".to_string();
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.compute_unit_limit = Some(0);
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.solana_rpc = "  ".to_string();
        assert!(config.validate().is_err());
    }
}

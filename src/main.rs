use anyhow::Result;
use log::info;
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tokio::time::Instant;

use rayswap::chain::RpcChain;
use rayswap::config::Config;
use rayswap::executor::SwapExecutor;
use rayswap::pools::PoolRegistry;
use rayswap::quote::JupiterQuoteClient;
use rayswap::schedule::{run_plan, SwapPlan};

#[tokio::main]
async fn main() -> Result<()> {
    // 卖出延迟以进程启动为基准
    let start = Instant::now();

    // 初始化日志
    env_logger::init();

    info!("🚀 RaySwap - Jupiter quote + Raydium AMM swap");
    info!("================================================");

    // 加载配置
    let config = Config::from_env()?;
    config.print_summary();

    // 获取钱包
    let keypair = Arc::new(config.get_keypair()?);
    info!("Wallet: {}", keypair.pubkey());

    // 创建组件
    let pools = Arc::new(PoolRegistry::load(&config.pool_registry_path)?);
    let quotes = JupiterQuoteClient::new(config.quote_api_url.clone(), config.get_quote_timeout())?;
    let chain = RpcChain::new(config.solana_rpc.clone(), config.get_commitment_config());

    let executor = Arc::new(
        SwapExecutor::new(quotes, chain, pools, keypair)
            .with_compute_budget(config.compute_unit_limit, config.compute_unit_price),
    );

    let plan = SwapPlan::new(config.get_sell_delay(), config.get_sequence_mode()?);
    let outcome = run_plan(executor, plan, start).await;

    info!(
        "Done (buy: {}, sell: {})",
        outcome.buy.map_or("failed".to_string(), |s| s.to_string()),
        outcome.sell.map_or("failed".to_string(), |s| s.to_string()),
    );

    Ok(())
}

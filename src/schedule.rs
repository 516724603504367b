//! 买入/卖出调度
//!
//! 买入在启动时立即开始；卖出在启动后固定延迟开始。
//! `timer` 模式下卖出不等待买入完成，`awaited` 模式下卖出至少等到买入结束

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use solana_sdk::signature::Signature;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::types::SwapLeg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// 卖出只依赖定时器
    Timer,
    /// 卖出依赖定时器与买入完成
    Awaited,
}

impl FromStr for SequenceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "timer" => Ok(SequenceMode::Timer),
            "awaited" => Ok(SequenceMode::Awaited),
            _ => Err(anyhow::anyhow!("Unknown sequence mode: {} (expected timer or awaited)", s)),
        }
    }
}

/// 执行单笔兑换，失败已在内部记录
#[async_trait]
pub trait LegRunner: Send + Sync + 'static {
    async fn run_leg(&self, leg: &SwapLeg) -> Option<Signature>;
}

#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub buy: SwapLeg,
    pub sell: SwapLeg,
    pub sell_delay: Duration,
    pub mode: SequenceMode,
}

impl SwapPlan {
    pub fn new(sell_delay: Duration, mode: SequenceMode) -> Self {
        Self {
            buy: SwapLeg::default_buy(),
            sell: SwapLeg::default_sell(),
            sell_delay,
            mode,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    pub buy: Option<Signature>,
    pub sell: Option<Signature>,
}

/// 运行买入 + 卖出，两笔都结束后返回
///
/// `start` 为进程启动时刻，卖出的开始时间以它为基准
pub async fn run_plan<R: LegRunner>(runner: Arc<R>, plan: SwapPlan, start: Instant) -> PlanOutcome {
    let sell_at = start + plan.sell_delay;

    info!("🛒 启动 {} : {} -> {} ({})", plan.buy.label, plan.buy.input_mint, plan.buy.output_mint, plan.buy.amount);
    let buy_handle = {
        let runner = runner.clone();
        let leg = plan.buy.clone();
        tokio::spawn(async move { runner.run_leg(&leg).await })
    };

    let (buy, sell) = match plan.mode {
        SequenceMode::Timer => {
            let sell_handle = {
                let runner = runner.clone();
                let leg = plan.sell.clone();
                tokio::spawn(async move {
                    tokio::time::sleep_until(sell_at).await;
                    info!("💸 启动 {} : {} -> {} ({})", leg.label, leg.input_mint, leg.output_mint, leg.amount);
                    runner.run_leg(&leg).await
                })
            };

            (join_leg(buy_handle).await, join_leg(sell_handle).await)
        }
        SequenceMode::Awaited => {
            let buy = join_leg(buy_handle).await;
            tokio::time::sleep_until(sell_at).await;
            info!("💸 启动 {} : {} -> {} ({})", plan.sell.label, plan.sell.input_mint, plan.sell.output_mint, plan.sell.amount);
            let sell = runner.run_leg(&plan.sell).await;
            (buy, sell)
        }
    };

    PlanOutcome { buy, sell }
}

async fn join_leg(handle: tokio::task::JoinHandle<Option<Signature>>) -> Option<Signature> {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            warn!("⚠️  兑换任务异常退出: {}", e);
            None
        }
    }
}

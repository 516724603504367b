use thiserror::Error;

/// 兑换失败类型
///
/// 三类失败在 `SwapExecutor::run` 处统一记录日志后吞掉，
/// 需要区分处理的调用方可直接使用 `SwapExecutor::execute`
#[derive(Debug, Error)]
pub enum SwapError {
    /// 报价失败、报价为空或输出为 0
    #[error("No swap route found: {0}")]
    NoRoute(String),

    /// 池子列表中没有与报价路由地址匹配的池子
    #[error("No matching Raydium pool found: {0}")]
    NoPool(String),

    /// ATA 查询、指令构建、签名、发送或确认失败
    #[error("Swap submission failed: {0:#}")]
    Submission(#[source] anyhow::Error),
}

impl SwapError {
    pub fn kind(&self) -> &'static str {
        match self {
            SwapError::NoRoute(_) => "no_route",
            SwapError::NoPool(_) => "no_pool",
            SwapError::Submission(_) => "submission",
        }
    }
}

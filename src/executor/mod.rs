// 兑换执行器
pub mod swap;

// 指令构建器
pub mod builder;

// 导出
pub use builder::TransactionBuilder;
pub use swap::SwapExecutor;

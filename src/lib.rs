// lib.rs - 导出公共接口供 main 与集成测试使用

pub mod chain;
pub mod config;
pub mod error;
pub mod executor;
pub mod pools;
pub mod quote;
pub mod schedule;
pub mod types;

// 重新导出常用类型
pub use chain::{RpcChain, SwapChain};
pub use error::SwapError;
pub use executor::SwapExecutor;
pub use pools::{PoolDescriptor, PoolRegistry};
pub use quote::{JupiterQuoteClient, QuoteSource};
pub use schedule::{run_plan, LegRunner, SequenceMode, SwapPlan};
pub use types::{Quote, QuoteRequest, SwapLeg};

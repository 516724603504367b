/// 兑换执行器
///
/// 单次兑换的完整流程:
/// 1. 获取聚合器报价
/// 2. 按报价的第一个路由地址匹配 Raydium 池子
/// 3. 计算 2% 滑点下的最小输出
/// 4. 检查输出 ATA，构建指令
/// 5. 签名、发送并等待确认
///
/// 只尝试一次，不重试

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error, info};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::VersionedTransaction,
};
use std::str::FromStr;
use std::sync::Arc;

use crate::chain::SwapChain;
use crate::error::SwapError;
use crate::executor::builder::{
    get_associated_token_address, min_out_amount, SwapParams, TransactionBuilder,
};
use crate::pools::{PoolDescriptor, PoolRegistry};
use crate::quote::QuoteSource;
use crate::schedule::LegRunner;
use crate::types::{Quote, QuoteRequest, SwapLeg};

/// 报价金额的展示精度（按 6 位小数）
const DISPLAY_DECIMALS: i32 = 6;

pub struct SwapExecutor<Q, C> {
    quotes: Q,
    chain: C,
    pools: Arc<PoolRegistry>,
    /// 支付账户
    payer: Arc<Keypair>,
    builder: TransactionBuilder,
}

impl<Q: QuoteSource, C: SwapChain> SwapExecutor<Q, C> {
    pub fn new(quotes: Q, chain: C, pools: Arc<PoolRegistry>, payer: Arc<Keypair>) -> Self {
        let builder = TransactionBuilder::new(payer.pubkey());

        info!("🚀 兑换执行器已初始化");
        info!("   钱包地址: {}", payer.pubkey());
        info!("   池子数量: {}", pools.len());

        Self {
            quotes,
            chain,
            pools,
            payer,
            builder,
        }
    }

    pub fn with_compute_budget(mut self, limit: Option<u32>, price: Option<u64>) -> Self {
        self.builder = self.builder.with_compute_budget(limit, price);
        self
    }

    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// 执行一次兑换，失败原因以 `SwapError` 返回
    pub async fn execute(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
    ) -> Result<Signature, SwapError> {
        info!("Fetching best swap route...");
        let quote = self.fetch_route(input_mint, output_mint, amount).await?;

        info!(
            "Best Route Found: {} tokens",
            quote.out_amount as f64 / 10f64.powi(DISPLAY_DECIMALS)
        );
        if let Some(impact) = &quote.price_impact_pct {
            debug!("   Price impact: {}%", impact);
        }
        debug!("   Route: {:?}", quote.route_addresses);

        let pool = self.resolve_pool(&quote)?;
        debug!("   Pool: {} (market {})", pool.id, pool.market_id);

        info!("Executing swap...");
        let signature = self
            .submit_swap(pool, input_mint, output_mint, amount, &quote)
            .await
            .map_err(SwapError::Submission)?;

        info!("Transaction Successful: {}", signature);
        Ok(signature)
    }

    /// 执行一次兑换，所有失败只记录日志，调用方拿到 `None`
    pub async fn run(&self, leg: &SwapLeg) -> Option<Signature> {
        match self
            .execute(&leg.input_mint, &leg.output_mint, leg.amount)
            .await
        {
            Ok(signature) => Some(signature),
            Err(e) => {
                error!("❌ Swap Failed [{}] ({}): {}", leg.label, e.kind(), e);
                None
            }
        }
    }

    async fn fetch_route(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
    ) -> Result<Quote, SwapError> {
        if input_mint.is_empty() || output_mint.is_empty() {
            return Err(SwapError::NoRoute("empty mint".to_string()));
        }
        if amount == 0 {
            return Err(SwapError::NoRoute("amount must be > 0".to_string()));
        }

        let request = QuoteRequest {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount,
        };

        let quote = self
            .quotes
            .fetch_quote(&request)
            .await
            .map_err(|e| SwapError::NoRoute(format!("{:#}", e)))?;

        if quote.out_amount == 0 {
            return Err(SwapError::NoRoute("quote reports zero output".to_string()));
        }

        Ok(quote)
    }

    fn resolve_pool(&self, quote: &Quote) -> Result<&PoolDescriptor, SwapError> {
        let route = quote
            .first_route_address()
            .ok_or_else(|| SwapError::NoPool("quote has no route address".to_string()))?;

        let market_id = Pubkey::from_str(route)
            .map_err(|e| SwapError::NoPool(format!("invalid route address {}: {}", route, e)))?;

        self.pools
            .find_by_market(&market_id)
            .ok_or_else(|| SwapError::NoPool(format!("market {}", market_id)))
    }

    async fn submit_swap(
        &self,
        pool: &PoolDescriptor,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        quote: &Quote,
    ) -> Result<Signature> {
        let input_mint = Pubkey::from_str(input_mint).context("Invalid input mint")?;
        let output_mint = Pubkey::from_str(output_mint).context("Invalid output mint")?;
        let payer = self.payer.pubkey();

        let output_account = get_associated_token_address(&payer, &output_mint);
        let output_account_exists = self.chain.account_exists(&output_account).await?;
        debug!(
            "   输出 Token 账户: {} (已存在: {})",
            output_account, output_account_exists
        );

        let minimum_amount_out = min_out_amount(quote.out_amount);
        info!(
            "📊 输入: {} | 报价输出: {} | 最小输出 (2% 滑点): {}",
            amount, quote.out_amount, minimum_amount_out
        );

        let instructions = self.builder.build_swap_instructions(&SwapParams {
            pool,
            input_mint,
            output_mint,
            amount_in: amount,
            minimum_amount_out,
            output_account_exists,
        });
        info!("📦 交易指令已构建，共 {} 条指令", instructions.len());

        let recent_blockhash = self.chain.latest_blockhash().await?;
        let transaction = self.build_versioned_transaction(&instructions, recent_blockhash)?;

        let serialized_tx = bincode::serialize(&transaction).context("序列化交易失败")?;
        debug!("📦 交易大小: {} bytes", serialized_tx.len());

        self.chain.send_and_confirm(&transaction).await
    }

    /// 构建并签名 VersionedTransaction
    fn build_versioned_transaction(
        &self,
        instructions: &[Instruction],
        recent_blockhash: Hash,
    ) -> Result<VersionedTransaction> {
        let message = v0::Message::try_compile(
            &self.payer.pubkey(),
            instructions,
            &[], // address_lookup_tables
            recent_blockhash,
        )
        .context("编译消息失败")?;

        let transaction = VersionedTransaction::try_new(VersionedMessage::V0(message), &[&*self.payer])
            .context("创建交易失败")?;

        Ok(transaction)
    }
}

#[async_trait]
impl<Q: QuoteSource + 'static, C: SwapChain + 'static> LegRunner for SwapExecutor<Q, C> {
    async fn run_leg(&self, leg: &SwapLeg) -> Option<Signature> {
        self.run(leg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::builder::{ASSOCIATED_TOKEN_PROGRAM, NATIVE_MINT};
    use crate::pools::tests::sample_pool;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockQuotes {
        response: Option<Quote>,
        requests: Mutex<Vec<QuoteRequest>>,
    }

    impl MockQuotes {
        fn returning(response: Option<Quote>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl QuoteSource for MockQuotes {
        async fn fetch_quote(&self, request: &QuoteRequest) -> Result<Quote> {
            self.requests.lock().unwrap().push(request.clone());
            self.response
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    #[derive(Default)]
    struct MockChain {
        output_account_exists: bool,
        reject: bool,
        lookups: AtomicUsize,
        sent: Mutex<Vec<VersionedTransaction>>,
    }

    #[async_trait]
    impl SwapChain for MockChain {
        async fn account_exists(&self, _address: &Pubkey) -> Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.output_account_exists)
        }

        async fn latest_blockhash(&self) -> Result<Hash> {
            Ok(Hash::new_unique())
        }

        async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature> {
            if self.reject {
                anyhow::bail!("Transaction simulation failed: insufficient funds");
            }
            self.sent.lock().unwrap().push(transaction.clone());
            Ok(transaction.signatures[0])
        }
    }

    fn quote(out_amount: u64, route: &str) -> Quote {
        Quote {
            input_mint: String::new(),
            output_mint: String::new(),
            in_amount: 0,
            out_amount,
            route_addresses: vec![route.to_string()],
            price_impact_pct: None,
            slippage_bps: None,
        }
    }

    struct Fixture {
        market: Pubkey,
        input_mint: Pubkey,
        output_mint: Pubkey,
        executor: SwapExecutor<MockQuotes, MockChain>,
    }

    fn fixture(quote_response: impl FnOnce(&Pubkey) -> Option<Quote>, chain: MockChain) -> Fixture {
        let market = Pubkey::new_unique();
        let input_mint = Pubkey::new_unique();
        let output_mint = Pubkey::new_unique();
        let pools = PoolRegistry::new(vec![sample_pool(market, input_mint, output_mint)]);

        let executor = SwapExecutor::new(
            MockQuotes::returning(quote_response(&market)),
            chain,
            Arc::new(pools),
            Arc::new(Keypair::new()),
        );

        Fixture {
            market,
            input_mint,
            output_mint,
            executor,
        }
    }

    impl Fixture {
        async fn execute(&self, amount: u64) -> Result<Signature, SwapError> {
            self.executor
                .execute(&self.input_mint.to_string(), &self.output_mint.to_string(), amount)
                .await
        }
    }

    #[tokio::test]
    async fn zero_output_quote_is_no_route() {
        let f = fixture(|market| Some(quote(0, &market.to_string())), MockChain::default());

        let err = f.execute(1_000).await.unwrap_err();

        assert!(matches!(err, SwapError::NoRoute(_)));
        assert_eq!(f.executor.quotes.calls(), 1);
        assert_eq!(f.executor.chain.lookups.load(Ordering::SeqCst), 0);
        assert!(f.executor.chain.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_quote_is_no_route() {
        let f = fixture(|_| None, MockChain::default());

        let err = f.execute(1_000).await.unwrap_err();

        assert!(matches!(err, SwapError::NoRoute(_)));
        assert_eq!(f.executor.chain.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_amount_never_requests_a_quote() {
        let f = fixture(|market| Some(quote(1, &market.to_string())), MockChain::default());

        let err = f.execute(0).await.unwrap_err();

        assert!(matches!(err, SwapError::NoRoute(_)));
        assert_eq!(f.executor.quotes.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_market_is_no_pool() {
        let other = Pubkey::new_unique().to_string();
        let f = fixture(move |_| Some(quote(1_000_000, &other)), MockChain::default());

        let err = f.execute(1_000).await.unwrap_err();

        assert!(matches!(err, SwapError::NoPool(_)));
        assert_eq!(f.executor.chain.lookups.load(Ordering::SeqCst), 0);
        assert!(f.executor.chain.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparseable_route_is_no_pool() {
        let f = fixture(|_| Some(quote(1_000_000, "not-a-pubkey")), MockChain::default());

        let err = f.execute(1_000).await.unwrap_err();
        assert!(matches!(err, SwapError::NoPool(_)));
    }

    #[tokio::test]
    async fn matching_pool_submits_one_signed_transaction() {
        let chain = MockChain {
            output_account_exists: true,
            ..Default::default()
        };
        let f = fixture(|market| Some(quote(1_000_000, &market.to_string())), chain);

        let signature = f.execute(5_000).await.unwrap();

        let sent = f.executor.chain.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].signatures[0], signature);
        assert!(sent[0].verify_with_results().iter().all(|ok| *ok));

        let message = &sent[0].message;
        let keys = message.static_account_keys();
        assert_eq!(keys[0], f.executor.payer());
        assert!(keys.contains(&f.market));
        assert!(!keys.contains(&ASSOCIATED_TOKEN_PROGRAM));

        // 唯一一条指令是 SwapBaseIn，最小输出 = 980_000
        let instructions = message.instructions();
        assert_eq!(instructions.len(), 1);
        let data = &instructions[0].data;
        assert_eq!(u64::from_le_bytes(data[1..9].try_into().unwrap()), 5_000);
        assert_eq!(u64::from_le_bytes(data[9..17].try_into().unwrap()), 980_000);
    }

    #[tokio::test]
    async fn missing_output_account_adds_create_instruction() {
        let f = fixture(|market| Some(quote(1_000_000, &market.to_string())), MockChain::default());

        f.execute(5_000).await.unwrap();

        let sent = f.executor.chain.sent.lock().unwrap();
        assert_eq!(sent[0].message.instructions().len(), 2);
        assert!(sent[0]
            .message
            .static_account_keys()
            .contains(&ASSOCIATED_TOKEN_PROGRAM));
        assert_eq!(f.executor.chain.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejected_transaction_is_submission_error() {
        let chain = MockChain {
            output_account_exists: true,
            reject: true,
            ..Default::default()
        };
        let f = fixture(|market| Some(quote(1_000_000, &market.to_string())), chain);

        let err = f.execute(5_000).await.unwrap_err();
        assert!(matches!(err, SwapError::Submission(_)));
    }

    #[tokio::test]
    async fn run_swallows_failures() {
        let f = fixture(|_| None, MockChain::default());
        let leg = SwapLeg {
            label: "buy",
            input_mint: NATIVE_MINT.to_string(),
            output_mint: f.output_mint.to_string(),
            amount: 1_000_000_000,
        };

        assert!(f.executor.run(&leg).await.is_none());
        assert_eq!(f.executor.quotes.calls(), 1);
    }
}

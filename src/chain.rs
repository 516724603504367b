//! 链上访问
//!
//! 执行器只依赖 `SwapChain`，生产环境使用 `RpcChain`（nonblocking RPC）

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};

#[async_trait]
pub trait SwapChain: Send + Sync {
    /// 账户是否已存在
    async fn account_exists(&self, address: &Pubkey) -> Result<bool>;

    async fn latest_blockhash(&self) -> Result<Hash>;

    /// 发送已签名交易并等待达到配置的 commitment
    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature>;
}

pub struct RpcChain {
    rpc_client: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcChain {
    pub fn new(rpc_endpoint: String, commitment: CommitmentConfig) -> Self {
        info!("🔗 RPC 端点: {} (commitment: {:?})", rpc_endpoint, commitment.commitment);

        Self {
            rpc_client: RpcClient::new_with_commitment(rpc_endpoint, commitment),
            commitment,
        }
    }
}

#[async_trait]
impl SwapChain for RpcChain {
    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let response = self
            .rpc_client
            .get_account_with_commitment(address, self.commitment)
            .await
            .with_context(|| format!("读取账户失败: {}", address))?;

        Ok(response.value.is_some())
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.rpc_client
            .get_latest_blockhash()
            .await
            .context("获取 blockhash 失败")
    }

    async fn send_and_confirm(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        if let Some(signature) = transaction.signatures.first() {
            debug!("📤 发送交易: {}", signature);
        }

        let signature = self
            .rpc_client
            .send_and_confirm_transaction(transaction)
            .await
            .context("发送或确认交易失败")?;

        Ok(signature)
    }
}

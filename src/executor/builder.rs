/// 兑换指令构建器
///
/// 指令全部手工构建（不依赖 spl 库），账户顺序对齐链上程序:
/// - Associated Token Account: Create / CreateIdempotent
/// - SPL Token: SyncNative / CloseAccount
/// - Raydium AMM v4: SwapBaseIn

use log::debug;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_system_interface::instruction::transfer;

use crate::pools::PoolDescriptor;

pub const TOKEN_PROGRAM: Pubkey = Pubkey::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ASSOCIATED_TOKEN_PROGRAM: Pubkey =
    Pubkey::from_str_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const SYSTEM_PROGRAM: Pubkey = Pubkey::from_str_const("11111111111111111111111111111111");
pub const NATIVE_MINT: Pubkey = Pubkey::from_str_const("So11111111111111111111111111111111111111112");

// Raydium AMM v4 指令编号
const SWAP_BASE_IN: u8 = 9;
// SPL Token 指令编号
const CLOSE_ACCOUNT: u8 = 9;
const SYNC_NATIVE: u8 = 17;
// ATA 程序指令编号
const ATA_CREATE: u8 = 0;
const ATA_CREATE_IDEMPOTENT: u8 = 1;

/// 固定 2% 滑点下的最小输出比例
pub const MIN_OUT_RATIO: f64 = 0.98;

/// 最小可接受输出 = floor(quoted × 0.98)
///
/// 按 f64 计算，与聚合器报价的常见用法保持一致；
/// 超过 2^53 的数量会丢失精度
pub fn min_out_amount(quoted_out_amount: u64) -> u64 {
    (quoted_out_amount as f64 * MIN_OUT_RATIO).floor() as u64
}

/// 派生 Associated Token Address（Token v3）
pub fn get_associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM,
    )
    .0
}

/// 创建 ATA 指令
///
/// `idempotent = true` 时账户已存在也不会失败
pub fn create_associated_token_account(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    idempotent: bool,
) -> Instruction {
    let ata = get_associated_token_address(owner, mint);

    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::new(*payer, true),                     // 0. 支付者（signer）
            AccountMeta::new(ata, false),                       // 1. 关联代币账户
            AccountMeta::new_readonly(*owner, false),           // 2. 拥有者
            AccountMeta::new_readonly(*mint, false),            // 3. mint
            AccountMeta::new_readonly(SYSTEM_PROGRAM, false),   // 4. system_program
            AccountMeta::new_readonly(TOKEN_PROGRAM, false),    // 5. token_program
        ],
        data: vec![if idempotent { ATA_CREATE_IDEMPOTENT } else { ATA_CREATE }],
    }
}

pub fn sync_native(account: &Pubkey) -> Instruction {
    Instruction {
        program_id: TOKEN_PROGRAM,
        accounts: vec![AccountMeta::new(*account, false)],
        data: vec![SYNC_NATIVE],
    }
}

pub fn close_account(account: &Pubkey, destination: &Pubkey, owner: &Pubkey) -> Instruction {
    Instruction {
        program_id: TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::new(*account, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*owner, true),
        ],
        data: vec![CLOSE_ACCOUNT],
    }
}

/// Raydium AMM v4 SwapBaseIn
///
/// 数据格式: [instruction(1), amount_in(8), minimum_amount_out(8)]
pub fn raydium_swap_base_in(
    pool: &PoolDescriptor,
    user_source: &Pubkey,
    user_destination: &Pubkey,
    owner: &Pubkey,
    amount_in: u64,
    minimum_amount_out: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(17);
    data.push(SWAP_BASE_IN);
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&minimum_amount_out.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(TOKEN_PROGRAM, false),            // 0: token_program
        AccountMeta::new(pool.id, false),                           // 1: amm
        AccountMeta::new_readonly(pool.authority, false),           // 2: amm_authority
        AccountMeta::new(pool.open_orders, false),                  // 3: amm_open_orders
        AccountMeta::new(pool.target_orders, false),                // 4: amm_target_orders
        AccountMeta::new(pool.base_vault, false),                   // 5: pool_coin_vault
        AccountMeta::new(pool.quote_vault, false),                  // 6: pool_pc_vault
        AccountMeta::new_readonly(pool.market_program_id, false),   // 7: market_program
        AccountMeta::new(pool.market_id, false),                    // 8: market
        AccountMeta::new(pool.market_bids, false),                  // 9: market_bids
        AccountMeta::new(pool.market_asks, false),                  // 10: market_asks
        AccountMeta::new(pool.market_event_queue, false),           // 11: market_event_queue
        AccountMeta::new(pool.market_base_vault, false),            // 12: market_coin_vault
        AccountMeta::new(pool.market_quote_vault, false),           // 13: market_pc_vault
        AccountMeta::new_readonly(pool.market_authority, false),    // 14: market_vault_signer
        AccountMeta::new(*user_source, false),                      // 15: user_source
        AccountMeta::new(*user_destination, false),                 // 16: user_destination
        AccountMeta::new_readonly(*owner, true),                    // 17: user_owner (signer)
    ];

    Instruction {
        program_id: pool.program_id,
        accounts,
        data,
    }
}

/// 单次兑换的参数
#[derive(Debug, Clone)]
pub struct SwapParams<'a> {
    pub pool: &'a PoolDescriptor,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount_in: u64,
    pub minimum_amount_out: u64,
    /// 钱包是否已有输出 token 的 ATA
    pub output_account_exists: bool,
}

/// 交易构建器
pub struct TransactionBuilder {
    owner: Pubkey,
    compute_unit_limit: Option<u32>,
    compute_unit_price: Option<u64>,
}

impl TransactionBuilder {
    pub fn new(owner: Pubkey) -> Self {
        Self {
            owner,
            compute_unit_limit: None,
            compute_unit_price: None,
        }
    }

    pub fn with_compute_budget(mut self, limit: Option<u32>, price: Option<u64>) -> Self {
        self.compute_unit_limit = limit;
        self.compute_unit_price = price;
        self
    }

    /// 构建完整指令序列
    ///
    /// 顺序: ComputeBudget → 创建输出 ATA → 包装 SOL → SwapBaseIn → 关闭 wSOL 账户
    pub fn build_swap_instructions(&self, params: &SwapParams<'_>) -> Vec<Instruction> {
        let owner = self.owner;
        let mut instructions = Vec::new();

        if let Some(limit) = self.compute_unit_limit {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(limit));
        }
        if let Some(price) = self.compute_unit_price {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_price(price));
        }

        let user_source = get_associated_token_address(&owner, &params.input_mint);
        let user_destination = get_associated_token_address(&owner, &params.output_mint);

        if !params.output_account_exists {
            debug!("🏗️  添加输出 ATA 创建指令: {}", user_destination);
            instructions.push(create_associated_token_account(
                &owner,
                &owner,
                &params.output_mint,
                false,
            ));
        }

        let wrap_input = params.input_mint == NATIVE_MINT;
        if wrap_input {
            debug!("🏗️  包装 {} lamports 为 wSOL: {}", params.amount_in, user_source);
            instructions.push(create_associated_token_account(&owner, &owner, &NATIVE_MINT, true));
            instructions.push(transfer(&owner, &user_source, params.amount_in));
            instructions.push(sync_native(&user_source));
        }

        instructions.push(raydium_swap_base_in(
            params.pool,
            &user_source,
            &user_destination,
            &owner,
            params.amount_in,
            params.minimum_amount_out,
        ));

        // wSOL 用完即关闭，余额退回钱包
        if wrap_input {
            instructions.push(close_account(&user_source, &owner, &owner));
        } else if params.output_mint == NATIVE_MINT {
            instructions.push(close_account(&user_destination, &owner, &owner));
        }

        instructions
    }
}

//! Conditional Token Framework settlement interface.
//!
//! Grounded on `original_source/polymarket/ctf/{adapter,abi,addresses}.py`;
//! contract addresses are shared with `crate::orders::get_contract_config`.
//! This module is an interface to on-chain settlement (approve, split,
//! merge, convert, redeem); actually broadcasting/signing transactions is an
//! explicit non-goal (spec.md's execution-internals non-goal), so
//! [`CtfSettlement`] describes the calls a concrete chain adapter must
//! support without prescribing a signing/broadcast stack.

use crate::errors::{PolyfillError, Result};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Gas price above which a settlement call is refused outright.
pub const GAS_PRICE_HARD_CAP_GWEI: u64 = 500;
/// Gas price above which a settlement call is allowed but logged as a warning.
pub const GAS_PRICE_WARN_THRESHOLD_GWEI: u64 = 150;

#[derive(Debug, Clone, Copy)]
pub struct GasPolicy {
    pub hard_cap_gwei: u64,
    pub warn_threshold_gwei: u64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            hard_cap_gwei: GAS_PRICE_HARD_CAP_GWEI,
            warn_threshold_gwei: GAS_PRICE_WARN_THRESHOLD_GWEI,
        }
    }
}

impl GasPolicy {
    /// Check a proposed gas price, returning an error if it exceeds the hard
    /// cap. Callers should log a warning (not implemented here, since this
    /// module has no logging dependency of its own) when `should_warn` is true.
    pub fn check(&self, gas_price_gwei: u64) -> Result<()> {
        if gas_price_gwei > self.hard_cap_gwei {
            return Err(PolyfillError::validation(format!(
                "gas price {gas_price_gwei} gwei exceeds hard cap {}",
                self.hard_cap_gwei
            )));
        }
        Ok(())
    }

    pub fn should_warn(&self, gas_price_gwei: u64) -> bool {
        gas_price_gwei > self.warn_threshold_gwei
    }
}

/// Result of a submitted settlement transaction: the hash plus whatever the
/// receipt wait resolved to.
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub status: TxStatus,
    pub gas_used: Option<u64>,
    pub revert_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted,
    TimedOut,
}

/// A single outcome position: `k` NO-token units convert to `k-1` collateral
/// units and `k-1` YES-token units (the CTF `convert_positions` formula).
#[derive(Debug, Clone, Copy)]
pub struct ConvertResult {
    pub collateral_out: Decimal,
    pub yes_tokens_out: Decimal,
}

/// Apply the `convert_positions` formula: converting `amount` NO tokens
/// across `k` outcomes yields `amount * (k - 1)` collateral and `(k - 1)`
/// YES tokens per unit converted.
pub fn convert_positions_amounts(amount: Decimal, k: u32) -> Result<ConvertResult> {
    if k < 2 {
        return Err(PolyfillError::validation("convert requires at least 2 outcomes"));
    }
    let multiplier = Decimal::from(k - 1);
    Ok(ConvertResult {
        collateral_out: amount * multiplier,
        yes_tokens_out: amount * multiplier,
    })
}

/// Interface a concrete chain adapter implements to perform CTF settlement
/// operations. Kept deliberately thin: signing/broadcasting is out of scope
/// here, callers supply an already-connected signer-backed implementation.
#[async_trait]
pub trait CtfSettlement: Send + Sync {
    /// Approve the exchange contract to move ERC1155 outcome tokens on the
    /// caller's behalf.
    async fn approve_erc1155(&self, operator: Address, gas_policy: GasPolicy) -> Result<TxReceipt>;

    /// Split `amount` of collateral into a complete set of outcome tokens
    /// for `condition_id`.
    async fn split_position(
        &self,
        condition_id: [u8; 32],
        amount: U256,
        gas_policy: GasPolicy,
    ) -> Result<TxReceipt>;

    /// Merge a complete set of outcome tokens for `condition_id` back into
    /// `amount` of collateral.
    async fn merge_positions(
        &self,
        condition_id: [u8; 32],
        amount: U256,
        gas_policy: GasPolicy,
    ) -> Result<TxReceipt>;

    /// Convert `amount` NO tokens across `k` outcomes per
    /// [`convert_positions_amounts`].
    async fn convert_positions(
        &self,
        condition_id: [u8; 32],
        amount: U256,
        outcome_count: u32,
        gas_policy: GasPolicy,
    ) -> Result<TxReceipt>;

    /// Redeem resolved outcome tokens for collateral.
    async fn redeem_positions(
        &self,
        condition_id: [u8; 32],
        index_sets: Vec<U256>,
        gas_policy: GasPolicy,
    ) -> Result<TxReceipt>;

    /// Block until `tx_hash`'s receipt is available or `timeout` elapses.
    async fn wait_for_receipt(&self, tx_hash: &str, timeout: std::time::Duration) -> Result<TxReceipt>;
}

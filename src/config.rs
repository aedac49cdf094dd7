//! Run configuration.
//!
//! `RunConfig` is a plain, `serde`-deserializable struct, loaded the way the
//! teacher's backtest configuration is loaded by its embedding binary — the
//! kernel itself never reads a file or an environment variable, it only
//! validates the struct handed to it once, at [`crate::kernel::Kernel::new`].

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub initial_cash: Amount,
    pub initial_asset: Amount,
    pub trading_fee_bps: i64,
    pub decay_rate_bps: i64,
    pub decay_interval_ticks: u64,
    pub max_actions_per_tick: u32,
    pub min_price: Amount,
    pub max_price: Amount,
    pub min_quantity: Amount,
}

impl RunConfig {
    /// Validate field invariants. Called exactly once, at kernel construction.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_price <= Amount::ZERO {
            return Err("min_price must be positive".to_string());
        }
        if self.max_price <= self.min_price {
            return Err("max_price must be greater than min_price".to_string());
        }
        if self.min_quantity <= Amount::ZERO {
            return Err("min_quantity must be positive".to_string());
        }
        if self.initial_cash.is_negative() {
            return Err("initial_cash must not be negative".to_string());
        }
        if self.initial_asset.is_negative() {
            return Err("initial_asset must not be negative".to_string());
        }
        if self.trading_fee_bps < 0 {
            return Err("trading_fee_bps must not be negative".to_string());
        }
        if self.decay_rate_bps < 0 {
            return Err("decay_rate_bps must not be negative".to_string());
        }
        if self.max_actions_per_tick == 0 {
            return Err("max_actions_per_tick must be positive".to_string());
        }
        Ok(())
    }
}

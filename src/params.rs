// Bitcoin Dev Kit
// Written in 2020 by Alekos Filini <alekos.filini@gmail.com>
//
// Copyright (c) 2020-2021 Bitcoin Dev Kit Developers
//
// This file is licensed under the Apache License, Version 2.0 <LICENSE-APACHE
// or http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your option.
// You may not use this file except in accordance with one or both of these
// licenses.

//! Selection parameters
//!
//! A [`CoinSelectionParams`] describes one selection problem: the pool, the target and the fee
//! environment described by a [`SelectionConfig`]. Building it attaches fees to every coin of the
//! pool, producing the [`OutputGroup`]s the algorithms work on. The caller's [`CoinGroup`]s are
//! never modified, so the same pool can be reused with different fee rates.

use std::convert::TryFrom;

use bitcoin::OutPoint;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Coin, CoinGroup, FeeRate, MAX_MONEY};

/// Convert a satoshi amount to a signed amount, saturating at `i64::MAX`
pub(crate) fn to_signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Fee environment of a selection
///
/// All sizes are expressed in vbytes, all rates in satoshi/vbyte.
///
/// ## Example
///
/// ```
/// # use bdk_coin_selection::*;
/// let config = SelectionConfig::from_json(
///     r#"{
///         "short_term_fee_rate": 5,
///         "long_term_fee_rate": 2,
///         "not_input_size": 41,
///         "change_output_size": 31,
///         "change_spend_size": 68
///     }"#,
/// )?;
/// assert_eq!(config.fixed_fee(), 205);
/// assert_eq!(config.cost_of_change(), 5 * 31 + 2 * 68);
/// # Ok::<(), bdk_coin_selection::Error>(())
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Fee rate the transaction being built will pay
    pub short_term_fee_rate: FeeRate,
    /// Estimate of the fee rate that will be paid to spend the change in the future
    pub long_term_fee_rate: FeeRate,
    /// Size of everything in the transaction that is not an input: header, recipient outputs
    pub not_input_size: u64,
    /// Size of the change output, if one is created
    pub change_output_size: u64,
    /// Size of the input that will later spend the change output
    pub change_spend_size: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig {
            short_term_fee_rate: FeeRate::default_min_relay_fee(),
            long_term_fee_rate: FeeRate::default_min_relay_fee(),
            // version (4) + in/out counts (2) + locktime (4) + one P2WPKH recipient (31)
            not_input_size: 10 + 31,
            // P2WPKH output: value (8 bytes) + script len (1 bytes) + script (22 bytes)
            change_output_size: 8 + 1 + 22,
            change_spend_size: 68,
        }
    }
}

impl SelectionConfig {
    /// Create a new config with the given fee rates and the default (P2WPKH) sizes
    pub fn new(short_term_fee_rate: FeeRate, long_term_fee_rate: FeeRate) -> Self {
        SelectionConfig {
            short_term_fee_rate,
            long_term_fee_rate,
            ..Default::default()
        }
    }

    /// Load and validate a config from its JSON representation
    ///
    /// Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: SelectionConfig = serde_json::from_str(json)?;
        config.validate()?;

        Ok(config)
    }

    /// Set the size of the non-input part of the transaction
    pub fn with_not_input_size(mut self, not_input_size: u64) -> Self {
        self.not_input_size = not_input_size;
        self
    }

    /// Set the size of the change output
    pub fn with_change_output_size(mut self, change_output_size: u64) -> Self {
        self.change_output_size = change_output_size;
        self
    }

    /// Set the size of the input that will spend the change output
    pub fn with_change_spend_size(mut self, change_spend_size: u64) -> Self {
        self.change_spend_size = change_spend_size;
        self
    }

    /// Check that every fee derived from this config fits in [`MAX_MONEY`]
    pub fn validate(&self) -> Result<(), Error> {
        let check = |name: &str, fee: Option<u64>| match fee {
            Some(fee) if fee <= MAX_MONEY => Ok(fee),
            _ => Err(Error::InvalidConfig(format!(
                "{} exceeds the maximum amount",
                name
            ))),
        };

        check(
            "fixed fee",
            self.short_term_fee_rate.checked_fee_vb(self.not_input_size),
        )?;
        let creating = check(
            "cost of creating change",
            self.short_term_fee_rate
                .checked_fee_vb(self.change_output_size),
        )?;
        let spending = check(
            "cost of spending change",
            self.long_term_fee_rate.checked_fee_vb(self.change_spend_size),
        )?;
        check("cost of change", creating.checked_add(spending))?;

        Ok(())
    }

    /// Fee paid for the non-input part of the transaction
    pub fn fixed_fee(&self) -> u64 {
        self.short_term_fee_rate.fee_vb(self.not_input_size)
    }

    /// Fee paid now to add a change output
    pub fn cost_of_creating_change(&self) -> u64 {
        self.short_term_fee_rate.fee_vb(self.change_output_size)
    }

    /// Fee that will be paid later to spend the change output
    pub fn cost_of_spending_change(&self) -> u64 {
        self.long_term_fee_rate.fee_vb(self.change_spend_size)
    }

    /// Total cost of having a change output
    pub fn cost_of_change(&self) -> u64 {
        self.cost_of_creating_change()
            .saturating_add(self.cost_of_spending_change())
    }
}

/// A [`Coin`] with the fees of spending it at a given pair of fee rates
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EffectiveCoin {
    coin: Coin,
    fee: u64,
    long_term_fee: u64,
    effective_value: i64,
}

impl EffectiveCoin {
    /// Attach fees to `coin`
    pub fn new(coin: Coin, short_term_fee_rate: FeeRate, long_term_fee_rate: FeeRate) -> Self {
        let fee = short_term_fee_rate.fee_vb(coin.input_size);
        let long_term_fee = long_term_fee_rate.fee_vb(coin.input_size);
        let effective_value = to_signed(coin.value).saturating_sub(to_signed(fee));

        EffectiveCoin {
            coin,
            fee,
            long_term_fee,
            effective_value,
        }
    }

    /// The underlying coin
    pub fn coin(&self) -> &Coin {
        &self.coin
    }

    /// Reference to the output being spent
    pub fn outpoint(&self) -> OutPoint {
        self.coin.outpoint
    }

    /// Nominal value
    pub fn value(&self) -> u64 {
        self.coin.value
    }

    /// Fee for spending the coin at the short term fee rate
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Fee for spending the coin at the long term fee rate
    pub fn long_term_fee(&self) -> u64 {
        self.long_term_fee
    }

    /// Value minus the fee for spending it, can be negative
    pub fn effective_value(&self) -> i64 {
        self.effective_value
    }

    /// Whether the coin is worth more than what it costs to spend it
    pub fn is_spendable(&self) -> bool {
        self.effective_value > 0
    }
}

/// A [`CoinGroup`] with fees attached to each of its coins
///
/// The fee aggregates only account for the coins with a positive effective value: the others
/// are kept in the group but never spent.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputGroup {
    tag: String,
    coins: Vec<EffectiveCoin>,
    value: u64,
    fee: u64,
    long_term_fee: u64,
    effective_value: i64,
}

impl OutputGroup {
    /// Attach fees to every coin of `group`
    pub fn new(
        group: &CoinGroup,
        short_term_fee_rate: FeeRate,
        long_term_fee_rate: FeeRate,
    ) -> Self {
        let coins: Vec<_> = group
            .coins
            .iter()
            .cloned()
            .map(|c| EffectiveCoin::new(c, short_term_fee_rate, long_term_fee_rate))
            .collect();

        let (fee, long_term_fee, effective_value) = coins
            .iter()
            .filter(|c| c.is_spendable())
            .fold((0u64, 0u64, 0i64), |(fee, long_term_fee, effective_value), c| {
                (
                    fee.saturating_add(c.fee),
                    long_term_fee.saturating_add(c.long_term_fee),
                    effective_value.saturating_add(c.effective_value),
                )
            });

        OutputGroup {
            tag: group.tag.clone(),
            value: group.value(),
            coins,
            fee,
            long_term_fee,
            effective_value,
        }
    }

    /// Spend-linkage tag of the group
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Every coin of the group, including the ones not worth spending
    pub fn coins(&self) -> &[EffectiveCoin] {
        &self.coins
    }

    /// Coins that are spent when the group is selected
    pub fn spendable_coins(&self) -> impl Iterator<Item = &EffectiveCoin> {
        self.coins.iter().filter(|c| c.is_spendable())
    }

    /// Nominal value of every coin of the group
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Short term fee of the spendable coins
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Long term fee of the spendable coins
    pub fn long_term_fee(&self) -> u64 {
        self.long_term_fee
    }

    /// Effective value of the spendable coins, never negative
    pub fn effective_value(&self) -> i64 {
        self.effective_value
    }

    /// What spending the group now costs compared to spending it at the long term fee rate
    pub fn waste(&self) -> i64 {
        to_signed(self.fee) - to_signed(self.long_term_fee)
    }
}

/// Everything needed to solve one selection problem
#[derive(Debug, Clone)]
pub struct CoinSelectionParams {
    utxo_pool: Vec<OutputGroup>,
    target: u64,
    config: SelectionConfig,
}

impl CoinSelectionParams {
    /// Build the parameters for paying `target` sats out of `pool` in the fee environment
    /// described by `config`
    pub fn new(pool: &[CoinGroup], target: u64, config: SelectionConfig) -> Self {
        let utxo_pool = pool
            .iter()
            .map(|g| OutputGroup::new(g, config.short_term_fee_rate, config.long_term_fee_rate))
            .collect();

        CoinSelectionParams {
            utxo_pool,
            target,
            config,
        }
    }

    /// The pool with fees attached, in the order it was given
    pub fn utxo_pool(&self) -> &[OutputGroup] {
        &self.utxo_pool
    }

    /// Groups with a positive effective value, the only ones worth selecting
    pub(crate) fn spendable_groups(&self) -> Vec<&OutputGroup> {
        self.utxo_pool
            .iter()
            .filter(|g| g.effective_value() > 0)
            .collect()
    }

    /// Amount to pay, excluding fees
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Fee environment of the selection
    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Fee paid for the non-input part of the transaction
    pub fn fixed_fee(&self) -> u64 {
        self.config.fixed_fee()
    }

    /// Effective value the selected inputs must reach: the target plus the fixed fee
    pub fn target_after_fees(&self) -> i64 {
        to_signed(self.target).saturating_add(to_signed(self.fixed_fee()))
    }

    /// Nominal value of the whole pool
    pub fn total_value(&self) -> u64 {
        self.utxo_pool
            .iter()
            .fold(0u64, |acc, g| acc.saturating_add(g.value()))
    }

    /// Effective value of the whole pool
    pub fn total_effective_value(&self) -> i64 {
        self.utxo_pool
            .iter()
            .fold(0i64, |acc, g| acc.saturating_add(g.effective_value()))
    }

    /// Fee paid now to add a change output
    pub fn cost_of_creating_change(&self) -> u64 {
        self.config.cost_of_creating_change()
    }

    /// Fee that will be paid later to spend the change output
    pub fn cost_of_spending_change(&self) -> u64 {
        self.config.cost_of_spending_change()
    }

    /// Total cost of having a change output
    pub fn cost_of_change(&self) -> u64 {
        self.config.cost_of_change()
    }
}

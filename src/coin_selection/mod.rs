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

//! Coin selection
//!
//! This module provides the trait [`CoinSelectionAlgorithm`] that can be implemented to
//! define custom coin selection algorithms, and three implementations of it:
//!
//! - [`BranchAndBoundCoinSelection`] searches for a changeless selection that minimizes waste
//! - [`KnapsackSolver`] approximates the smallest subset reaching the target
//! - [`SingleRandomDraw`] picks groups at random until the target is reached
//!
//! [`CoinSelector`] chains them in that order and is what [`select_coins`] uses.
//!
//! ## Example
//!
//! ```
//! # use std::str::FromStr;
//! # use bitcoin::OutPoint;
//! # use bdk_coin_selection::*;
//! #[derive(Debug)]
//! struct AlwaysSpendEverything;
//!
//! impl CoinSelectionAlgorithm for AlwaysSpendEverything {
//!     fn coin_select<R: rand::RngCore>(
//!         &self,
//!         params: &CoinSelectionParams,
//!         _: &mut R,
//!     ) -> Result<CoinSelection, Error> {
//!         let selection = CoinSelection::from_groups(params, params.utxo_pool());
//!         if selection.effective_value() < params.target_after_fees() {
//!             return Err(Error::InsufficientFundsAfterFees {
//!                 needed: params.target_after_fees(),
//!                 available: selection.effective_value(),
//!             });
//!         }
//!
//!         Ok(selection)
//!     }
//! }
//!
//! let outpoint = OutPoint::from_str(
//!     "ebd9813ecebc57ff8f30797de7c205e3c7498ca950ea4341ee51a685ff2fa30a:0",
//! )
//! .unwrap();
//! let pool = vec![CoinGroup::new("tb1qexample", vec![Coin::new(outpoint, 100_000, 68)])];
//! let params = CoinSelectionParams::new(&pool, 50_000, SelectionConfig::default());
//!
//! let selection = AlwaysSpendEverything.coin_select(&params, &mut rand::thread_rng())?;
//! assert_eq!(selection.selected().len(), 1);
//! # Ok::<(), bdk_coin_selection::Error>(())
//! ```

use bitcoin::OutPoint;
use log::{debug, error};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::params::{to_signed, CoinSelectionParams, EffectiveCoin, OutputGroup};
use crate::types::MAX_MONEY;

mod bnb;
mod knapsack;
mod single_random_draw;

pub use bnb::{BranchAndBoundCoinSelection, BNB_TOTAL_TRIES};
pub use knapsack::{KnapsackSolver, KNAPSACK_ITERATIONS};
pub use single_random_draw::SingleRandomDraw;

/// Default coin selection algorithm used by [`select_coins`]
pub type DefaultCoinSelectionAlgorithm = CoinSelector;

/// Outcome of a selection attempt
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionOutcome {
    /// Coins were selected
    Success,
    /// The nominal value of the pool is lower than the target
    InsufficientFunds,
    /// The pool can't pay for the target once fees are accounted for
    InsufficientFundsAfterFees,
    /// The algorithm could not find a selection
    AlgorithmFailure,
    /// The target is zero or above [`MAX_MONEY`]
    InvalidSpend,
}

/// Result of a coin selection
///
/// Failed selections carry no coins and have every amount set to zero.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    outcome: SelectionOutcome,
    target: u64,
    selected: Vec<EffectiveCoin>,
    value: u64,
    effective_value: i64,
    fee: u64,
    change_value: u64,
}

impl CoinSelection {
    /// Build a successful selection spending every spendable coin of `groups`
    pub fn from_groups<'a, I>(params: &CoinSelectionParams, groups: I) -> Self
    where
        I: IntoIterator<Item = &'a OutputGroup>,
    {
        let selected: Vec<EffectiveCoin> = groups
            .into_iter()
            .flat_map(|g| g.spendable_coins())
            .cloned()
            .collect();

        let value = selected
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.value()));
        let effective_value = selected
            .iter()
            .fold(0i64, |acc, c| acc.saturating_add(c.effective_value()));

        // fixed fee + (value - effective value)
        let fee = selected
            .iter()
            .fold(params.fixed_fee(), |acc, c| acc.saturating_add(c.fee()));

        // Change that costs more to create and spend than it's worth is left to the miners
        let excess = effective_value.saturating_sub(to_signed(params.target()));
        let change_value = if excess > to_signed(params.cost_of_change()) {
            excess as u64
        } else {
            0
        };

        CoinSelection {
            outcome: SelectionOutcome::Success,
            target: params.target(),
            selected,
            value,
            effective_value,
            fee,
            change_value,
        }
    }

    /// Build a failed selection
    pub fn failure(target: u64, outcome: SelectionOutcome) -> Self {
        CoinSelection {
            outcome,
            target,
            selected: vec![],
            value: 0,
            effective_value: 0,
            fee: 0,
            change_value: 0,
        }
    }

    /// Outcome of the selection
    pub fn outcome(&self) -> SelectionOutcome {
        self.outcome
    }

    /// Whether coins were selected
    pub fn is_success(&self) -> bool {
        self.outcome == SelectionOutcome::Success
    }

    /// Amount the selection pays, excluding fees
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Selected coins, flattened from the selected groups
    pub fn selected(&self) -> &[EffectiveCoin] {
        &self.selected
    }

    /// Outpoints of the selected coins
    pub fn outpoints(&self) -> Vec<OutPoint> {
        self.selected.iter().map(|c| c.outpoint()).collect()
    }

    /// Sum of the selected coins' value
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Sum of the selected coins' effective value
    pub fn effective_value(&self) -> i64 {
        self.effective_value
    }

    /// Total fee: the fixed fee plus the fee for every selected input
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Value left for a change output, zero if it wouldn't be worth creating one
    pub fn change_value(&self) -> u64 {
        self.change_value
    }
}

/// Trait for generalized coin selection algorithms
///
/// This trait can be implemented to plug a customized coin selection algorithm in place of the
/// default ones.
///
/// For an example see [this module](crate::coin_selection)'s documentation.
pub trait CoinSelectionAlgorithm: std::fmt::Debug {
    /// Perform the coin selection
    ///
    /// - `params`: the pool with fees attached, the target and the fee environment
    /// - `rand`: random number generator used by the randomized algorithms
    fn coin_select<R: RngCore>(
        &self,
        params: &CoinSelectionParams,
        rand: &mut R,
    ) -> Result<CoinSelection, Error>;
}

/// Check that the spend is sensible and that the pool can pay for it
pub fn check_spend(params: &CoinSelectionParams) -> Result<(), Error> {
    let target = params.target();
    if target == 0 || target > MAX_MONEY {
        return Err(Error::InvalidSpend { target });
    }

    let total_value = params.total_value();
    if total_value < target {
        return Err(Error::InsufficientFunds {
            needed: target,
            available: total_value,
        });
    }

    let total_effective_value = params.total_effective_value();
    if total_effective_value < params.target_after_fees() {
        return Err(Error::InsufficientFundsAfterFees {
            needed: params.target_after_fees(),
            available: total_effective_value,
        });
    }

    Ok(())
}

/// Try [`BranchAndBoundCoinSelection`], then [`KnapsackSolver`], then [`SingleRandomDraw`]
///
/// Each algorithm runs at most once, the first successful selection is returned.
#[derive(Debug, Clone, Default)]
pub struct CoinSelector {
    bnb: BranchAndBoundCoinSelection,
    knapsack: KnapsackSolver,
    fallback: SingleRandomDraw,
}

impl CoinSelector {
    /// Create a new instance with custom branch and bound and knapsack settings
    pub fn new(bnb: BranchAndBoundCoinSelection, knapsack: KnapsackSolver) -> Self {
        CoinSelector {
            bnb,
            knapsack,
            fallback: SingleRandomDraw,
        }
    }

    /// Select coins, reporting failures through the [`SelectionOutcome`] of the result
    pub fn select_coins<R: RngCore>(
        &self,
        params: &CoinSelectionParams,
        rand: &mut R,
    ) -> CoinSelection {
        match self.coin_select(params, rand) {
            Ok(selection) => selection,
            Err(e) => {
                debug!("Coin selection failed: {}", e);
                CoinSelection::failure(params.target(), e.outcome())
            }
        }
    }
}

impl CoinSelectionAlgorithm for CoinSelector {
    fn coin_select<R: RngCore>(
        &self,
        params: &CoinSelectionParams,
        rand: &mut R,
    ) -> Result<CoinSelection, Error> {
        debug!(
            "target = `{}`, fixed_fee = `{}`, cost_of_change = `{}`, pool size = `{}`",
            params.target(),
            params.fixed_fee(),
            params.cost_of_change(),
            params.utxo_pool().len()
        );

        check_spend(params)?;

        match self.bnb.coin_select(params, rand) {
            Ok(selection) => return Ok(selection),
            Err(e) => debug!("{}, falling back to the knapsack solver", e),
        }

        match self.knapsack.coin_select(params, rand) {
            Ok(selection) => return Ok(selection),
            Err(e) => debug!("{}, falling back to single random draw", e),
        }

        self.fallback.coin_select(params, rand).map_err(|e| {
            // The pool was checked to be able to pay for the target
            error!("Single random draw failed after the funds check: {}", e);
            e
        })
    }
}

/// Select coins for `params` with the [`DefaultCoinSelectionAlgorithm`]
pub fn select_coins(params: &CoinSelectionParams) -> CoinSelection {
    DefaultCoinSelectionAlgorithm::default().select_coins(params, &mut rand::thread_rng())
}

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

// only enables the `doc_cfg` feature when
// the `docsrs` configuration attribute is defined
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Waste-aware coin selection.
//!
//! Given a pool of coins, a payment target and a fee environment, this library decides which
//! coins pay for the transaction. Coins are organized in [`CoinGroup`]s of coins that are
//! publicly linked (e.g. received on the same address) and are always spent together.
//!
//! [`select_coins`] validates the request, checks that the pool can pay for it and then tries,
//! in order:
//!
//! 1. [`BranchAndBoundCoinSelection`], looking for a selection that doesn't need a change
//!    output and wastes as little as possible
//! 2. [`KnapsackSolver`], a randomized approximation of the smallest sufficient subset
//! 3. [`SingleRandomDraw`], which picks groups at random until the target is reached
//!
//! ## Example
//!
//! ```
//! use std::str::FromStr;
//!
//! use bdk_coin_selection::bitcoin::OutPoint;
//! use bdk_coin_selection::*;
//!
//! let outpoint = |vout| {
//!     OutPoint::from_str(&format!(
//!         "ebd9813ecebc57ff8f30797de7c205e3c7498ca950ea4341ee51a685ff2fa30a:{}",
//!         vout
//!     ))
//!     .unwrap()
//! };
//!
//! let pool = vec![
//!     CoinGroup::new("bc1qaddress0", vec![Coin::new(outpoint(0), 2 * CENT, 68)]),
//!     CoinGroup::new(
//!         "bc1qaddress1",
//!         vec![
//!             Coin::new(outpoint(1), 3 * CENT, 68),
//!             Coin::new(outpoint(2), CENT, 68),
//!         ],
//!     ),
//! ];
//! let config = SelectionConfig::new(FeeRate::from_sat_per_vb(5), FeeRate::from_sat_per_vb(2));
//! let params = CoinSelectionParams::new(&pool, 3 * CENT, config);
//!
//! let selection = select_coins(&params);
//! assert_eq!(selection.outcome(), SelectionOutcome::Success);
//! assert!(selection.effective_value() >= params.target_after_fees());
//! for coin in selection.selected() {
//!     println!("spending {} ({} sat)", coin.outpoint(), coin.value());
//! }
//! ```

pub extern crate bitcoin;
extern crate log;
extern crate rand;
extern crate serde;
extern crate serde_json;

pub(crate) mod error;
pub(crate) mod params;
pub(crate) mod types;

pub mod coin_selection;

#[cfg(test)]
pub(crate) mod testutils;

pub use coin_selection::{
    select_coins, BranchAndBoundCoinSelection, CoinSelection, CoinSelectionAlgorithm,
    CoinSelector, KnapsackSolver, SelectionOutcome, SingleRandomDraw,
};
pub use error::Error;
pub use params::{CoinSelectionParams, EffectiveCoin, OutputGroup, SelectionConfig};
pub use types::*;

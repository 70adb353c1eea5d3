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

use bitcoin::OutPoint;

use serde::{Deserialize, Serialize};

/// Number of satoshi in one bitcoin
pub const COIN: u64 = 100_000_000;
/// Number of satoshi in one hundredth of a bitcoin
pub const CENT: u64 = 1_000_000;
/// Largest amount a selection can target
pub const MAX_MONEY: u64 = 21_000_000 * COIN;
/// Smallest change the knapsack solver considers worth creating
pub const MIN_CHANGE: u64 = CENT;

/// Fee rate
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
// Internally stored as satoshi/vbyte
pub struct FeeRate(u64);

impl FeeRate {
    /// Create a new instance of [`FeeRate`] given an integer fee rate in satoshi/vbyte
    pub const fn from_sat_per_vb(sat_per_vb: u64) -> Self {
        FeeRate(sat_per_vb)
    }

    /// Create a new [`FeeRate`] with the default min relay fee value
    pub const fn default_min_relay_fee() -> Self {
        FeeRate(1)
    }

    /// A zero fee rate, mostly useful to reason about nominal values only
    pub const fn zero() -> Self {
        FeeRate(0)
    }

    /// Return the value as satoshi/vbyte
    pub fn as_sat_vb(&self) -> u64 {
        self.0
    }

    /// Fee in satoshi for `vbytes` of transaction data at this rate, `None` on overflow
    pub fn checked_fee_vb(&self, vbytes: u64) -> Option<u64> {
        self.0.checked_mul(vbytes)
    }

    /// Fee in satoshi for `vbytes` of transaction data at this rate, saturating on overflow
    pub fn fee_vb(&self, vbytes: u64) -> u64 {
        self.0.saturating_mul(vbytes)
    }
}

impl std::default::Default for FeeRate {
    fn default() -> Self {
        FeeRate::default_min_relay_fee()
    }
}

/// A spendable output together with the size it adds to a transaction once spent
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coin {
    /// Reference to the output being spent
    pub outpoint: OutPoint,
    /// Value in satoshi
    pub value: u64,
    /// Size in vbytes of the fully signed input spending this coin
    pub input_size: u64,
}

impl Coin {
    /// Create a new coin
    pub fn new(outpoint: OutPoint, value: u64, input_size: u64) -> Self {
        Coin {
            outpoint,
            value,
            input_size,
        }
    }
}

/// Coins that are publicly linked together, usually because they were received on the same
/// address.
///
/// Spending one of them reveals the link, so a group is always spent as a whole. This costs some
/// extra fees compared to selecting coins one by one, in exchange for privacy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CoinGroup {
    /// Spend-linkage tag shared by every coin of the group (e.g. the receiving address)
    pub tag: String,
    /// Coins of the group, in insertion order
    pub coins: Vec<Coin>,
}

impl CoinGroup {
    /// Create a new group from a tag and its coins
    pub fn new<T: Into<String>>(tag: T, coins: Vec<Coin>) -> Self {
        CoinGroup {
            tag: tag.into(),
            coins,
        }
    }

    /// Append a coin to the group
    pub fn insert(&mut self, coin: Coin) {
        self.coins.push(coin);
    }

    /// Sum of the nominal values of every coin in the group, saturating at `u64::MAX`
    pub fn value(&self) -> u64 {
        self.coins
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(c.value))
    }
}

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

//! Helpers shared by the unit tests

use std::str::FromStr;

use bitcoin::OutPoint;
use rand::Rng;

use crate::coin_selection::CoinSelection;
use crate::params::{CoinSelectionParams, SelectionConfig};
use crate::types::{Coin, CoinGroup, FeeRate};

/// Size of the inputs created by [`coin`]
pub const INPUT_SIZE: u64 = 100;

pub fn outpoint(index: u32) -> OutPoint {
    OutPoint::from_str(&format!("{:064x}:0", index)).unwrap()
}

pub fn coin(value: u64, index: u32) -> Coin {
    Coin::new(outpoint(index), value, INPUT_SIZE)
}

/// One single-coin group per value
pub fn generate_utxo_pool(values: &[u64]) -> Vec<CoinGroup> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| CoinGroup::new(format!("group{}", i), vec![coin(*value, i as u32)]))
        .collect()
}

pub fn generate_random_utxos<R: Rng>(rng: &mut R, count: usize) -> Vec<CoinGroup> {
    (0..count)
        .map(|i| {
            CoinGroup::new(
                format!("group{}", i),
                vec![coin(rng.gen_range(10_000, 2_000_000), i as u32)],
            )
        })
        .collect()
}

/// Parameters where spending a coin costs nothing, so effective values equal values, and the
/// cost of change is exactly `cost_of_change`
pub fn fee_free_params(values: &[u64], target: u64, cost_of_change: u64) -> CoinSelectionParams {
    let pool: Vec<_> = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            CoinGroup::new(
                format!("group{}", i),
                vec![Coin::new(outpoint(i as u32), *value, 0)],
            )
        })
        .collect();
    let config = SelectionConfig::new(FeeRate::from_sat_per_vb(1), FeeRate::from_sat_per_vb(1))
        .with_not_input_size(0)
        .with_change_output_size(cost_of_change)
        .with_change_spend_size(0);

    CoinSelectionParams::new(&pool, target, config)
}

/// Pairs of coins where only one coin of each pair can be used to reach the target, which makes
/// the branch and bound search explore most of the tree
pub fn make_hard_case(pairs: u32) -> (Vec<u64>, u64) {
    let mut values = Vec::new();
    let mut target = 0;
    for i in 0..pairs {
        target += 1u64 << (pairs + i);
        values.push(1u64 << (pairs + i));
        values.push((1u64 << (pairs + i)) + (1u64 << (pairs - 1 - i)));
    }

    (values, target)
}

pub fn sorted_outpoints(selection: &CoinSelection) -> Vec<OutPoint> {
    let mut outpoints = selection.outpoints();
    outpoints.sort();
    outpoints
}

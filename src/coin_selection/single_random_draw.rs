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

use rand::seq::SliceRandom;
use rand::RngCore;

use super::{CoinSelection, CoinSelectionAlgorithm};
use crate::error::Error;
use crate::params::CoinSelectionParams;

/// Pull groups at random until we have enough to meet the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleRandomDraw;

impl CoinSelectionAlgorithm for SingleRandomDraw {
    fn coin_select<R: RngCore>(
        &self,
        params: &CoinSelectionParams,
        rand: &mut R,
    ) -> Result<CoinSelection, Error> {
        let target_amount = params.target_after_fees();

        let mut pool = params.spendable_groups();
        pool.shuffle(rand);

        let mut selected_amount: i64 = 0;
        let mut selected = Vec::new();
        for group in pool {
            selected_amount = selected_amount.saturating_add(group.effective_value());
            selected.push(group);

            if selected_amount >= target_amount {
                return Ok(CoinSelection::from_groups(params, selected));
            }
        }

        Err(Error::RandomDrawExhausted)
    }
}

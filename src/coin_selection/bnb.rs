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

use std::cmp::Reverse;

use log::{debug, trace};
use rand::RngCore;

use super::{CoinSelection, CoinSelectionAlgorithm};
use crate::error::Error;
use crate::params::{to_signed, CoinSelectionParams, OutputGroup};

/// Default maximum number of steps the branch and bound search is allowed to take
pub const BNB_TOTAL_TRIES: usize = 100_000;

/// Branch and bound coin selection
///
/// Searches for the selection with the lowest waste among the ones whose effective value lands
/// between the target and the target plus the cost of change, i.e. the ones that don't need a
/// change output. Waste is what the selected inputs pay now on top of what they would pay at the
/// long term fee rate, plus the excess over the target that ends up going to the miners.
///
/// Code adapted from Bitcoin Core's implementation and from Mark Erhardt Master's Thesis: <http://murch.one/wp-content/uploads/2016/11/erhardt2016coinselection.pdf>
#[derive(Debug, Clone, Copy)]
pub struct BranchAndBoundCoinSelection {
    total_tries: usize,
}

impl Default for BranchAndBoundCoinSelection {
    fn default() -> Self {
        BranchAndBoundCoinSelection {
            total_tries: BNB_TOTAL_TRIES,
        }
    }
}

impl BranchAndBoundCoinSelection {
    /// Create new instance with a custom limit on the number of steps
    pub fn new(total_tries: usize) -> Self {
        BranchAndBoundCoinSelection { total_tries }
    }
}

impl CoinSelectionAlgorithm for BranchAndBoundCoinSelection {
    fn coin_select<R: RngCore>(
        &self,
        params: &CoinSelectionParams,
        _: &mut R,
    ) -> Result<CoinSelection, Error> {
        let mut pool = params.spendable_groups();
        // Largest first exploration, the sort is stable so ties keep the pool order
        pool.sort_by_key(|g| Reverse(g.effective_value()));

        let selected = self.bnb(
            &pool,
            params.target_after_fees(),
            to_signed(params.cost_of_change()),
        )?;

        Ok(CoinSelection::from_groups(params, selected))
    }
}

impl BranchAndBoundCoinSelection {
    // `pool` must be sorted by descending effective value
    fn bnb<'a>(
        &self,
        pool: &[&'a OutputGroup],
        target_amount: i64,
        cost_of_change: i64,
    ) -> Result<Vec<&'a OutputGroup>, Error> {
        // current_selection[i] will contain true if we are using pool[i], false otherwise. Note
        // that current_selection.len() could be less than pool.len(), it just means that we
        // still haven't decided if we should keep certain groups or not.
        let mut current_selection: Vec<bool> = Vec::with_capacity(pool.len());

        let mut curr_value: i64 = 0;
        let mut curr_available_value: i64 = pool
            .iter()
            .fold(0i64, |acc, g| acc.saturating_add(g.effective_value()));
        let mut curr_waste: i64 = 0;

        let upper_bound = target_amount.saturating_add(cost_of_change);

        // Contains the best selection we found
        let mut best_selection: Option<Vec<bool>> = None;
        let mut best_waste = i64::MAX;

        let mut exhausted = false;
        let mut tries = 0;

        // Depth first search loop for choosing the groups
        while tries < self.total_tries {
            tries += 1;

            // Conditions for starting a backtrack
            let mut backtrack = false;
            // Cannot possibly reach target with the amount remaining in curr_available_value,
            // the selected value is out of range, or adding the next group can only make the
            // waste worse than the best selection's.
            if curr_value.saturating_add(curr_available_value) < target_amount
                || curr_value > upper_bound
                || (curr_waste > best_waste
                    && pool
                        .get(current_selection.len())
                        .map_or(false, |g| g.waste() > 0))
            {
                backtrack = true;
            } else if curr_value >= target_amount {
                // Selected value is within range, there's no point in going forward. Start
                // backtracking
                backtrack = true;

                let waste = curr_waste + (curr_value - target_amount);
                if waste <= best_waste {
                    trace!("New best selection: value `{}`, waste `{}`", curr_value, waste);
                    best_selection = Some(current_selection.clone());
                    best_waste = waste;

                    // Can't do better than a perfect match
                    if waste == 0 {
                        break;
                    }
                }
            }

            if backtrack {
                // Walk backwards to find the last included group that still needs to have its
                // omission branch traversed.
                while let Some(false) = current_selection.last() {
                    current_selection.pop();
                    curr_available_value += pool[current_selection.len()].effective_value();
                }

                match current_selection.last_mut() {
                    // We have walked back to the first group and no branch is untraversed. All
                    // solutions searched.
                    None => {
                        exhausted = true;
                        break;
                    }
                    // Group was included on previous iterations, try excluding now.
                    Some(c) => *c = false,
                }

                let group = pool[current_selection.len() - 1];
                curr_value -= group.effective_value();
                curr_waste -= group.waste();
            } else {
                // Moving forwards, continuing down this branch
                let index = current_selection.len();
                let group = pool[index];

                // Remove this group from the curr_available_value amount
                curr_available_value -= group.effective_value();

                // Including this group would explore the same selections as including the
                // previous one, which was just excluded
                let symmetric = index > 0
                    && !current_selection[index - 1]
                    && pool[index - 1].effective_value() == group.effective_value()
                    && pool[index - 1].fee() == group.fee();

                if symmetric {
                    current_selection.push(false);
                } else {
                    // Inclusion branch first (Largest First Exploration)
                    current_selection.push(true);
                    curr_value += group.effective_value();
                    curr_waste += group.waste();
                }
            }
        }

        debug!(
            "BnB search stopped after {} tries, exhausted: {}",
            tries, exhausted
        );

        let best_selection = match best_selection {
            Some(best_selection) => best_selection,
            None if exhausted => return Err(Error::BnBNoExactMatch),
            None => return Err(Error::BnBTotalTriesExceeded),
        };

        Ok(pool
            .iter()
            .zip(best_selection)
            .filter_map(|(group, is_in_best)| if is_in_best { Some(*group) } else { None })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::params::SelectionConfig;
    use crate::testutils::*;
    use crate::types::{Coin, CoinGroup, FeeRate, CENT};

    fn sorted_effective_values(selection: &CoinSelection) -> Vec<i64> {
        let mut values: Vec<_> = selection
            .selected()
            .iter()
            .map(|c| c.effective_value())
            .collect();
        values.sort_unstable();
        values
    }

    #[test]
    fn test_bnb_exact_match() {
        let _ = env_logger::try_init();
        let params = fee_free_params(&[CENT, 2 * CENT, 3 * CENT, 4 * CENT], 2 * CENT, CENT / 2);

        let result = BranchAndBoundCoinSelection::default()
            .coin_select(&params, &mut rand::thread_rng())
            .unwrap();

        assert_eq!(result.selected().len(), 1);
        assert_eq!(result.effective_value(), 2 * CENT as i64);
        assert_eq!(result.change_value(), 0);
    }

    #[test]
    fn test_bnb_multiple_coins_exact_match() {
        let params = fee_free_params(
            &[CENT, 2 * CENT, 3 * CENT, 4 * CENT, 5 * CENT],
            10 * CENT,
            CENT / 2,
        );

        let result = BranchAndBoundCoinSelection::default()
            .coin_select(&params, &mut rand::thread_rng())
            .unwrap();

        assert_eq!(
            sorted_effective_values(&result),
            vec![CENT as i64, 4 * CENT as i64, 5 * CENT as i64]
        );
        assert_eq!(result.change_value(), 0);
    }

    #[test]
    fn test_bnb_within_cost_of_change() {
        // 1 + 2 + 3 + 4 = 10, the closest we can get to 9.5 without going over 10
        let params = fee_free_params(
            &[CENT, 2 * CENT, 3 * CENT, 4 * CENT],
            9 * CENT + CENT / 2,
            CENT / 2,
        );

        let result = BranchAndBoundCoinSelection::default()
            .coin_select(&params, &mut rand::thread_rng())
            .unwrap();

        assert_eq!(result.effective_value(), 10 * CENT as i64);
        assert_eq!(result.change_value(), 0);
    }

    #[test]
    fn test_bnb_no_exact_match() {
        let mut rng = rand::thread_rng();

        // Every coin is larger than the target plus the cost of change
        let params = fee_free_params(&[CENT, 2 * CENT, 3 * CENT, 4 * CENT], CENT / 4, CENT / 2);
        assert!(matches!(
            BranchAndBoundCoinSelection::default().coin_select(&params, &mut rng),
            Err(Error::BnBNoExactMatch)
        ));

        // The whole pool is not enough
        let params = fee_free_params(&[CENT, 2 * CENT, 3 * CENT, 4 * CENT], 11 * CENT, CENT / 2);
        assert!(matches!(
            BranchAndBoundCoinSelection::default().coin_select(&params, &mut rng),
            Err(Error::BnBNoExactMatch)
        ));

        let values: Vec<u64> = (5..=20).map(|v| v * CENT).collect();
        let params = fee_free_params(&values, CENT, 2 * CENT);
        assert!(matches!(
            BranchAndBoundCoinSelection::default().coin_select(&params, &mut rng),
            Err(Error::BnBNoExactMatch)
        ));
    }

    #[test]
    fn test_bnb_empty_pool() {
        let params = fee_free_params(&[], CENT, 0);
        assert!(matches!(
            BranchAndBoundCoinSelection::default().coin_select(&params, &mut rand::thread_rng()),
            Err(Error::BnBNoExactMatch)
        ));
    }

    #[test]
    fn test_bnb_total_tries_exceeded() {
        let (values, target) = make_hard_case(17);
        let params = fee_free_params(&values, target, 0);
        assert!(matches!(
            BranchAndBoundCoinSelection::default().coin_select(&params, &mut rand::thread_rng()),
            Err(Error::BnBTotalTriesExceeded)
        ));

        let (values, target) = make_hard_case(14);
        let params = fee_free_params(&values, target, 0);
        let result = BranchAndBoundCoinSelection::default()
            .coin_select(&params, &mut rand::thread_rng())
            .unwrap();
        assert_eq!(result.effective_value(), target as i64);
    }

    #[test]
    fn test_bnb_custom_total_tries() {
        let params = fee_free_params(&[CENT, 2 * CENT, 3 * CENT, 4 * CENT], 2 * CENT, CENT / 2);
        assert!(matches!(
            BranchAndBoundCoinSelection::new(0).coin_select(&params, &mut rand::thread_rng()),
            Err(Error::BnBTotalTriesExceeded)
        ));
    }

    #[test]
    fn test_bnb_does_not_bail_out_early() {
        let mut values = vec![2 * CENT, 7 * CENT, 7 * CENT, 7 * CENT, 7 * CENT];
        values.extend(std::iter::repeat(5 * CENT).take(50_000));
        let params = fee_free_params(&values, 30 * CENT, 5_000);

        let result = BranchAndBoundCoinSelection::default()
            .coin_select(&params, &mut rand::thread_rng())
            .unwrap();

        assert_eq!(result.selected().len(), 5);
        assert_eq!(result.effective_value(), 30 * CENT as i64);
    }

    #[test]
    fn test_bnb_prefers_less_waste_when_fees_are_high() {
        // Every input costs 1000 sat now and 100 sat in the long term: fewer inputs are better
        let config = SelectionConfig::new(FeeRate::from_sat_per_vb(10), FeeRate::from_sat_per_vb(1))
            .with_not_input_size(0)
            .with_change_output_size(100)
            .with_change_spend_size(0);
        let pool = vec![
            CoinGroup::new("a", vec![Coin::new(outpoint(0), 1_001_500, 100)]),
            CoinGroup::new("b", vec![Coin::new(outpoint(1), 601_000, 100)]),
            CoinGroup::new("c", vec![Coin::new(outpoint(2), 401_000, 100)]),
        ];
        let params = CoinSelectionParams::new(&pool, 1_000_000, config);

        let result = BranchAndBoundCoinSelection::default()
            .coin_select(&params, &mut rand::thread_rng())
            .unwrap();

        assert_eq!(result.outpoints(), vec![outpoint(0)]);
        assert_eq!(result.fee(), 1_000);
    }

    #[test]
    fn test_bnb_prefers_more_inputs_when_fees_are_low() {
        // Every input costs 100 sat now and 1000 sat in the long term: consolidating is better
        let config = SelectionConfig::new(FeeRate::from_sat_per_vb(1), FeeRate::from_sat_per_vb(10))
            .with_not_input_size(0)
            .with_change_output_size(1_000)
            .with_change_spend_size(0);
        let pool = vec![
            CoinGroup::new("a", vec![Coin::new(outpoint(0), 1_000_600, 100)]),
            CoinGroup::new("b", vec![Coin::new(outpoint(1), 600_100, 100)]),
            CoinGroup::new("c", vec![Coin::new(outpoint(2), 400_100, 100)]),
        ];
        let params = CoinSelectionParams::new(&pool, 1_000_000, config);

        let result = BranchAndBoundCoinSelection::default()
            .coin_select(&params, &mut rand::thread_rng())
            .unwrap();

        let mut outpoints = result.outpoints();
        outpoints.sort();
        let mut expected = vec![outpoint(1), outpoint(2)];
        expected.sort();
        assert_eq!(outpoints, expected);
        assert_eq!(result.effective_value(), 1_000_000);
    }

    #[test]
    fn test_bnb_result_stays_within_window() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = generate_random_utxos(&mut rng, 50);
        let config = SelectionConfig::new(FeeRate::from_sat_per_vb(5), FeeRate::from_sat_per_vb(2));
        let target = pool.iter().map(|g| g.value()).sum::<u64>() / 3;
        let params = CoinSelectionParams::new(&pool, target, config);

        let result = BranchAndBoundCoinSelection::default()
            .coin_select(&params, &mut rng)
            .unwrap();
        assert!(result.effective_value() >= params.target_after_fees());
        assert!(
            result.effective_value() <= params.target_after_fees() + params.cost_of_change() as i64
        );
    }
}

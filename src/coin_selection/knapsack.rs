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

use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::{CoinSelection, CoinSelectionAlgorithm};
use crate::error::Error;
use crate::params::{to_signed, CoinSelectionParams, OutputGroup};
use crate::types::MIN_CHANGE;

/// Default number of randomized trials of the subset sum approximation
pub const KNAPSACK_ITERATIONS: usize = 1000;

/// Knapsack solver
///
/// Approximates the smallest subset of the groups below `target + MIN_CHANGE` that reaches the
/// target by running randomized trials, and compares it with the smallest group that is large
/// enough on its own.
#[derive(Debug, Clone, Copy)]
pub struct KnapsackSolver {
    iterations: usize,
}

impl Default for KnapsackSolver {
    fn default() -> Self {
        KnapsackSolver {
            iterations: KNAPSACK_ITERATIONS,
        }
    }
}

impl KnapsackSolver {
    /// Create new instance with a custom number of trials
    pub fn new(iterations: usize) -> Self {
        KnapsackSolver { iterations }
    }
}

impl CoinSelectionAlgorithm for KnapsackSolver {
    fn coin_select<R: RngCore>(
        &self,
        params: &CoinSelectionParams,
        rand: &mut R,
    ) -> Result<CoinSelection, Error> {
        let target_amount = params.target_after_fees();
        let min_change = to_signed(MIN_CHANGE);

        let mut pool = params.spendable_groups();
        pool.shuffle(rand);

        // Smallest group larger than `target_amount + MIN_CHANGE`
        let mut lowest_larger: Option<&OutputGroup> = None;
        let mut applicable_groups = Vec::new();
        let mut total_lower: i64 = 0;

        for group in pool {
            if group.effective_value() == target_amount {
                debug!("Knapsack: exact match");
                return Ok(CoinSelection::from_groups(params, vec![group]));
            } else if group.effective_value() < target_amount.saturating_add(min_change) {
                applicable_groups.push(group);
                total_lower = total_lower.saturating_add(group.effective_value());
            } else if lowest_larger.map_or(true, |l| group.effective_value() < l.effective_value())
            {
                lowest_larger = Some(group);
            }
        }

        if total_lower == target_amount {
            return Ok(CoinSelection::from_groups(params, applicable_groups));
        }

        if total_lower < target_amount {
            return match lowest_larger {
                Some(group) => Ok(CoinSelection::from_groups(params, vec![group])),
                None => Err(Error::KnapsackNoSolution),
            };
        }

        // Solve subset sum by stochastic approximation
        let (mut best_selection, mut best_value) =
            self.approximate_best_subset(&applicable_groups, target_amount, total_lower, rand);
        if best_value != target_amount && total_lower >= target_amount.saturating_add(min_change) {
            let (selection, value) = self.approximate_best_subset(
                &applicable_groups,
                target_amount.saturating_add(min_change),
                total_lower,
                rand,
            );
            best_selection = selection;
            best_value = value;
        }

        // If we have a bigger group and (either the stochastic approximation didn't find a good
        // solution, or the next bigger group is closer), return the bigger group
        if let Some(group) = lowest_larger {
            let dust_change = best_value != target_amount
                && best_value < target_amount.saturating_add(min_change);
            if dust_change || group.effective_value() <= best_value {
                debug!("Knapsack: picking the lowest larger group");
                return Ok(CoinSelection::from_groups(params, vec![group]));
            }
        }

        debug!(
            "Knapsack: approximation selected {} groups, effective value `{}`",
            best_selection.iter().filter(|included| **included).count(),
            best_value
        );

        Ok(CoinSelection::from_groups(
            params,
            applicable_groups
                .into_iter()
                .zip(best_selection)
                .filter_map(|(group, included)| if included { Some(group) } else { None }),
        ))
    }
}

impl KnapsackSolver {
    // Returns the inclusion vector of the lowest sum found that reaches `target_amount`, and that
    // sum. Starts from the whole set, which reaches `target_amount` when `total_lower` does.
    fn approximate_best_subset<R: RngCore>(
        &self,
        groups: &[&OutputGroup],
        target_amount: i64,
        total_lower: i64,
        rand: &mut R,
    ) -> (Vec<bool>, i64) {
        let mut best_selection = vec![true; groups.len()];
        let mut best_value = total_lower;

        for _ in 0..self.iterations {
            if best_value == target_amount {
                break;
            }

            let mut included = vec![false; groups.len()];
            let mut total_value: i64 = 0;
            let mut reached_target = false;

            for pass in 0..2 {
                if reached_target {
                    break;
                }

                for (i, group) in groups.iter().enumerate() {
                    // The randomness only prevents degenerate behavior on some pools, and makes
                    // the selection harder to fingerprint
                    let include = if pass == 0 {
                        rand.gen_bool(0.5)
                    } else {
                        !included[i]
                    };
                    if !include {
                        continue;
                    }

                    total_value += group.effective_value();
                    included[i] = true;
                    if total_value >= target_amount {
                        reached_target = true;
                        if total_value < best_value {
                            best_value = total_value;
                            best_selection.clone_from(&included);
                        }
                        total_value -= group.effective_value();
                        included[i] = false;
                    }
                }
            }
        }

        (best_selection, best_value)
    }
}

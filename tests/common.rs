#![allow(unused)]
use std::str::FromStr;

use bdk_coin_selection::bitcoin::OutPoint;
use bdk_coin_selection::{
    Coin, CoinGroup, CoinSelection, CoinSelectionParams, FeeRate, SelectionConfig,
};

pub fn outpoint(index: u32) -> OutPoint {
    OutPoint::from_str(&format!("{:064x}:{}", index, index % 4)).unwrap()
}

/// Return a pool with one single-coin group per value, every input being `input_size` vbytes.
pub fn get_pool(values: &[u64], input_size: u64) -> Vec<CoinGroup> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            CoinGroup::new(
                format!("bcrt1qgroup{}", i),
                vec![Coin::new(outpoint(i as u32), *value, input_size)],
            )
        })
        .collect()
}

/// Return parameters where inputs cost nothing to spend and a change output costs
/// `cost_of_change`.
pub fn get_fee_free_params(
    values: &[u64],
    target: u64,
    cost_of_change: u64,
) -> CoinSelectionParams {
    let config = SelectionConfig::new(FeeRate::from_sat_per_vb(1), FeeRate::from_sat_per_vb(1))
        .with_not_input_size(0)
        .with_change_output_size(cost_of_change)
        .with_change_spend_size(0);

    CoinSelectionParams::new(&get_pool(values, 0), target, config)
}

/// Check the properties every successful selection has.
pub fn assert_valid_selection(params: &CoinSelectionParams, selection: &CoinSelection) {
    assert!(selection.is_success());
    assert!(selection.effective_value() >= params.target_after_fees());
    assert_eq!(
        selection.fee() as i64,
        params.fixed_fee() as i64 + selection.value() as i64 - selection.effective_value()
    );
    assert!(
        selection.change_value() == 0 || selection.change_value() > params.cost_of_change()
    );
    if selection.change_value() > 0 {
        assert_eq!(
            selection.change_value() as i64,
            selection.effective_value() - params.target() as i64
        );
    }
}

pub fn sorted_outpoints(selection: &CoinSelection) -> Vec<OutPoint> {
    let mut outpoints = selection.outpoints();
    outpoints.sort();
    outpoints
}

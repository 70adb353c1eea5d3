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

use std::fmt;

use crate::coin_selection::SelectionOutcome;

/// Errors that can be thrown while selecting coins or loading a [`SelectionConfig`]
///
/// [`SelectionConfig`]: crate::SelectionConfig
#[derive(Debug)]
pub enum Error {
    /// The target is zero or above [`MAX_MONEY`](crate::MAX_MONEY)
    InvalidSpend {
        /// Requested target, in satoshi
        target: u64,
    },
    /// The nominal value of the pool is not enough to cover the target
    InsufficientFunds {
        /// Sats needed for the payment
        needed: u64,
        /// Sats available in the pool
        available: u64,
    },
    /// The pool covers the target, but not once the cost of spending each input and the fixed
    /// part of the transaction is paid for
    InsufficientFundsAfterFees {
        /// Sats of effective value needed (target plus fixed fee)
        needed: i64,
        /// Sats of effective value available in the pool
        available: i64,
    },
    /// Branch and bound coin selection tries to avoid needing a change by finding the right inputs
    /// for the desired outputs plus fee, if there is not such combination this error is thrown
    BnBNoExactMatch,
    /// Branch and bound coin selection possible attempts with sufficiently big UTXO set could grow
    /// exponentially, thus a limit is set, and when hit, this error is thrown
    BnBTotalTriesExceeded,
    /// The knapsack solver could not find any subset, nor a single larger group, reaching the
    /// target
    KnapsackNoSolution,
    /// Single random draw went through the whole pool without reaching the target
    RandomDrawExhausted,
    /// The selection config is not usable
    InvalidConfig(String),
    /// Error serializing or deserializing JSON data
    Json(serde_json::Error),
}

impl Error {
    /// Map the error onto the [`SelectionOutcome`] reported by a failed selection
    ///
    /// Errors that are not produced by a selection map to [`SelectionOutcome::InvalidSpend`].
    pub fn outcome(&self) -> SelectionOutcome {
        match self {
            Error::InsufficientFunds { .. } => SelectionOutcome::InsufficientFunds,
            Error::InsufficientFundsAfterFees { .. } => {
                SelectionOutcome::InsufficientFundsAfterFees
            }
            Error::BnBNoExactMatch
            | Error::BnBTotalTriesExceeded
            | Error::KnapsackNoSolution
            | Error::RandomDrawExhausted => SelectionOutcome::AlgorithmFailure,
            Error::InvalidSpend { .. } | Error::InvalidConfig(_) | Error::Json(_) => {
                SelectionOutcome::InvalidSpend
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpend { target } => write!(f, "Invalid spend: target of {} sat", target),
            Self::InsufficientFunds { needed, available } => write!(
                f,
                "Insufficient funds: {} sat available of {} sat needed",
                available, needed
            ),
            Self::InsufficientFundsAfterFees { needed, available } => write!(
                f,
                "Insufficient funds after fees: {} sat available of {} sat needed",
                available, needed
            ),
            Self::BnBNoExactMatch => write!(f, "Branch and bound coin selection: not exact match"),
            Self::BnBTotalTriesExceeded => {
                write!(f, "Branch and bound coin selection: total tries exceeded")
            }
            Self::KnapsackNoSolution => {
                write!(f, "Knapsack solver: no selection reaches the target")
            }
            Self::RandomDrawExhausted => {
                write!(f, "Single random draw: pool exhausted before reaching the target")
            }
            Self::InvalidConfig(err) => write!(f, "Invalid selection config: {}", err),
            Self::Json(err) => write!(f, "Serialize/Deserialize JSON error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

macro_rules! impl_error {
    ( $from:ty, $to:ident ) => {
        impl_error!($from, $to, Error);
    };
    ( $from:ty, $to:ident, $impl_for:ty ) => {
        impl std::convert::From<$from> for $impl_for {
            fn from(err: $from) -> Self {
                <$impl_for>::$to(err)
            }
        }
    };
}

impl_error!(serde_json::Error, Json);

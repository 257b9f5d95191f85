//! # Coins Module
//!
//! Denominations, coin batches, deposit validation and change calculation.
//!
//! ## Coin Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Coin Flow                                      │
//! │                                                                         │
//! │  Buyer inserts {100: 2, 50: 1}                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_deposit ← every key in {5,10,20,50,100}, every count > 0     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total = Σ denomination × count = 250 cents                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Account.balance += 250                                                │
//! │                                                                         │
//! │  Purchase leaves 175 cents over                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  calculate_change(175) ← greedy, largest coin first                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  [(100, 1), (50, 1), (20, 1), (5, 1)]                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! A [`CoinBatch`] is an explicit table of `(Denomination, count)` pairs kept
//! in descending denomination order. The greedy change algorithm depends on
//! that order, so it is never left to map iteration.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// Raw coin input as received from the hosting layer: denomination → count.
///
/// Nothing about it is trusted; [`validate_deposit`] checks every entry.
pub type CoinInput = BTreeMap<i64, i64>;

// =============================================================================
// Denomination
// =============================================================================

/// A coin the machine accepts.
///
/// ## Greedy Optimality
/// The set `{5, 10, 20, 50, 100}` is canonical: taking the largest coin that
/// fits at every step yields the fewest coins, and every non-negative multiple
/// of 5 is reachable. Changing this set means re-deriving that property or
/// replacing [`calculate_change`] with an exact coin-change algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Denomination {
    Five,
    Ten,
    Twenty,
    Fifty,
    Hundred,
}

impl Denomination {
    /// All denominations, largest first.
    pub const DESCENDING: [Denomination; 5] = [
        Denomination::Hundred,
        Denomination::Fifty,
        Denomination::Twenty,
        Denomination::Ten,
        Denomination::Five,
    ];

    /// Face value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        match self {
            Denomination::Five => 5,
            Denomination::Ten => 10,
            Denomination::Twenty => 20,
            Denomination::Fifty => 50,
            Denomination::Hundred => 100,
        }
    }

    /// Checks whether a raw value is an accepted coin.
    pub fn is_valid(value: i64) -> bool {
        Denomination::try_from(value).is_ok()
    }
}

impl TryFrom<i64> for Denomination {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(Denomination::Five),
            10 => Ok(Denomination::Ten),
            20 => Ok(Denomination::Twenty),
            50 => Ok(Denomination::Fifty),
            100 => Ok(Denomination::Hundred),
            other => Err(CoreError::InvalidCoinDenomination(other)),
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cents())
    }
}

// =============================================================================
// Coin Batch
// =============================================================================

/// A validated collection of coins.
///
/// ## Invariants
/// - every denomination appears at most once
/// - every count is strictly positive
/// - entries are ordered by denomination, largest first
/// - the total fits in an `i64`
///
/// Serializes as a JSON object keyed by face value, e.g. `{"100":1,"50":1}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CoinInput")]
pub struct CoinBatch {
    entries: Vec<(Denomination, i64)>,
}

impl CoinBatch {
    /// An empty batch (no coins).
    pub fn empty() -> Self {
        CoinBatch::default()
    }

    /// Builds a batch from raw input, rejecting the whole batch on the first
    /// invalid entry.
    ///
    /// Entries are checked in ascending key order. For each entry the
    /// denomination is checked before the count.
    pub fn from_input(coins: &CoinInput) -> CoreResult<Self> {
        let mut entries = Vec::with_capacity(coins.len());

        for (&value, &count) in coins {
            let denomination = Denomination::try_from(value)?;
            if count <= 0 {
                return Err(CoreError::NonPositiveCoinCount {
                    denomination: value,
                    count,
                });
            }
            entries.push((denomination, count));
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        let batch = CoinBatch { entries };

        if batch.checked_total().is_none() {
            return Err(ValidationError::OutOfRange {
                field: "deposit total".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        Ok(batch)
    }

    /// The `(denomination, count)` table, largest denomination first.
    pub fn entries(&self) -> &[(Denomination, i64)] {
        &self.entries
    }

    /// Number of coins of one denomination (0 if absent).
    pub fn count_of(&self, denomination: Denomination) -> i64 {
        self.entries
            .iter()
            .find(|(d, _)| *d == denomination)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Total value of the batch.
    pub fn total(&self) -> Money {
        Money::from_cents(
            self.entries
                .iter()
                .map(|(d, count)| d.cents() * count)
                .sum(),
        )
    }

    /// Total number of physical coins.
    pub fn coin_count(&self) -> i64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Returns true if the batch holds no coins.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to a plain face value → count map.
    pub fn to_map(&self) -> BTreeMap<i64, i64> {
        self.entries
            .iter()
            .map(|(d, count)| (d.cents(), *count))
            .collect()
    }

    fn checked_total(&self) -> Option<Money> {
        self.entries.iter().try_fold(Money::zero(), |acc, (d, count)| {
            let value = d.cents().checked_mul(*count)?;
            acc.checked_add(Money::from_cents(value))
        })
    }
}

impl TryFrom<CoinInput> for CoinBatch {
    type Error = CoreError;

    fn try_from(coins: CoinInput) -> Result<Self, Self::Error> {
        CoinBatch::from_input(&coins)
    }
}

impl Serialize for CoinBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(d, count)| (d.cents(), *count)))
    }
}

// =============================================================================
// Deposit Validator
// =============================================================================

/// Validates a deposit and returns its total value.
///
/// ## Rules
/// - At least one entry
/// - Every key is one of 5, 10, 20, 50, 100
/// - Every count is strictly positive
/// - Any violation rejects the whole batch (no partial acceptance)
///
/// ## Example
/// ```rust
/// use vend_core::coins::{validate_deposit, CoinInput};
///
/// let coins = CoinInput::from([(100, 2), (50, 1)]);
/// assert_eq!(validate_deposit(&coins).unwrap().cents(), 250);
///
/// let bad = CoinInput::from([(15, 1)]);
/// assert!(validate_deposit(&bad).is_err());
/// ```
pub fn validate_deposit(coins: &CoinInput) -> CoreResult<Money> {
    if coins.is_empty() {
        return Err(ValidationError::Required {
            field: "coins".to_string(),
        }
        .into());
    }

    Ok(CoinBatch::from_input(coins)?.total())
}

// =============================================================================
// Change Calculator
// =============================================================================

/// Breaks an amount into the fewest coins, largest denomination first.
///
/// ## Algorithm
/// ```text
/// remaining = amount
/// for d in [100, 50, 20, 10, 5]:
///     count = remaining / d      ← emit only if count > 0
///     remaining %= d
/// remaining must be 0
/// ```
///
/// ## Errors
/// `UnrepresentableAmount` if the amount is negative or not a multiple of 5.
/// Balances and costs are always multiples of 5, so this signals corrupted
/// data upstream; it is never silently truncated.
pub fn calculate_change(amount: Money) -> CoreResult<CoinBatch> {
    if amount.is_negative() {
        return Err(CoreError::UnrepresentableAmount {
            amount: amount.cents(),
            remainder: amount.cents(),
        });
    }

    let mut remaining = amount.cents();
    let mut entries = Vec::new();

    for denomination in Denomination::DESCENDING {
        let count = remaining / denomination.cents();
        if count > 0 {
            entries.push((denomination, count));
        }
        remaining %= denomination.cents();
    }

    if remaining != 0 {
        return Err(CoreError::UnrepresentableAmount {
            amount: amount.cents(),
            remainder: remaining,
        });
    }

    Ok(CoinBatch { entries })
}

// =============================================================================
// Unit Tests
// =============================================================================

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fund ledger primitives.
//!
//! The fund is a single [`FundBalance`] row. Every change to it is a
//! [`LedgerDelta`]: a credit when a contribution becomes paid, a debit when a
//! claim payout is disbursed. The row always satisfies
//! `balance == total_contributions - total_claims_paid`.
//!
//! # Example
//!
//! ```
//! use burial_ledger::{FundBalance, LedgerDelta};
//! use chrono::Utc;
//! use rust_decimal_macros::dec;
//!
//! let fund = FundBalance::provisioned(Utc::now());
//! let fund = fund.applied(&LedgerDelta::credit(dec!(250)).unwrap(), Utc::now()).unwrap();
//! let fund = fund.applied(&LedgerDelta::debit(dec!(100)).unwrap(), Utc::now()).unwrap();
//! assert_eq!(fund.balance, dec!(150));
//! assert!(fund.is_consistent());
//! ```

use crate::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which way a delta moves the fund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Contribution received.
    Credit,
    /// Claim payout disbursed.
    Debit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credit => f.write_str("credit"),
            Self::Debit => f.write_str("debit"),
        }
    }
}

impl FromStr for Direction {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credit" | "add" => Ok(Self::Credit),
            "debit" | "subtract" => Ok(Self::Debit),
            other => Err(LedgerError::UnknownDirection(other.to_string())),
        }
    }
}

/// A validated change to the fund. The amount is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerDelta {
    direction: Direction,
    amount: Decimal,
}

impl LedgerDelta {
    pub fn new(direction: Direction, amount: Decimal) -> Result<Self, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self { direction, amount })
    }

    pub fn credit(amount: Decimal) -> Result<Self, LedgerError> {
        Self::new(Direction::Credit, amount)
    }

    pub fn debit(amount: Decimal) -> Result<Self, LedgerError> {
        Self::new(Direction::Debit, amount)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Amount with the sign it has on the balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => -self.amount,
        }
    }
}

/// The singleton fund balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundBalance {
    pub balance: Decimal,
    /// Cumulative paid-in contributions.
    pub total_contributions: Decimal,
    /// Cumulative claim payouts.
    pub total_claims_paid: Decimal,
    /// Bumped on every write; guards optimistic updates.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl FundBalance {
    /// The row as created at provisioning time.
    pub fn provisioned(at: DateTime<Utc>) -> Self {
        Self {
            balance: Decimal::ZERO,
            total_contributions: Decimal::ZERO,
            total_claims_paid: Decimal::ZERO,
            version: 0,
            updated_at: at,
        }
    }

    /// Returns the row after applying `delta`.
    ///
    /// Credits move `total_contributions`, debits move `total_claims_paid`;
    /// the balance moves either way and the version is bumped by one.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AmountOverflow`] if any figure would leave the
    /// representable range. `self` is left as it was.
    pub fn applied(&self, delta: &LedgerDelta, at: DateTime<Utc>) -> Result<Self, LedgerError> {
        let mut next = self.clone();
        match delta.direction() {
            Direction::Credit => {
                next.total_contributions = checked_add(next.total_contributions, delta.amount())?
            }
            Direction::Debit => {
                next.total_claims_paid = checked_add(next.total_claims_paid, delta.amount())?
            }
        }
        next.balance = checked_add(next.balance, delta.signed_amount())?;
        next.version += 1;
        next.updated_at = at;
        next.assert_invariants();
        Ok(next)
    }

    pub fn is_consistent(&self) -> bool {
        self.balance == self.total_contributions - self.total_claims_paid
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.is_consistent(),
            "Invariant violated: balance {} != contributions {} - claims paid {}",
            self.balance,
            self.total_contributions,
            self.total_claims_paid
        );
    }
}

fn checked_add(total: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    total.checked_add(amount).ok_or(LedgerError::AmountOverflow)
}

/// Sums `amounts`, failing instead of overflowing.
pub(crate) fn checked_sum<I>(amounts: I) -> Result<Decimal, LedgerError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| checked_add(total, amount))
}

/// Result of a state-machine step on an entity: the next state, plus the
/// ledger delta the step requires, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<T> {
    pub next: T,
    pub effect: Option<LedgerDelta>,
}

impl<T> Transition<T> {
    pub fn without_effect(next: T) -> Self {
        Self { next, effect: None }
    }

    pub fn with_effect(next: T, effect: LedgerDelta) -> Self {
        Self {
            next,
            effect: Some(effect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fund() -> FundBalance {
        FundBalance::provisioned(Utc::now())
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        assert_eq!(
            LedgerDelta::credit(Decimal::ZERO),
            Err(LedgerError::InvalidAmount)
        );
        assert_eq!(LedgerDelta::debit(dec!(-5)), Err(LedgerError::InvalidAmount));
    }

    #[test]
    fn credit_moves_balance_and_contributions() {
        let next = fund()
            .applied(&LedgerDelta::credit(dec!(250)).unwrap(), Utc::now())
            .unwrap();
        assert_eq!(next.balance, dec!(250));
        assert_eq!(next.total_contributions, dec!(250));
        assert_eq!(next.total_claims_paid, Decimal::ZERO);
        assert_eq!(next.version, 1);
    }

    #[test]
    fn debit_moves_balance_and_claims_paid() {
        let next = fund()
            .applied(&LedgerDelta::credit(dec!(250)).unwrap(), Utc::now())
            .and_then(|f| f.applied(&LedgerDelta::debit(dec!(100)).unwrap(), Utc::now()))
            .unwrap();
        assert_eq!(next.balance, dec!(150));
        assert_eq!(next.total_contributions, dec!(250));
        assert_eq!(next.total_claims_paid, dec!(100));
        assert_eq!(next.version, 2);
    }

    #[test]
    fn debit_may_overdraw_without_breaking_invariant() {
        let next = fund()
            .applied(&LedgerDelta::debit(dec!(80)).unwrap(), Utc::now())
            .unwrap();
        assert_eq!(next.balance, dec!(-80));
        assert!(next.is_consistent());
    }

    #[test]
    fn overflowing_credit_is_rejected() {
        let full = fund()
            .applied(&LedgerDelta::credit(Decimal::MAX).unwrap(), Utc::now())
            .unwrap();
        let result = full.applied(&LedgerDelta::credit(Decimal::ONE).unwrap(), Utc::now());
        assert_eq!(result, Err(LedgerError::AmountOverflow));
        assert_eq!(full.total_contributions, Decimal::MAX);
        assert_eq!(full.version, 1);
    }

    #[test]
    fn overflowing_debit_is_rejected() {
        let drained = fund()
            .applied(&LedgerDelta::debit(Decimal::MAX).unwrap(), Utc::now())
            .unwrap();
        assert_eq!(
            drained.applied(&LedgerDelta::debit(Decimal::ONE).unwrap(), Utc::now()),
            Err(LedgerError::AmountOverflow)
        );
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(checked_sum([dec!(1.5), dec!(2.5)]), Ok(dec!(4)));
        assert_eq!(checked_sum(std::iter::empty()), Ok(Decimal::ZERO));
        assert_eq!(
            checked_sum([Decimal::MAX, Decimal::ONE]),
            Err(LedgerError::AmountOverflow)
        );
    }

    #[test]
    fn direction_parses_aliases() {
        assert_eq!("credit".parse::<Direction>().unwrap(), Direction::Credit);
        assert_eq!(" ADD ".parse::<Direction>().unwrap(), Direction::Credit);
        assert_eq!("subtract".parse::<Direction>().unwrap(), Direction::Debit);
        assert_eq!(
            "refund".parse::<Direction>(),
            Err(LedgerError::UnknownDirection("refund".into()))
        );
    }

    #[test]
    fn signed_amount_follows_direction() {
        assert_eq!(LedgerDelta::credit(dec!(10)).unwrap().signed_amount(), dec!(10));
        assert_eq!(LedgerDelta::debit(dec!(10)).unwrap().signed_amount(), dec!(-10));
    }
}

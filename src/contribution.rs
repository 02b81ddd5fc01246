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

//! Monthly contributions.
//!
//! Contributions follow a small state machine in which only one edge has a
//! ledger side effect:
//!
//! ```text
//!  Unpaid ──┐
//!           ├──mark paid──► Paid   (credit the fund with `amount`)
//!  Overdue ─┘
//! ```
//!
//! Once paid, a contribution is history: only corrective edits (payment date,
//! method, reference, notes) are accepted.

use crate::LedgerError;
use crate::base::{ContributionId, MemberId};
use crate::ledger::{LedgerDelta, Transition};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    Paid,
    Unpaid,
    Overdue,
}

impl fmt::Display for ContributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paid => f.write_str("paid"),
            Self::Unpaid => f.write_str("unpaid"),
            Self::Overdue => f.write_str("overdue"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    MobileMoney,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub member_id: MemberId,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    /// Period month, 1-12.
    pub month: u32,
    pub year: i32,
    pub payment_method: PaymentMethod,
    pub reference_number: Option<String>,
    pub status: ContributionStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContribution {
    pub member_id: MemberId,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub month: u32,
    pub year: i32,
    pub payment_method: PaymentMethod,
    pub reference_number: Option<String>,
    pub status: ContributionStatus,
    pub notes: Option<String>,
}

fn validate_month(month: u32) -> Result<(), LedgerError> {
    if !(1..=12).contains(&month) {
        return Err(LedgerError::InvalidMonth(month));
    }
    Ok(())
}

impl NewContribution {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        validate_month(self.month)
    }

    /// Ledger effect of creating this record: recording a contribution that
    /// is already paid credits the fund.
    pub fn initial_effect(&self) -> Result<Option<LedgerDelta>, LedgerError> {
        self.validate()?;
        match self.status {
            ContributionStatus::Paid => Ok(Some(LedgerDelta::credit(self.amount)?)),
            _ => Ok(None),
        }
    }

    pub fn into_record(self, id: ContributionId) -> Contribution {
        Contribution {
            id,
            member_id: self.member_id,
            amount: self.amount,
            payment_date: self.payment_date,
            month: self.month,
            year: self.year,
            payment_method: self.payment_method,
            reference_number: self.reference_number,
            status: self.status,
            notes: self.notes,
        }
    }
}

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionUpdate {
    pub amount: Option<Decimal>,
    pub payment_date: Option<NaiveDate>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub payment_method: Option<PaymentMethod>,
    pub reference_number: Option<String>,
    pub status: Option<ContributionStatus>,
    pub notes: Option<String>,
}

impl ContributionUpdate {
    pub fn mark_paid() -> Self {
        Self {
            status: Some(ContributionStatus::Paid),
            ..Default::default()
        }
    }
}

impl Contribution {
    pub fn is_paid(&self) -> bool {
        self.status == ContributionStatus::Paid
    }

    /// Applies `update` and reports the ledger effect it requires.
    ///
    /// The effect is a credit of the (new) amount exactly when the status
    /// moves from anything other than paid into paid. Re-saving a paid
    /// contribution never produces an effect.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] / [`LedgerError::InvalidMonth`] for bad values.
    /// - [`LedgerError::InvalidTransition`] when moving a paid contribution to another status.
    /// - [`LedgerError::PaidContributionLocked`] when changing a paid contribution's amount or period.
    pub fn apply_update(
        &self,
        update: &ContributionUpdate,
    ) -> Result<Transition<Contribution>, LedgerError> {
        if update.amount.is_some_and(|amount| amount <= Decimal::ZERO) {
            return Err(LedgerError::InvalidAmount);
        }
        if let Some(month) = update.month {
            validate_month(month)?;
        }

        if self.is_paid() {
            if let Some(status) = update.status.filter(|s| *s != ContributionStatus::Paid) {
                return Err(LedgerError::InvalidTransition {
                    entity: "contribution",
                    from: self.status.to_string(),
                    to: status.to_string(),
                });
            }
            let changes_amount = update.amount.is_some_and(|a| a != self.amount);
            let changes_period = update.month.is_some_and(|m| m != self.month)
                || update.year.is_some_and(|y| y != self.year);
            if changes_amount || changes_period {
                return Err(LedgerError::PaidContributionLocked(self.id.0));
            }
        }

        let mut next = self.clone();
        if let Some(amount) = update.amount {
            next.amount = amount;
        }
        if let Some(date) = update.payment_date {
            next.payment_date = date;
        }
        if let Some(month) = update.month {
            next.month = month;
        }
        if let Some(year) = update.year {
            next.year = year;
        }
        if let Some(method) = update.payment_method {
            next.payment_method = method;
        }
        if let Some(reference) = &update.reference_number {
            next.reference_number = Some(reference.clone());
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        if let Some(notes) = &update.notes {
            next.notes = Some(notes.clone());
        }

        if !self.is_paid() && next.is_paid() {
            let credit = LedgerDelta::credit(next.amount)?;
            Ok(Transition::with_effect(next, credit))
        } else {
            Ok(Transition::without_effect(next))
        }
    }
}

/// Contribution list filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContributionFilter {
    pub status: Option<ContributionStatus>,
    pub member_id: Option<MemberId>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl ContributionFilter {
    /// Paid contributions for one period.
    pub fn paid_in(month: u32, year: i32) -> Self {
        Self {
            status: Some(ContributionStatus::Paid),
            member_id: None,
            month: Some(month),
            year: Some(year),
        }
    }

    pub fn matches(&self, contribution: &Contribution) -> bool {
        self.status.is_none_or(|s| s == contribution.status)
            && self.member_id.is_none_or(|m| m == contribution.member_id)
            && self.month.is_none_or(|m| m == contribution.month)
            && self.year.is_none_or(|y| y == contribution.year)
    }
}

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

//! Drift detection between the fund row and transaction history.
//!
//! The fund keeps running totals instead of summing history, and the entity
//! write that accompanies each ledger write is a separate operation. If one
//! of the pair is lost the totals drift. [`reconcile`] recomputes the totals
//! from paid contributions and paid claims and reports any difference.

use crate::LedgerError;
use crate::claim::ClaimStatus;
use crate::contribution::{ContributionFilter, ContributionStatus};
use crate::ledger::{FundBalance, checked_sum};
use crate::store::{FundRepository, RecordStore};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// The fund row as stored.
    pub recorded: FundBalance,
    /// Sum of all paid contribution amounts.
    pub paid_contributions: Decimal,
    /// Sum of all paid claim payouts.
    pub paid_claims: Decimal,
}

impl ReconciliationReport {
    /// Positive when the ledger is ahead of contribution history.
    pub fn contribution_drift(&self) -> Decimal {
        self.recorded.total_contributions - self.paid_contributions
    }

    /// Positive when the ledger is ahead of claim history.
    pub fn claims_drift(&self) -> Decimal {
        self.recorded.total_claims_paid - self.paid_claims
    }

    /// Saturates at the representable range.
    pub fn balance_drift(&self) -> Decimal {
        self.recorded
            .balance
            .saturating_sub(self.paid_contributions - self.paid_claims)
    }

    pub fn is_consistent(&self) -> bool {
        self.recorded.is_consistent()
            && self.contribution_drift().is_zero()
            && self.claims_drift().is_zero()
    }
}

/// Compares the fund row against the history of paid entities.
///
/// # Errors
///
/// - [`LedgerError::LedgerNotProvisioned`] if the fund row does not exist.
/// - [`LedgerError::AmountOverflow`] if paid history cannot be summed.
pub fn reconcile(
    records: &dyn RecordStore,
    funds: &dyn FundRepository,
) -> Result<ReconciliationReport, LedgerError> {
    let recorded = funds.read()?.ok_or(LedgerError::LedgerNotProvisioned)?;

    let paid_contributions = checked_sum(
        records
            .contributions(&ContributionFilter {
                status: Some(ContributionStatus::Paid),
                ..Default::default()
            })?
            .iter()
            .map(|c| c.amount),
    )?;

    let paid_claims = checked_sum(
        records
            .claims(Some(ClaimStatus::Paid))?
            .iter()
            .map(|c| c.payout()),
    )?;

    Ok(ReconciliationReport {
        recorded,
        paid_contributions,
        paid_claims,
    })
}

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

//! Death-benefit claims.
//!
//! ```text
//!  Pending ──approve──► Approved ──pay──► Paid   (debit the fund with payout)
//!     │
//!     └──reject──► Rejected
//! ```

use crate::LedgerError;
use crate::base::{ClaimId, DependentId, MemberId};
use crate::ledger::{LedgerDelta, Transition};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Approved => f.write_str("approved"),
            Self::Paid => f.write_str("paid"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub member_id: MemberId,
    /// Set when the deceased is one of the member's dependents.
    pub dependent_id: Option<DependentId>,
    pub deceased_name: String,
    pub claim_amount: Decimal,
    pub payout_amount: Option<Decimal>,
    pub submission_date: NaiveDate,
    pub approval_date: Option<NaiveDate>,
    pub payout_date: Option<NaiveDate>,
    pub status: ClaimStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClaim {
    pub member_id: MemberId,
    pub dependent_id: Option<DependentId>,
    pub deceased_name: String,
    pub claim_amount: Decimal,
    pub submission_date: NaiveDate,
    pub notes: Option<String>,
}

impl NewClaim {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.claim_amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(())
    }

    /// New claims always start pending.
    pub fn into_record(self, id: ClaimId) -> Claim {
        Claim {
            id,
            member_id: self.member_id,
            dependent_id: self.dependent_id,
            deceased_name: self.deceased_name,
            claim_amount: self.claim_amount,
            payout_amount: None,
            submission_date: self.submission_date,
            approval_date: None,
            payout_date: None,
            status: ClaimStatus::Pending,
            notes: self.notes,
        }
    }
}

impl Claim {
    /// Payout that was (or will be) disbursed for this claim.
    pub fn payout(&self) -> Decimal {
        self.payout_amount.unwrap_or(self.claim_amount)
    }

    fn invalid(&self, to: ClaimStatus) -> LedgerError {
        LedgerError::InvalidTransition {
            entity: "claim",
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// `pending → approved`; payout defaults to the claimed amount.
    pub fn approve(&self, on: NaiveDate) -> Result<Transition<Claim>, LedgerError> {
        if self.status != ClaimStatus::Pending {
            return Err(self.invalid(ClaimStatus::Approved));
        }
        let mut next = self.clone();
        next.status = ClaimStatus::Approved;
        next.approval_date = Some(on);
        next.payout_amount = Some(self.claim_amount);
        Ok(Transition::without_effect(next))
    }

    /// `pending → rejected`. Terminal.
    pub fn reject(&self) -> Result<Transition<Claim>, LedgerError> {
        if self.status != ClaimStatus::Pending {
            return Err(self.invalid(ClaimStatus::Rejected));
        }
        let mut next = self.clone();
        next.status = ClaimStatus::Rejected;
        Ok(Transition::without_effect(next))
    }

    /// `approved → paid`, debiting the fund with the payout.
    ///
    /// `payout` overrides the approved payout amount. Paying a claim that is
    /// already paid returns it unchanged with no ledger effect.
    pub fn pay(
        &self,
        payout: Option<Decimal>,
        on: NaiveDate,
    ) -> Result<Transition<Claim>, LedgerError> {
        match self.status {
            ClaimStatus::Paid => Ok(Transition::without_effect(self.clone())),
            ClaimStatus::Approved => {
                let amount = payout.unwrap_or_else(|| self.payout());
                let debit = LedgerDelta::debit(amount)?;
                let mut next = self.clone();
                next.status = ClaimStatus::Paid;
                next.payout_amount = Some(amount);
                next.payout_date = Some(on);
                Ok(Transition::with_effect(next, debit))
            }
            ClaimStatus::Pending | ClaimStatus::Rejected => Err(self.invalid(ClaimStatus::Paid)),
        }
    }
}

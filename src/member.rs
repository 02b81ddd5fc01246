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

//! Members and their dependents.

use crate::LedgerError;
use crate::base::{DependentId, MemberId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Inactive,
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    /// Unique business key, e.g. `MEM001`.
    pub member_number: String,
    pub policy_number: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub monthly_contribution: Decimal,
    pub status: MemberStatus,
    pub join_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub member_number: String,
    pub policy_number: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub monthly_contribution: Decimal,
    pub status: MemberStatus,
    pub join_date: NaiveDate,
}

impl NewMember {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.monthly_contribution <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(())
    }

    pub fn into_record(self, id: MemberId) -> Member {
        Member {
            id,
            member_number: self.member_number,
            policy_number: self.policy_number,
            full_name: self.full_name,
            phone: self.phone,
            email: self.email,
            address: self.address,
            monthly_contribution: self.monthly_contribution,
            status: self.status,
            join_date: self.join_date,
        }
    }
}

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub member_number: Option<String>,
    pub policy_number: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub monthly_contribution: Option<Decimal>,
    pub status: Option<MemberStatus>,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    /// Returns a copy of the member with `update` applied.
    pub fn updated(&self, update: &MemberUpdate) -> Result<Member, LedgerError> {
        if update
            .monthly_contribution
            .is_some_and(|amount| amount <= Decimal::ZERO)
        {
            return Err(LedgerError::InvalidAmount);
        }

        let mut next = self.clone();
        if let Some(number) = &update.member_number {
            next.member_number = number.clone();
        }
        if let Some(policy) = &update.policy_number {
            next.policy_number = policy.clone();
        }
        if let Some(name) = &update.full_name {
            next.full_name = name.clone();
        }
        if let Some(phone) = &update.phone {
            next.phone = Some(phone.clone());
        }
        if let Some(email) = &update.email {
            next.email = Some(email.clone());
        }
        if let Some(address) = &update.address {
            next.address = Some(address.clone());
        }
        if let Some(amount) = update.monthly_contribution {
            next.monthly_contribution = amount;
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        Ok(next)
    }
}

/// Member list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberFilter {
    pub status: Option<MemberStatus>,
    /// Case-insensitive substring of name, member number or policy number.
    pub search: Option<String>,
}

impl MemberFilter {
    pub fn active() -> Self {
        Self {
            status: Some(MemberStatus::Active),
            search: None,
        }
    }

    pub fn matches(&self, member: &Member) -> bool {
        if self.status.is_some_and(|status| status != member.status) {
            return false;
        }
        match &self.search {
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    &member.full_name,
                    &member.member_number,
                    &member.policy_number,
                ]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Spouse,
    Child,
    Parent,
    Sibling,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
    pub id: DependentId,
    pub member_id: MemberId,
    pub full_name: String,
    pub relationship: Relationship,
    pub date_of_birth: Option<NaiveDate>,
    pub id_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDependent {
    pub full_name: String,
    pub relationship: Relationship,
    pub date_of_birth: Option<NaiveDate>,
    pub id_number: Option<String>,
}

impl NewDependent {
    pub fn into_record(self, id: DependentId, member_id: MemberId) -> Dependent {
        Dependent {
            id,
            member_id,
            full_name: self.full_name,
            relationship: self.relationship,
            date_of_birth: self.date_of_birth,
            id_number: self.id_number,
        }
    }
}

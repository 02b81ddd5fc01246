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

//! Error types for ledger and society operations.

use thiserror::Error;

/// Broad class of a [`LedgerError`], used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input, rejected before anything is written.
    Validation,
    /// The ledger is not set up; halt the workflow and alert an operator.
    Configuration,
    /// Lost a race against another writer; retry with fresh data.
    Conflict,
    /// Referenced record does not exist.
    NotFound,
    /// The datastore failed or a later write did not land.
    Storage,
}

/// Ledger and society errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Fund figures would leave the representable range
    #[error("amount overflows the fund totals")]
    AmountOverflow,

    /// Direction text is neither credit nor debit
    #[error("unknown ledger direction: {0}")]
    UnknownDirection(String),

    /// Contribution month outside 1..=12
    #[error("invalid month {0} (must be 1-12)")]
    InvalidMonth(u32),

    /// Another member already holds this member number
    #[error("duplicate member number {0}")]
    DuplicateMemberNumber(String),

    /// Claim names a dependent of some other member
    #[error("dependent {dependent} does not belong to member {member}")]
    DependentMismatch { member: u32, dependent: u32 },

    /// Status change not allowed by the entity's state machine
    #[error("invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Paid contributions only accept corrective edits
    #[error("contribution {0} is paid; only corrective edits are allowed")]
    PaidContributionLocked(u32),

    /// Configuration values are out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The fund balance row does not exist
    #[error("ledger not provisioned")]
    LedgerNotProvisioned,

    /// Fund balance row was changed by a concurrent writer
    #[error("fund balance changed concurrently after {attempts} attempt(s), please retry")]
    Conflict { attempts: u32 },

    /// Referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u32 },

    /// Ledger was updated but the entity status write failed afterwards
    #[error("ledger updated but {entity} write failed: {reason}")]
    EntityWriteFailed {
        entity: &'static str,
        reason: String,
    },

    /// Ledger was updated but another session committed the same
    /// transition first, so the ledger effect was applied twice
    #[error("duplicate ledger effect: {entity} {id} was committed concurrently")]
    DuplicateEffect { entity: &'static str, id: u32 },

    /// Datastore failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidAmount
            | Self::AmountOverflow
            | Self::UnknownDirection(_)
            | Self::InvalidMonth(_)
            | Self::DuplicateMemberNumber(_)
            | Self::DependentMismatch { .. }
            | Self::InvalidTransition { .. }
            | Self::PaidContributionLocked(_) => ErrorCategory::Validation,
            Self::InvalidConfig(_) | Self::LedgerNotProvisioned => ErrorCategory::Configuration,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::EntityWriteFailed { .. } | Self::DuplicateEffect { .. } | Self::Storage(_) => {
                ErrorCategory::Storage
            }
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: u32) -> Self {
        Self::NotFound { entity, id }
    }
}

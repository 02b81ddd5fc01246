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

//! Datastore boundary.
//!
//! The society's records live in a relational backend reached through three
//! narrow traits. [`FundRepository`] owns the singleton fund row and is the
//! only place where concurrency control for the ledger lives;
//! [`RecordStore`] and [`NotificationStore`] cover everything else.
//! [`InMemoryStore`](crate::InMemoryStore) implements all three.

use crate::LedgerError;
use crate::base::{ClaimId, ContributionId, MemberId};
use crate::claim::{Claim, ClaimStatus, NewClaim};
use crate::contribution::{Contribution, ContributionFilter, ContributionStatus, NewContribution};
use crate::ledger::{FundBalance, LedgerDelta};
use crate::member::{Dependent, Member, MemberFilter, NewDependent, NewMember};
use crate::notification::{Notification, NotificationDraft};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failures reported by a datastore.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Guarded write lost against a concurrent writer
    #[error("write conflict")]
    Conflict,

    /// Row does not exist
    #[error("row not found")]
    NotFound,

    /// Unique key already taken
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Arithmetic on a stored figure left the representable range
    #[error("numeric overflow")]
    Overflow,

    /// Backend unreachable or failed
    #[error("datastore unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict => LedgerError::Conflict { attempts: 1 },
            StoreError::Overflow => LedgerError::AmountOverflow,
            other => LedgerError::Storage(other.to_string()),
        }
    }
}

/// Storage for the singleton fund balance row.
pub trait FundRepository: Send + Sync {
    /// Creates the row. Fails with [`StoreError::DuplicateKey`] if it exists.
    fn provision(&self, at: DateTime<Utc>) -> Result<FundBalance, StoreError>;

    /// Reads the row, `None` if it was never provisioned.
    fn read(&self) -> Result<Option<FundBalance>, StoreError>;

    /// Replaces the row if its version is still `expected_version`.
    ///
    /// The stored version becomes `expected_version + 1`. Fails with
    /// [`StoreError::Conflict`] when another writer got there first and with
    /// [`StoreError::NotFound`] when the row does not exist.
    fn conditional_update(
        &self,
        expected_version: u64,
        next: &FundBalance,
    ) -> Result<FundBalance, StoreError>;

    /// Applies `delta` server-side in one statement. `None` if the row does
    /// not exist; [`StoreError::Overflow`] if a figure would overflow, in
    /// which case the row is unchanged.
    fn apply_delta(
        &self,
        delta: &LedgerDelta,
        at: DateTime<Utc>,
    ) -> Result<Option<FundBalance>, StoreError>;
}

/// Storage for members, dependents, contributions and claims.
///
/// Entity updates are guarded by the status the caller read, so two sessions
/// racing on the same record cannot both commit the same transition.
pub trait RecordStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateKey`] if the member number is taken.
    fn insert_member(&self, new: NewMember) -> Result<Member, StoreError>;

    /// Fails with [`StoreError::DuplicateKey`] if the member number is taken.
    fn update_member(&self, member: &Member) -> Result<Member, StoreError>;

    /// Deletes the member and its dependents, returning how many dependents
    /// were removed.
    fn delete_member(&self, id: MemberId) -> Result<usize, StoreError>;

    fn member(&self, id: MemberId) -> Result<Option<Member>, StoreError>;

    /// Newest first.
    fn members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError>;

    fn insert_dependent(
        &self,
        member_id: MemberId,
        new: NewDependent,
    ) -> Result<Dependent, StoreError>;

    /// Dependents of one member, or of everyone when `member_id` is `None`.
    /// Oldest first.
    fn dependents(&self, member_id: Option<MemberId>) -> Result<Vec<Dependent>, StoreError>;

    fn insert_contribution(&self, new: NewContribution) -> Result<Contribution, StoreError>;

    fn contribution(&self, id: ContributionId) -> Result<Option<Contribution>, StoreError>;

    /// Replaces the contribution if its stored status is still `expected`.
    fn update_contribution(
        &self,
        expected: ContributionStatus,
        next: &Contribution,
    ) -> Result<Contribution, StoreError>;

    /// Latest payment date first.
    fn contributions(&self, filter: &ContributionFilter) -> Result<Vec<Contribution>, StoreError>;

    fn insert_claim(&self, new: NewClaim) -> Result<Claim, StoreError>;

    fn claim(&self, id: ClaimId) -> Result<Option<Claim>, StoreError>;

    /// Replaces the claim if its stored status is still `expected`.
    fn update_claim(&self, expected: ClaimStatus, next: &Claim) -> Result<Claim, StoreError>;

    /// Latest submission first.
    fn claims(&self, status: Option<ClaimStatus>) -> Result<Vec<Claim>, StoreError>;
}

/// Storage for sent notifications.
pub trait NotificationStore: Send + Sync {
    fn insert_notification(
        &self,
        member_id: MemberId,
        draft: &NotificationDraft,
        sent_at: DateTime<Utc>,
    ) -> Result<Notification, StoreError>;

    /// Newest first, at most `limit`.
    fn notifications(&self, limit: usize) -> Result<Vec<Notification>, StoreError>;
}

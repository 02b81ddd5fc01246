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

//! In-memory datastore.
//!
//! Tables are [`DashMap`]s so independent sessions can read and write
//! different rows concurrently. The fund row sits behind a
//! [`parking_lot::Mutex`], which plays the part of the backend's row lock:
//! every fund operation holds it for exactly one statement.

use crate::base::{ClaimId, ContributionId, DependentId, MemberId, NotificationId};
use crate::claim::{Claim, ClaimStatus, NewClaim};
use crate::contribution::{Contribution, ContributionFilter, ContributionStatus, NewContribution};
use crate::ledger::{FundBalance, LedgerDelta};
use crate::member::{Dependent, Member, MemberFilter, NewDependent, NewMember};
use crate::notification::{Notification, NotificationDraft, NotificationStatus};
use crate::store::{FundRepository, NotificationStore, RecordStore, StoreError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
pub struct InMemoryStore {
    next_id: AtomicU32,
    fund: Mutex<Option<FundBalance>>,
    members: DashMap<MemberId, Member>,
    /// Unique index on `member_number`.
    member_numbers: DashMap<String, MemberId>,
    dependents: DashMap<DependentId, Dependent>,
    contributions: DashMap<ContributionId, Contribution>,
    claims: DashMap<ClaimId, Claim>,
    notifications: DashMap<NotificationId, Notification>,
}

impl InMemoryStore {
    /// Creates an empty store without a fund row.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            fund: Mutex::new(None),
            members: DashMap::new(),
            member_numbers: DashMap::new(),
            dependents: DashMap::new(),
            contributions: DashMap::new(),
            claims: DashMap::new(),
            notifications: DashMap::new(),
        }
    }

    /// Creates an empty store with a freshly provisioned fund row.
    pub fn provisioned() -> Self {
        let store = Self::new();
        *store.fund.lock() = Some(FundBalance::provisioned(Utc::now()));
        store
    }

    /// Drops the fund row, returning what it held.
    pub fn decommission_fund(&self) -> Option<FundBalance> {
        self.fund.lock().take()
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn claim_member_number(&self, number: &str, id: MemberId) -> Result<(), StoreError> {
        match self.member_numbers.entry(number.to_string()) {
            Entry::Occupied(entry) if *entry.get() != id => {
                Err(StoreError::DuplicateKey(number.to_string()))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(id);
                Ok(())
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FundRepository for InMemoryStore {
    fn provision(&self, at: DateTime<Utc>) -> Result<FundBalance, StoreError> {
        let mut fund = self.fund.lock();
        if fund.is_some() {
            return Err(StoreError::DuplicateKey("fund_balance".into()));
        }
        let row = FundBalance::provisioned(at);
        *fund = Some(row.clone());
        Ok(row)
    }

    fn read(&self) -> Result<Option<FundBalance>, StoreError> {
        Ok(self.fund.lock().clone())
    }

    fn conditional_update(
        &self,
        expected_version: u64,
        next: &FundBalance,
    ) -> Result<FundBalance, StoreError> {
        let mut fund = self.fund.lock();
        let current = fund.as_mut().ok_or(StoreError::NotFound)?;
        if current.version != expected_version {
            return Err(StoreError::Conflict);
        }
        *current = FundBalance {
            version: expected_version + 1,
            ..next.clone()
        };
        Ok(current.clone())
    }

    fn apply_delta(
        &self,
        delta: &LedgerDelta,
        at: DateTime<Utc>,
    ) -> Result<Option<FundBalance>, StoreError> {
        let mut fund = self.fund.lock();
        let Some(current) = fund.as_mut() else {
            return Ok(None);
        };
        *current = current
            .applied(delta, at)
            .map_err(|_| StoreError::Overflow)?;
        Ok(Some(current.clone()))
    }
}

impl RecordStore for InMemoryStore {
    fn insert_member(&self, new: NewMember) -> Result<Member, StoreError> {
        let id = MemberId(self.next_id());
        self.claim_member_number(&new.member_number, id)?;
        let member = new.into_record(id);
        self.members.insert(id, member.clone());
        Ok(member)
    }

    fn update_member(&self, member: &Member) -> Result<Member, StoreError> {
        let previous_number = self
            .members
            .get(&member.id)
            .map(|m| m.member_number.clone())
            .ok_or(StoreError::NotFound)?;

        if previous_number != member.member_number {
            self.claim_member_number(&member.member_number, member.id)?;
            self.member_numbers.remove(&previous_number);
        }

        let mut stored = self.members.get_mut(&member.id).ok_or(StoreError::NotFound)?;
        *stored = member.clone();
        Ok(member.clone())
    }

    fn delete_member(&self, id: MemberId) -> Result<usize, StoreError> {
        let (_, member) = self.members.remove(&id).ok_or(StoreError::NotFound)?;
        self.member_numbers.remove(&member.member_number);

        let owned: Vec<DependentId> = self
            .dependents
            .iter()
            .filter(|d| d.member_id == id)
            .map(|d| d.id)
            .collect();
        Ok(owned
            .iter()
            .filter(|dependent| self.dependents.remove(*dependent).is_some())
            .count())
    }

    fn member(&self, id: MemberId) -> Result<Option<Member>, StoreError> {
        Ok(self.members.get(&id).map(|m| m.clone()))
    }

    fn members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError> {
        let mut members: Vec<Member> = self
            .members
            .iter()
            .filter(|m| filter.matches(m))
            .map(|m| m.clone())
            .collect();
        members.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(members)
    }

    fn insert_dependent(
        &self,
        member_id: MemberId,
        new: NewDependent,
    ) -> Result<Dependent, StoreError> {
        if !self.members.contains_key(&member_id) {
            return Err(StoreError::NotFound);
        }
        let dependent = new.into_record(DependentId(self.next_id()), member_id);
        self.dependents.insert(dependent.id, dependent.clone());
        Ok(dependent)
    }

    fn dependents(&self, member_id: Option<MemberId>) -> Result<Vec<Dependent>, StoreError> {
        let mut dependents: Vec<Dependent> = self
            .dependents
            .iter()
            .filter(|d| member_id.is_none_or(|m| m == d.member_id))
            .map(|d| d.clone())
            .collect();
        dependents.sort_by_key(|d| d.id);
        Ok(dependents)
    }

    fn insert_contribution(&self, new: NewContribution) -> Result<Contribution, StoreError> {
        let contribution = new.into_record(ContributionId(self.next_id()));
        self.contributions
            .insert(contribution.id, contribution.clone());
        Ok(contribution)
    }

    fn contribution(&self, id: ContributionId) -> Result<Option<Contribution>, StoreError> {
        Ok(self.contributions.get(&id).map(|c| c.clone()))
    }

    fn update_contribution(
        &self,
        expected: ContributionStatus,
        next: &Contribution,
    ) -> Result<Contribution, StoreError> {
        let mut stored = self
            .contributions
            .get_mut(&next.id)
            .ok_or(StoreError::NotFound)?;
        if stored.status != expected {
            return Err(StoreError::Conflict);
        }
        *stored = next.clone();
        Ok(next.clone())
    }

    fn contributions(&self, filter: &ContributionFilter) -> Result<Vec<Contribution>, StoreError> {
        let mut contributions: Vec<Contribution> = self
            .contributions
            .iter()
            .filter(|c| filter.matches(c))
            .map(|c| c.clone())
            .collect();
        contributions.sort_by(|a, b| {
            b.payment_date
                .cmp(&a.payment_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(contributions)
    }

    fn insert_claim(&self, new: NewClaim) -> Result<Claim, StoreError> {
        let claim = new.into_record(ClaimId(self.next_id()));
        self.claims.insert(claim.id, claim.clone());
        Ok(claim)
    }

    fn claim(&self, id: ClaimId) -> Result<Option<Claim>, StoreError> {
        Ok(self.claims.get(&id).map(|c| c.clone()))
    }

    fn update_claim(&self, expected: ClaimStatus, next: &Claim) -> Result<Claim, StoreError> {
        let mut stored = self.claims.get_mut(&next.id).ok_or(StoreError::NotFound)?;
        if stored.status != expected {
            return Err(StoreError::Conflict);
        }
        *stored = next.clone();
        Ok(next.clone())
    }

    fn claims(&self, status: Option<ClaimStatus>) -> Result<Vec<Claim>, StoreError> {
        let mut claims: Vec<Claim> = self
            .claims
            .iter()
            .filter(|c| status.is_none_or(|s| s == c.status))
            .map(|c| c.clone())
            .collect();
        claims.sort_by(|a, b| {
            b.submission_date
                .cmp(&a.submission_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(claims)
    }
}

impl NotificationStore for InMemoryStore {
    fn insert_notification(
        &self,
        member_id: MemberId,
        draft: &NotificationDraft,
        sent_at: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        let notification = Notification {
            id: NotificationId(self.next_id()),
            member_id,
            kind: draft.kind,
            title: draft.title.clone(),
            message: draft.message.clone(),
            status: NotificationStatus::Sent,
            sent_at,
        };
        self.notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    fn notifications(&self, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let mut notifications: Vec<Notification> =
            self.notifications.iter().map(|n| n.clone()).collect();
        notifications.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then_with(|| b.id.cmp(&a.id)));
        notifications.truncate(limit);
        Ok(notifications)
    }
}

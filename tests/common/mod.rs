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

//! Shared fixtures and datastore wrappers for integration tests.

#![allow(dead_code)]

use burial_ledger::{
    Claim, ClaimId, ClaimStatus, Contribution, ContributionFilter, ContributionId,
    ContributionStatus, Dependent, FundBalance, FundRepository, InMemoryStore, LedgerDelta,
    Member, MemberFilter, MemberId, MemberStatus, NewClaim, NewContribution, NewDependent,
    NewMember, Notification, NotificationDraft, NotificationStore, PaymentMethod, RecordStore,
    StoreError,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn new_member(number: &str, status: MemberStatus) -> NewMember {
    NewMember {
        member_number: number.into(),
        policy_number: format!("POL-{number}"),
        full_name: format!("Member {number}"),
        phone: None,
        email: None,
        address: None,
        monthly_contribution: Decimal::new(25000, 2),
        status,
        join_date: day(2023, 1, 15),
    }
}

pub fn new_contribution(
    member_id: MemberId,
    amount: Decimal,
    status: ContributionStatus,
) -> NewContribution {
    NewContribution {
        member_id,
        amount,
        payment_date: day(2024, 6, 1),
        month: 6,
        year: 2024,
        payment_method: PaymentMethod::BankTransfer,
        reference_number: None,
        status,
        notes: None,
    }
}

pub fn new_claim(member_id: MemberId, amount: Decimal) -> NewClaim {
    NewClaim {
        member_id,
        dependent_id: None,
        deceased_name: "Sarah Doe".into(),
        claim_amount: amount,
        submission_date: day(2024, 6, 3),
        notes: None,
    }
}

/// Fund repository whose first `parties` reads all wait for each other, so
/// every racer computes its update from the same version.
pub struct RacingFunds {
    inner: Arc<InMemoryStore>,
    barrier: Barrier,
    parties: usize,
    reads: AtomicUsize,
}

impl RacingFunds {
    pub fn new(inner: Arc<InMemoryStore>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            parties,
            reads: AtomicUsize::new(0),
        }
    }
}

impl FundRepository for RacingFunds {
    fn provision(&self, at: DateTime<Utc>) -> Result<FundBalance, StoreError> {
        self.inner.provision(at)
    }

    fn read(&self) -> Result<Option<FundBalance>, StoreError> {
        let row = self.inner.read()?;
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait();
        }
        Ok(row)
    }

    fn conditional_update(
        &self,
        expected_version: u64,
        next: &FundBalance,
    ) -> Result<FundBalance, StoreError> {
        self.inner.conditional_update(expected_version, next)
    }

    fn apply_delta(
        &self,
        delta: &LedgerDelta,
        at: DateTime<Utc>,
    ) -> Result<Option<FundBalance>, StoreError> {
        self.inner.apply_delta(delta, at)
    }
}

/// Record store whose entity status updates can be switched off.
pub struct FlakyRecords {
    inner: Arc<InMemoryStore>,
    pub fail_updates: AtomicBool,
}

impl FlakyRecords {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            fail_updates: AtomicBool::new(false),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(())
    }
}

impl RecordStore for FlakyRecords {
    fn insert_member(&self, new: NewMember) -> Result<Member, StoreError> {
        self.inner.insert_member(new)
    }

    fn update_member(&self, member: &Member) -> Result<Member, StoreError> {
        self.inner.update_member(member)
    }

    fn delete_member(&self, id: MemberId) -> Result<usize, StoreError> {
        self.inner.delete_member(id)
    }

    fn member(&self, id: MemberId) -> Result<Option<Member>, StoreError> {
        self.inner.member(id)
    }

    fn members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError> {
        self.inner.members(filter)
    }

    fn insert_dependent(
        &self,
        member_id: MemberId,
        new: NewDependent,
    ) -> Result<Dependent, StoreError> {
        self.inner.insert_dependent(member_id, new)
    }

    fn dependents(&self, member_id: Option<MemberId>) -> Result<Vec<Dependent>, StoreError> {
        self.inner.dependents(member_id)
    }

    fn insert_contribution(&self, new: NewContribution) -> Result<Contribution, StoreError> {
        self.check()?;
        self.inner.insert_contribution(new)
    }

    fn contribution(&self, id: ContributionId) -> Result<Option<Contribution>, StoreError> {
        self.inner.contribution(id)
    }

    fn update_contribution(
        &self,
        expected: ContributionStatus,
        next: &Contribution,
    ) -> Result<Contribution, StoreError> {
        self.check()?;
        self.inner.update_contribution(expected, next)
    }

    fn contributions(&self, filter: &ContributionFilter) -> Result<Vec<Contribution>, StoreError> {
        self.inner.contributions(filter)
    }

    fn insert_claim(&self, new: NewClaim) -> Result<Claim, StoreError> {
        self.inner.insert_claim(new)
    }

    fn claim(&self, id: ClaimId) -> Result<Option<Claim>, StoreError> {
        self.inner.claim(id)
    }

    fn update_claim(&self, expected: ClaimStatus, next: &Claim) -> Result<Claim, StoreError> {
        self.check()?;
        self.inner.update_claim(expected, next)
    }

    fn claims(&self, status: Option<ClaimStatus>) -> Result<Vec<Claim>, StoreError> {
        self.inner.claims(status)
    }
}

/// Notification store that cannot reach some members.
pub struct FlakyNotifications {
    inner: Arc<InMemoryStore>,
    unreachable: HashSet<MemberId>,
}

impl FlakyNotifications {
    pub fn new(inner: Arc<InMemoryStore>, unreachable: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            inner,
            unreachable: unreachable.into_iter().collect(),
        }
    }
}

impl NotificationStore for FlakyNotifications {
    fn insert_notification(
        &self,
        member_id: MemberId,
        draft: &NotificationDraft,
        sent_at: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        if self.unreachable.contains(&member_id) {
            return Err(StoreError::Unavailable("mailbox unreachable".into()));
        }
        self.inner.insert_notification(member_id, draft, sent_at)
    }

    fn notifications(&self, limit: usize) -> Result<Vec<Notification>, StoreError> {
        self.inner.notifications(limit)
    }
}

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

//! Society operations.
//!
//! [`Society`] is the entry point used by the console: it validates user
//! actions, runs the entity state machines and sequences the resulting
//! writes. Status transitions that carry a ledger effect are committed in a
//! fail-closed order:
//!
//! 1. validate and compute the [`Transition`](crate::Transition) (no writes);
//! 2. apply the ledger delta;
//! 3. write the entity, guarded by the status that was read in step 1.
//!
//! If step 2 fails nothing is marked paid. If step 3 fails after step 2 the
//! ledger is ahead of the entity; the error says so and [`Society::reconcile`]
//! shows the drift. A step 3 that loses the status guard to another session
//! means that session already applied the same effect, so the second one is a
//! duplicate ([`LedgerError::DuplicateEffect`](crate::LedgerError::DuplicateEffect)).
//!
//! # Example
//!
//! ```
//! use burial_ledger::{
//!     ContributionStatus, InMemoryStore, LedgerConfig, MemberStatus, NewContribution, NewMember,
//!     PaymentMethod, Society,
//! };
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let society = Society::new(Arc::new(InMemoryStore::provisioned()), LedgerConfig::default()).unwrap();
//! let joined = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
//! let member = society
//!     .register_member(NewMember {
//!         member_number: "MEM001".into(),
//!         policy_number: "POL001".into(),
//!         full_name: "John Doe".into(),
//!         phone: None,
//!         email: None,
//!         address: None,
//!         monthly_contribution: dec!(250),
//!         status: MemberStatus::Active,
//!         join_date: joined,
//!     })
//!     .unwrap();
//!
//! let contribution = society
//!     .record_contribution(NewContribution {
//!         member_id: member.id,
//!         amount: dec!(250),
//!         payment_date: joined,
//!         month: 1,
//!         year: 2024,
//!         payment_method: PaymentMethod::Cash,
//!         reference_number: None,
//!         status: ContributionStatus::Unpaid,
//!         notes: None,
//!     })
//!     .unwrap();
//! society.mark_contribution_paid(contribution.id).unwrap();
//!
//! assert_eq!(society.balance().unwrap().balance, dec!(250));
//! ```

use crate::LedgerError;
use crate::base::{ClaimId, ContributionId, MemberId};
use crate::claim::{Claim, ClaimStatus, NewClaim};
use crate::config::LedgerConfig;
use crate::contribution::{Contribution, ContributionFilter, ContributionUpdate, NewContribution};
use crate::ledger::{FundBalance, LedgerDelta};
use crate::ledger_service::LedgerService;
use crate::member::{Dependent, Member, MemberFilter, MemberUpdate, NewDependent, NewMember};
use crate::notification::{BatchOutcome, Notification, NotificationDraft, Recipient};
use crate::reconcile::{self, ReconciliationReport};
use crate::stats::{ClaimsReport, ContributionReport, StatisticsAggregator, StatsSnapshot};
use crate::store::{FundRepository, NotificationStore, RecordStore, StoreError};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct Society {
    records: Arc<dyn RecordStore>,
    funds: Arc<dyn FundRepository>,
    notifications: Arc<dyn NotificationStore>,
    ledger: LedgerService,
}

impl Society {
    /// Builds a society over one datastore that implements every store trait.
    pub fn new<S>(store: Arc<S>, config: LedgerConfig) -> Result<Self, LedgerError>
    where
        S: RecordStore + FundRepository + NotificationStore + 'static,
    {
        Self::from_parts(store.clone(), store.clone(), store, config)
    }

    /// Builds a society over separate stores.
    pub fn from_parts(
        records: Arc<dyn RecordStore>,
        funds: Arc<dyn FundRepository>,
        notifications: Arc<dyn NotificationStore>,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        let ledger = LedgerService::new(Arc::clone(&funds), config);
        Ok(Self {
            records,
            funds,
            notifications,
            ledger,
        })
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    pub fn balance(&self) -> Result<FundBalance, LedgerError> {
        self.ledger.balance()
    }

    // === Members ===

    #[instrument(skip_all, fields(member_number = %new.member_number))]
    pub fn register_member(&self, new: NewMember) -> Result<Member, LedgerError> {
        new.validate()?;
        let number = new.member_number.clone();
        let member = self
            .records
            .insert_member(new)
            .map_err(|err| member_write_error(err, &number, None))?;
        info!(member = %member.id, "member registered");
        Ok(member)
    }

    #[instrument(skip(self, update))]
    pub fn update_member(&self, id: MemberId, update: &MemberUpdate) -> Result<Member, LedgerError> {
        let next = self.member(id)?.updated(update)?;
        self.records
            .update_member(&next)
            .map_err(|err| member_write_error(err, &next.member_number, Some(id)))
    }

    /// Removes a member and its dependents. Contribution and claim history is
    /// kept. Returns the number of dependents removed.
    #[instrument(skip(self))]
    pub fn remove_member(&self, id: MemberId) -> Result<usize, LedgerError> {
        let removed = self.records.delete_member(id).map_err(|err| match err {
            StoreError::NotFound => LedgerError::not_found("member", id.0),
            other => other.into(),
        })?;
        info!(dependents = removed, "member removed");
        Ok(removed)
    }

    pub fn member(&self, id: MemberId) -> Result<Member, LedgerError> {
        self.records
            .member(id)?
            .ok_or_else(|| LedgerError::not_found("member", id.0))
    }

    pub fn members(&self, filter: &MemberFilter) -> Result<Vec<Member>, LedgerError> {
        Ok(self.records.members(filter)?)
    }

    pub fn add_dependent(
        &self,
        member_id: MemberId,
        new: NewDependent,
    ) -> Result<Dependent, LedgerError> {
        self.records
            .insert_dependent(member_id, new)
            .map_err(|err| match err {
                StoreError::NotFound => LedgerError::not_found("member", member_id.0),
                other => other.into(),
            })
    }

    pub fn dependents(&self, member_id: MemberId) -> Result<Vec<Dependent>, LedgerError> {
        Ok(self.records.dependents(Some(member_id))?)
    }

    // === Contributions ===

    /// Records a contribution. One recorded as already paid credits the fund
    /// before it is stored.
    #[instrument(skip_all, fields(member = %new.member_id, amount = %new.amount, status = %new.status))]
    pub fn record_contribution(&self, new: NewContribution) -> Result<Contribution, LedgerError> {
        let effect = new.initial_effect()?;
        self.member(new.member_id)?;

        let contribution = self.commit("contribution", 0, effect, || {
            self.records.insert_contribution(new)
        })?;
        info!(contribution = %contribution.id, "contribution recorded");
        Ok(contribution)
    }

    /// Updates a contribution. The fund is credited only when the status
    /// moves into paid.
    #[instrument(skip(self, update))]
    pub fn update_contribution(
        &self,
        id: ContributionId,
        update: &ContributionUpdate,
    ) -> Result<Contribution, LedgerError> {
        let current = self.contribution(id)?;
        let transition = current.apply_update(update)?;
        let next = transition.next;
        self.commit("contribution", id.0, transition.effect, || {
            self.records.update_contribution(current.status, &next)
        })
    }

    /// Marks a contribution paid. Calling it again is a no-op.
    pub fn mark_contribution_paid(&self, id: ContributionId) -> Result<Contribution, LedgerError> {
        self.update_contribution(id, &ContributionUpdate::mark_paid())
    }

    pub fn contribution(&self, id: ContributionId) -> Result<Contribution, LedgerError> {
        self.records
            .contribution(id)?
            .ok_or_else(|| LedgerError::not_found("contribution", id.0))
    }

    pub fn contributions(
        &self,
        filter: &ContributionFilter,
    ) -> Result<Vec<Contribution>, LedgerError> {
        Ok(self.records.contributions(filter)?)
    }

    // === Claims ===

    #[instrument(skip_all, fields(member = %new.member_id, amount = %new.claim_amount))]
    pub fn submit_claim(&self, new: NewClaim) -> Result<Claim, LedgerError> {
        new.validate()?;
        self.member(new.member_id)?;
        if let Some(dependent_id) = new.dependent_id {
            let owned = self
                .records
                .dependents(Some(new.member_id))?
                .iter()
                .any(|d| d.id == dependent_id);
            if !owned {
                return Err(LedgerError::DependentMismatch {
                    member: new.member_id.0,
                    dependent: dependent_id.0,
                });
            }
        }

        let claim = self.records.insert_claim(new)?;
        info!(claim = %claim.id, "claim submitted");
        Ok(claim)
    }

    #[instrument(skip(self))]
    pub fn approve_claim(&self, id: ClaimId, on: NaiveDate) -> Result<Claim, LedgerError> {
        let current = self.claim(id)?;
        let transition = current.approve(on)?;
        self.commit_claim(&current, transition.next, transition.effect)
    }

    #[instrument(skip(self))]
    pub fn reject_claim(&self, id: ClaimId) -> Result<Claim, LedgerError> {
        let current = self.claim(id)?;
        let transition = current.reject()?;
        self.commit_claim(&current, transition.next, transition.effect)
    }

    /// Pays an approved claim, debiting the fund. `payout` overrides the
    /// approved amount. Paying an already paid claim is a no-op.
    #[instrument(skip(self))]
    pub fn pay_claim(
        &self,
        id: ClaimId,
        payout: Option<Decimal>,
        on: NaiveDate,
    ) -> Result<Claim, LedgerError> {
        let current = self.claim(id)?;
        let transition = current.pay(payout, on)?;
        self.commit_claim(&current, transition.next, transition.effect)
    }

    pub fn claim(&self, id: ClaimId) -> Result<Claim, LedgerError> {
        self.records
            .claim(id)?
            .ok_or_else(|| LedgerError::not_found("claim", id.0))
    }

    pub fn claims(&self, status: Option<ClaimStatus>) -> Result<Vec<Claim>, LedgerError> {
        Ok(self.records.claims(status)?)
    }

    fn commit_claim(
        &self,
        current: &Claim,
        next: Claim,
        effect: Option<LedgerDelta>,
    ) -> Result<Claim, LedgerError> {
        let claim = self.commit("claim", current.id.0, effect, || {
            self.records.update_claim(current.status, &next)
        })?;
        info!(claim = %claim.id, from = %current.status, to = %claim.status, "claim updated");
        Ok(claim)
    }

    // === Notifications ===

    /// Sends `draft` to one member or to every active member.
    ///
    /// Individual delivery failures do not stop the batch; they are listed in
    /// the returned [`BatchOutcome`].
    #[instrument(skip(self, draft), fields(kind = ?draft.kind))]
    pub fn send_notification(
        &self,
        recipient: Recipient,
        draft: &NotificationDraft,
    ) -> Result<BatchOutcome, LedgerError> {
        let targets = match recipient {
            Recipient::Member(id) => vec![self.member(id)?.id],
            Recipient::AllActive => self
                .records
                .members(&MemberFilter::active())?
                .into_iter()
                .map(|m| m.id)
                .collect(),
        };

        let mut outcome = BatchOutcome::default();
        for member_id in targets {
            match self
                .notifications
                .insert_notification(member_id, draft, Utc::now())
            {
                Ok(notification) => outcome.sent.push(notification.id),
                Err(err) => {
                    warn!(member = %member_id, %err, "notification not delivered");
                    outcome.failed.push((member_id, err.to_string()));
                }
            }
        }

        info!(
            sent = outcome.sent.len(),
            failed = outcome.failed.len(),
            "notification batch finished"
        );
        Ok(outcome)
    }

    /// Newest first, at most `limit`. The console lists
    /// [`RECENT_NOTIFICATIONS`](crate::RECENT_NOTIFICATIONS).
    pub fn recent_notifications(&self, limit: usize) -> Result<Vec<Notification>, LedgerError> {
        Ok(self.notifications.notifications(limit)?)
    }

    // === Derived figures ===

    pub fn dashboard_stats(&self, as_of: NaiveDate) -> Result<StatsSnapshot, LedgerError> {
        self.aggregator().compute_dashboard_stats(as_of)
    }

    pub fn contribution_report(
        &self,
        month: u32,
        year: i32,
    ) -> Result<ContributionReport, LedgerError> {
        self.aggregator().contribution_report(month, year)
    }

    pub fn claims_report(&self) -> Result<ClaimsReport, LedgerError> {
        self.aggregator().claims_report()
    }

    /// Compares the fund row against paid history.
    pub fn reconcile(&self) -> Result<ReconciliationReport, LedgerError> {
        let report = reconcile::reconcile(self.records.as_ref(), self.funds.as_ref())?;
        if !report.is_consistent() {
            warn!(
                contribution_drift = %report.contribution_drift(),
                claims_drift = %report.claims_drift(),
                "ledger drift detected"
            );
        }
        Ok(report)
    }

    fn aggregator(&self) -> StatisticsAggregator<'_> {
        StatisticsAggregator::new(self.records.as_ref(), self.funds.as_ref())
    }

    /// Applies `effect` to the ledger, then runs the entity write.
    fn commit<T>(
        &self,
        entity: &'static str,
        id: u32,
        effect: Option<LedgerDelta>,
        write: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, LedgerError> {
        if let Some(delta) = &effect {
            self.ledger.apply(delta)?;
        }

        write().map_err(|err| match (effect, err) {
            (Some(delta), StoreError::Conflict) => {
                error!(
                    entity,
                    id,
                    direction = %delta.direction(),
                    amount = %delta.amount(),
                    "duplicate ledger effect, entity committed by a concurrent session"
                );
                LedgerError::DuplicateEffect { entity, id }
            }
            (Some(delta), err) => {
                error!(
                    entity,
                    id,
                    direction = %delta.direction(),
                    amount = %delta.amount(),
                    %err,
                    "ledger updated but entity write failed"
                );
                LedgerError::EntityWriteFailed {
                    entity,
                    reason: err.to_string(),
                }
            }
            (None, StoreError::NotFound) => LedgerError::not_found(entity, id),
            (None, err) => err.into(),
        })
    }
}

fn member_write_error(err: StoreError, number: &str, id: Option<MemberId>) -> LedgerError {
    match (err, id) {
        (StoreError::DuplicateKey(_), _) => LedgerError::DuplicateMemberNumber(number.to_string()),
        (StoreError::NotFound, Some(id)) => LedgerError::not_found("member", id.0),
        (other, _) => other.into(),
    }
}

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

//! Statistics aggregator.
//!
//! Derived figures for the dashboard and reports. Every call re-scans the
//! datastore; nothing is cached and nothing is written. Empty tables and a
//! missing fund row read as zeros.

use crate::LedgerError;
use crate::claim::ClaimStatus;
use crate::contribution::{ContributionFilter, ContributionStatus};
use crate::ledger::checked_sum;
use crate::member::{MemberFilter, MemberStatus};
use crate::store::{FundRepository, RecordStore};
use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

/// Point-in-time dashboard figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub as_of: NaiveDate,
    pub total_members: usize,
    pub active_members: usize,
    pub inactive_members: usize,
    pub total_dependents: usize,
    /// Paid contributions for the month and year of `as_of`.
    pub monthly_contributions: Decimal,
    pub pending_claims: usize,
    pub approved_claims: usize,
    pub paid_claims: usize,
    /// Read from the fund row, not recomputed from history.
    pub fund_balance: Decimal,
    pub total_contributions: Decimal,
    pub total_claims_paid: Decimal,
}

impl StatsSnapshot {
    const MONEY_PRECISION: u32 = 2;

    fn empty(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            total_members: 0,
            active_members: 0,
            inactive_members: 0,
            total_dependents: 0,
            monthly_contributions: Decimal::ZERO,
            pending_claims: 0,
            approved_claims: 0,
            paid_claims: 0,
            fund_balance: Decimal::ZERO,
            total_contributions: Decimal::ZERO,
            total_claims_paid: Decimal::ZERO,
        }
    }
}

impl Serialize for StatsSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let money = |value: Decimal| {
            value.round_dp_with_strategy(
                Self::MONEY_PRECISION,
                RoundingStrategy::MidpointAwayFromZero,
            )
        };
        let mut state = serializer.serialize_struct("StatsSnapshot", 12)?;
        state.serialize_field("as_of", &self.as_of)?;
        state.serialize_field("total_members", &self.total_members)?;
        state.serialize_field("active_members", &self.active_members)?;
        state.serialize_field("inactive_members", &self.inactive_members)?;
        state.serialize_field("total_dependents", &self.total_dependents)?;
        state.serialize_field("monthly_contributions", &money(self.monthly_contributions))?;
        state.serialize_field("pending_claims", &self.pending_claims)?;
        state.serialize_field("approved_claims", &self.approved_claims)?;
        state.serialize_field("paid_claims", &self.paid_claims)?;
        state.serialize_field("fund_balance", &money(self.fund_balance))?;
        state.serialize_field("total_contributions", &money(self.total_contributions))?;
        state.serialize_field("total_claims_paid", &money(self.total_claims_paid))?;
        state.end()
    }
}

/// Contributions recorded for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributionReport {
    pub month: u32,
    pub year: i32,
    pub paid_count: usize,
    pub unpaid_count: usize,
    pub overdue_count: usize,
    pub total_paid: Decimal,
    pub total_unpaid: Decimal,
    pub total_overdue: Decimal,
}

/// Claims by status and what has been paid out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClaimsReport {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub paid: usize,
    pub rejected: usize,
    pub total_paid_out: Decimal,
}

/// Read-only view over the datastore that computes derived figures.
pub struct StatisticsAggregator<'a> {
    records: &'a dyn RecordStore,
    funds: &'a dyn FundRepository,
}

impl<'a> StatisticsAggregator<'a> {
    pub fn new(records: &'a dyn RecordStore, funds: &'a dyn FundRepository) -> Self {
        Self { records, funds }
    }

    pub fn compute_dashboard_stats(&self, as_of: NaiveDate) -> Result<StatsSnapshot, LedgerError> {
        let mut stats = StatsSnapshot::empty(as_of);

        for member in self.records.members(&MemberFilter::default())? {
            stats.total_members += 1;
            match member.status {
                MemberStatus::Active => stats.active_members += 1,
                MemberStatus::Inactive => stats.inactive_members += 1,
            }
        }

        stats.total_dependents = self.records.dependents(None)?.len();

        stats.monthly_contributions = checked_sum(
            self.records
                .contributions(&ContributionFilter::paid_in(as_of.month(), as_of.year()))?
                .iter()
                .map(|c| c.amount),
        )?;

        for claim in self.records.claims(None)? {
            match claim.status {
                ClaimStatus::Pending => stats.pending_claims += 1,
                ClaimStatus::Approved => stats.approved_claims += 1,
                ClaimStatus::Paid => stats.paid_claims += 1,
                ClaimStatus::Rejected => {}
            }
        }

        if let Some(fund) = self.funds.read()? {
            stats.fund_balance = fund.balance;
            stats.total_contributions = fund.total_contributions;
            stats.total_claims_paid = fund.total_claims_paid;
        }

        Ok(stats)
    }

    pub fn contribution_report(
        &self,
        month: u32,
        year: i32,
    ) -> Result<ContributionReport, LedgerError> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::InvalidMonth(month));
        }

        let mut report = ContributionReport {
            month,
            year,
            paid_count: 0,
            unpaid_count: 0,
            overdue_count: 0,
            total_paid: Decimal::ZERO,
            total_unpaid: Decimal::ZERO,
            total_overdue: Decimal::ZERO,
        };
        let filter = ContributionFilter {
            month: Some(month),
            year: Some(year),
            ..Default::default()
        };
        for contribution in self.records.contributions(&filter)? {
            let (count, total) = match contribution.status {
                ContributionStatus::Paid => (&mut report.paid_count, &mut report.total_paid),
                ContributionStatus::Unpaid => (&mut report.unpaid_count, &mut report.total_unpaid),
                ContributionStatus::Overdue => {
                    (&mut report.overdue_count, &mut report.total_overdue)
                }
            };
            *count += 1;
            *total = checked_sum([*total, contribution.amount])?;
        }
        Ok(report)
    }

    pub fn claims_report(&self) -> Result<ClaimsReport, LedgerError> {
        let mut report = ClaimsReport::default();
        for claim in self.records.claims(None)? {
            report.total += 1;
            match claim.status {
                ClaimStatus::Pending => report.pending += 1,
                ClaimStatus::Approved => report.approved += 1,
                ClaimStatus::Rejected => report.rejected += 1,
                ClaimStatus::Paid => {
                    report.paid += 1;
                    report.total_paid_out = checked_sum([report.total_paid_out, claim.payout()])?;
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn empty_store_reports_zeros() {
        let store = InMemoryStore::new();
        let stats = StatisticsAggregator::new(&store, &store)
            .compute_dashboard_stats(today())
            .unwrap();
        assert_eq!(stats, StatsSnapshot::empty(today()));
    }

    #[test]
    fn claims_report_on_empty_store() {
        let store = InMemoryStore::new();
        let report = StatisticsAggregator::new(&store, &store).claims_report().unwrap();
        assert_eq!(report, ClaimsReport::default());
    }

    #[test]
    fn contribution_report_rejects_bad_month() {
        let store = InMemoryStore::new();
        assert_eq!(
            StatisticsAggregator::new(&store, &store).contribution_report(0, 2024),
            Err(LedgerError::InvalidMonth(0))
        );
    }

    #[test]
    fn overflowing_sums_are_errors() {
        use crate::base::MemberId;
        use crate::contribution::{NewContribution, PaymentMethod};

        let store = InMemoryStore::new();
        for _ in 0..2 {
            store
                .insert_contribution(NewContribution {
                    member_id: MemberId(1),
                    amount: Decimal::MAX,
                    payment_date: today(),
                    month: 6,
                    year: 2024,
                    payment_method: PaymentMethod::Cash,
                    reference_number: None,
                    status: ContributionStatus::Paid,
                    notes: None,
                })
                .unwrap();
        }
        let aggregator = StatisticsAggregator::new(&store, &store);

        assert_eq!(
            aggregator.compute_dashboard_stats(today()),
            Err(LedgerError::AmountOverflow)
        );
        assert_eq!(
            aggregator.contribution_report(6, 2024),
            Err(LedgerError::AmountOverflow)
        );
    }

    #[test]
    fn serializer_rounds_money_to_two_places() {
        let mut stats = StatsSnapshot::empty(today());
        stats.fund_balance = dec!(1234.5678);
        stats.monthly_contributions = dec!(250);
        stats.total_contributions = dec!(250.005);
        stats.total_claims_paid = dec!(-0.005);
        stats.total_members = 4;

        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&stats).unwrap()).unwrap();

        assert_eq!(parsed["fund_balance"].as_str().unwrap(), "1234.57");
        assert_eq!(parsed["total_contributions"].as_str().unwrap(), "250.01");
        assert_eq!(parsed["total_claims_paid"].as_str().unwrap(), "-0.01");
        assert_eq!(parsed["monthly_contributions"].as_str().unwrap(), "250");
        assert_eq!(parsed["total_members"], 4);
        assert_eq!(parsed["as_of"], "2024-06-15");
    }
}

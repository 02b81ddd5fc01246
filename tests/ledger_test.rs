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

//! Ledger update protocol tests driven through the public API.

mod common;

use burial_ledger::{
    ContributionStatus, ContributionUpdate, Direction, ErrorCategory, InMemoryStore, LedgerConfig,
    LedgerError, LedgerService, MemberStatus, Society,
};
use common::{day, new_claim, new_contribution, new_member};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn society() -> (Arc<InMemoryStore>, Society) {
    let store = Arc::new(InMemoryStore::provisioned());
    let society = Society::new(store.clone(), LedgerConfig::default()).unwrap();
    (store, society)
}

#[test]
fn contribution_paid_credits_fund() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let contribution = society
        .record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Unpaid))
        .unwrap();
    assert_eq!(society.balance().unwrap().balance, Decimal::ZERO);

    society.mark_contribution_paid(contribution.id).unwrap();

    let fund = society.balance().unwrap();
    assert_eq!(fund.balance, dec!(250));
    assert_eq!(fund.total_contributions, dec!(250));
    assert_eq!(fund.total_claims_paid, Decimal::ZERO);
}

#[test]
fn claim_paid_debits_fund() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let contribution = society
        .record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Unpaid))
        .unwrap();
    society.mark_contribution_paid(contribution.id).unwrap();

    let claim = society.submit_claim(new_claim(member.id, dec!(100))).unwrap();
    society.approve_claim(claim.id, day(2024, 6, 4)).unwrap();
    assert_eq!(society.balance().unwrap().balance, dec!(250));

    society.pay_claim(claim.id, None, day(2024, 6, 5)).unwrap();

    let fund = society.balance().unwrap();
    assert_eq!(fund.balance, dec!(150));
    assert_eq!(fund.total_claims_paid, dec!(100));
    assert_eq!(fund.total_contributions, dec!(250));
    assert!(fund.is_consistent());
}

#[test]
fn zero_amount_rejected_before_ledger() {
    let store = Arc::new(InMemoryStore::provisioned());
    let ledger = LedgerService::new(store.clone(), LedgerConfig::default());
    ledger.apply_ledger_delta(dec!(40), Direction::Credit).unwrap();

    let result = ledger.apply_ledger_delta(Decimal::ZERO, Direction::Credit);
    assert_eq!(result, Err(LedgerError::InvalidAmount));
    assert_eq!(result.unwrap_err().category(), ErrorCategory::Validation);

    let fund = ledger.balance().unwrap();
    assert_eq!(fund.balance, dec!(40));
    assert_eq!(fund.version, 1);
}

#[test]
fn missing_fund_row_fails_closed() {
    let (store, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let contribution = society
        .record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Unpaid))
        .unwrap();
    store.decommission_fund();

    let result = society.mark_contribution_paid(contribution.id);
    assert_eq!(result, Err(LedgerError::LedgerNotProvisioned));
    assert_eq!(
        result.unwrap_err().category(),
        ErrorCategory::Configuration
    );

    // The status write never happened.
    let stored = society.contribution(contribution.id).unwrap();
    assert_eq!(stored.status, ContributionStatus::Unpaid);
}

#[test]
fn missing_fund_row_blocks_paid_creation() {
    let (store, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    store.decommission_fund();

    let result =
        society.record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Paid));
    assert_eq!(result, Err(LedgerError::LedgerNotProvisioned));
    assert!(society
        .contributions(&Default::default())
        .unwrap()
        .is_empty());
}

#[test]
fn marking_paid_twice_credits_once() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let contribution = society
        .record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Unpaid))
        .unwrap();

    society.mark_contribution_paid(contribution.id).unwrap();
    society.mark_contribution_paid(contribution.id).unwrap();

    let fund = society.balance().unwrap();
    assert_eq!(fund.balance, dec!(250));
    assert_eq!(fund.version, 1);
}

#[test]
fn resaving_paid_contribution_leaves_ledger_alone() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let contribution = society
        .record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Paid))
        .unwrap();
    assert_eq!(society.balance().unwrap().version, 1);

    society
        .update_contribution(
            contribution.id,
            &ContributionUpdate {
                status: Some(ContributionStatus::Paid),
                reference_number: Some("EFT-0042".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let fund = society.balance().unwrap();
    assert_eq!(fund.balance, dec!(250));
    assert_eq!(fund.version, 1);
}

#[test]
fn notes_edit_never_touches_ledger() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let contribution = society
        .record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Unpaid))
        .unwrap();
    let before = society.balance().unwrap();

    let updated = society
        .update_contribution(
            contribution.id,
            &ContributionUpdate {
                notes: Some("member promised to pay Friday".into()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(updated.status, ContributionStatus::Unpaid);
    assert_eq!(society.balance().unwrap(), before);
}

#[test]
fn paying_claim_twice_debits_once() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let claim = society.submit_claim(new_claim(member.id, dec!(100))).unwrap();
    society.approve_claim(claim.id, day(2024, 6, 4)).unwrap();

    society.pay_claim(claim.id, None, day(2024, 6, 5)).unwrap();
    society.pay_claim(claim.id, None, day(2024, 6, 6)).unwrap();

    let fund = society.balance().unwrap();
    assert_eq!(fund.total_claims_paid, dec!(100));
    assert_eq!(fund.balance, dec!(-100));
}

#[test]
fn payout_override_is_debited() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let claim = society.submit_claim(new_claim(member.id, dec!(10000))).unwrap();
    society.approve_claim(claim.id, day(2024, 6, 4)).unwrap();

    let paid = society
        .pay_claim(claim.id, Some(dec!(7500.50)), day(2024, 6, 5))
        .unwrap();

    assert_eq!(paid.payout_amount, Some(dec!(7500.50)));
    assert_eq!(society.balance().unwrap().total_claims_paid, dec!(7500.50));
}

#[test]
fn rejected_claim_never_debits() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let claim = society.submit_claim(new_claim(member.id, dec!(100))).unwrap();
    society.reject_claim(claim.id).unwrap();

    let result = society.pay_claim(claim.id, None, day(2024, 6, 5));
    assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
    assert_eq!(society.balance().unwrap().version, 0);
}

#[test]
fn optimistic_strategy_matches_atomic() {
    let store = Arc::new(InMemoryStore::provisioned());
    let society = Society::new(store, LedgerConfig::optimistic(3)).unwrap();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let contribution = society
        .record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Unpaid))
        .unwrap();
    society.mark_contribution_paid(contribution.id).unwrap();
    let claim = society.submit_claim(new_claim(member.id, dec!(100))).unwrap();
    society.approve_claim(claim.id, day(2024, 6, 4)).unwrap();
    society.pay_claim(claim.id, None, day(2024, 6, 5)).unwrap();

    let fund = society.balance().unwrap();
    assert_eq!(fund.balance, dec!(150));
    assert_eq!(fund.version, 2);
}

#[test]
fn invalid_config_is_rejected() {
    let store = Arc::new(InMemoryStore::provisioned());
    let result = Society::new(store, LedgerConfig::optimistic(0));
    assert!(matches!(result, Err(LedgerError::InvalidConfig(_))));
}

#[test]
fn overflowing_credit_is_an_error_not_a_panic() {
    for config in [LedgerConfig::default(), LedgerConfig::optimistic(3)] {
        let ledger = LedgerService::new(Arc::new(InMemoryStore::provisioned()), config);
        ledger.apply_ledger_delta(Decimal::MAX, Direction::Credit).unwrap();

        let result = ledger.apply_ledger_delta(Decimal::ONE, Direction::Credit);
        assert_eq!(result, Err(LedgerError::AmountOverflow));
        assert_eq!(result.unwrap_err().category(), ErrorCategory::Validation);

        let fund = ledger.balance().unwrap();
        assert_eq!(fund.total_contributions, Decimal::MAX);
        assert_eq!(fund.version, 1);
    }
}

#[test]
fn overflowing_payment_leaves_contribution_unpaid() {
    let (_, society) = society();
    let member = society
        .register_member(new_member("MEM001", MemberStatus::Active))
        .unwrap();
    let first = society
        .record_contribution(new_contribution(member.id, Decimal::MAX, ContributionStatus::Unpaid))
        .unwrap();
    let second = society
        .record_contribution(new_contribution(member.id, dec!(250), ContributionStatus::Unpaid))
        .unwrap();
    society.mark_contribution_paid(first.id).unwrap();

    assert_eq!(
        society.mark_contribution_paid(second.id),
        Err(LedgerError::AmountOverflow)
    );
    assert_eq!(
        society.contribution(second.id).unwrap().status,
        ContributionStatus::Unpaid
    );
    assert!(society.reconcile().unwrap().is_consistent());
}

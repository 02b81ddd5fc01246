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

//! # Burial Ledger
//!
//! This library is the fund core of a mutual burial society's console: it
//! tracks members, their dependents, monthly contributions and death-benefit
//! claims, and keeps a single fund balance consistent with them.
//!
//! ## Core Components
//!
//! - [`Society`]: Entry point for user actions; sequences entity and ledger writes
//! - [`LedgerService`]: Only writer of the [`FundBalance`] row
//! - [`StatisticsAggregator`]: Read-only dashboard figures and reports
//! - [`reconcile()`]: Compares the fund row against paid history
//! - [`FundRepository`], [`RecordStore`], [`NotificationStore`]: Datastore boundary
//! - [`InMemoryStore`]: In-process datastore implementing all three
//! - [`LedgerError`]: Error type for every operation
//!
//! ## Example
//!
//! ```
//! use burial_ledger::{Direction, InMemoryStore, LedgerConfig, LedgerService};
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let store = Arc::new(InMemoryStore::provisioned());
//! let ledger = LedgerService::new(store, LedgerConfig::default());
//!
//! // A contribution of R250 becomes paid
//! ledger.apply_ledger_delta(dec!(250), Direction::Credit).unwrap();
//!
//! // A claim of R100 is paid out
//! let fund = ledger.apply_ledger_delta(dec!(100), Direction::Debit).unwrap();
//! assert_eq!(fund.balance, dec!(150));
//! assert_eq!(fund.total_contributions, dec!(250));
//! assert_eq!(fund.total_claims_paid, dec!(100));
//! ```
//!
//! ## Consistency
//!
//! The fund row always satisfies
//! `balance == total_contributions - total_claims_paid`. Concurrency control
//! lives in the datastore (an atomic increment, or a version-guarded write),
//! never in process-local locks, so several independent sessions may mark
//! records paid at the same time.

mod base;
pub mod claim;
pub mod config;
pub mod contribution;
pub mod error;
pub mod ledger;
mod ledger_service;
mod memory;
pub mod member;
pub mod notification;
pub mod reconcile;
mod society;
pub mod stats;
pub mod store;

pub use base::{ClaimId, ContributionId, DependentId, MemberId, NotificationId};
pub use claim::{Claim, ClaimStatus, NewClaim};
pub use config::{LedgerConfig, UpdateStrategy};
pub use contribution::{
    Contribution, ContributionFilter, ContributionStatus, ContributionUpdate, NewContribution,
    PaymentMethod,
};
pub use error::{ErrorCategory, LedgerError};
pub use ledger::{Direction, FundBalance, LedgerDelta, Transition};
pub use ledger_service::LedgerService;
pub use member::{
    Dependent, Member, MemberFilter, MemberStatus, MemberUpdate, NewDependent, NewMember,
    Relationship,
};
pub use memory::InMemoryStore;
pub use notification::{
    BatchOutcome, Notification, NotificationDraft, NotificationKind, RECENT_NOTIFICATIONS,
    Recipient,
};
pub use reconcile::{ReconciliationReport, reconcile};
pub use society::Society;
pub use stats::{ClaimsReport, ContributionReport, StatisticsAggregator, StatsSnapshot};
pub use store::{FundRepository, NotificationStore, RecordStore, StoreError};

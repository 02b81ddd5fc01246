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

//! Ledger update service.
//!
//! The [`LedgerService`] is the only writer of the fund balance row. It turns
//! a validated [`LedgerDelta`] into exactly one row update, using the
//! concurrency primitive selected by [`LedgerConfig`]:
//!
//! - **Atomic**: the datastore applies the delta server-side. There is no
//!   read step, so concurrent writers cannot lose each other's updates.
//! - **Optimistic**: read the row, compute the next state, write it back
//!   guarded by the version that was read. A conflict restarts the whole
//!   sequence with fresh data, up to `max_attempts` times.
//!
//! The service holds no ledger state of its own; every call goes to the
//! datastore.

use crate::LedgerError;
use crate::config::{LedgerConfig, UpdateStrategy};
use crate::ledger::{Direction, FundBalance, LedgerDelta};
use crate::store::{FundRepository, StoreError};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

pub struct LedgerService {
    repository: Arc<dyn FundRepository>,
    config: LedgerConfig,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn FundRepository>, config: LedgerConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current fund balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::LedgerNotProvisioned`] if the row does not exist.
    pub fn balance(&self) -> Result<FundBalance, LedgerError> {
        self.repository
            .read()?
            .ok_or_else(Self::not_provisioned)
    }

    /// Validates `amount` and `direction`, then applies them to the fund.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `amount` is zero or negative; nothing is written.
    /// - [`LedgerError::AmountOverflow`] - the totals cannot hold `amount`; nothing is written.
    /// - [`LedgerError::LedgerNotProvisioned`] - the fund row does not exist.
    /// - [`LedgerError::Conflict`] - concurrent writers won every attempt.
    pub fn apply_ledger_delta(
        &self,
        amount: Decimal,
        direction: Direction,
    ) -> Result<FundBalance, LedgerError> {
        let delta = LedgerDelta::new(direction, amount)?;
        self.apply(&delta)
    }

    /// Applies an already validated delta. See [`Self::apply_ledger_delta`].
    #[instrument(skip_all, fields(direction = %delta.direction(), amount = %delta.amount()))]
    pub fn apply(&self, delta: &LedgerDelta) -> Result<FundBalance, LedgerError> {
        let updated = match self.config.strategy {
            UpdateStrategy::Atomic => self.apply_atomic(delta)?,
            UpdateStrategy::Optimistic => self.apply_optimistic(delta)?,
        };

        if updated.balance < Decimal::ZERO {
            warn!(balance = %updated.balance, "fund balance is negative");
        }
        debug!(
            balance = %updated.balance,
            version = updated.version,
            "fund balance updated"
        );
        Ok(updated)
    }

    fn apply_atomic(&self, delta: &LedgerDelta) -> Result<FundBalance, LedgerError> {
        self.repository
            .apply_delta(delta, Utc::now())?
            .ok_or_else(Self::not_provisioned)
    }

    fn apply_optimistic(&self, delta: &LedgerDelta) -> Result<FundBalance, LedgerError> {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            let current = self.balance()?;
            let next = current.applied(delta, Utc::now())?;
            match self.repository.conditional_update(current.version, &next) {
                Ok(updated) => return Ok(updated),
                Err(StoreError::Conflict) => {
                    debug!(attempt, version = current.version, "fund balance moved, retrying");
                }
                Err(StoreError::NotFound) => return Err(Self::not_provisioned()),
                Err(other) => return Err(other.into()),
            }
        }
        warn!(attempts, "giving up on fund balance update");
        Err(LedgerError::Conflict { attempts })
    }

    fn not_provisioned() -> LedgerError {
        error!("fund balance row is missing; ledger not provisioned");
        LedgerError::LedgerNotProvisioned
    }
}

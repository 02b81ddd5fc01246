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

//! Ledger configuration.

use crate::LedgerError;
use serde::{Deserialize, Serialize};

/// How the ledger service writes to the fund row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStrategy {
    /// One server-side increment per delta; no read step, no lost updates.
    #[default]
    Atomic,
    /// Read, compute, then write guarded by the row version; retried on
    /// conflict.
    Optimistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub strategy: UpdateStrategy,
    /// Read-modify-write attempts before giving up with a conflict.
    /// Only used by [`UpdateStrategy::Optimistic`].
    pub max_attempts: u32,
}

impl LedgerConfig {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn optimistic(max_attempts: u32) -> Self {
        Self {
            strategy: UpdateStrategy::Optimistic,
            max_attempts,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_attempts == 0 {
            return Err(LedgerError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            strategy: UpdateStrategy::Atomic,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

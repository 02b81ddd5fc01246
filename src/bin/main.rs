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

use burial_ledger::{
    ClaimId, ContributionId, ContributionStatus, InMemoryStore, LedgerConfig, LedgerError,
    MemberId, MemberStatus, MemberUpdate, NewClaim, NewContribution, NewMember, PaymentMethod,
    Society, UpdateStrategy,
};
use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Burial Ledger - Replay society operations and report the fund
///
/// Reads operations from a CSV file, applies them to an in-memory society and
/// writes the dashboard snapshot to stdout.
#[derive(Parser, Debug)]
#[command(name = "burial-ledger")]
#[command(about = "Replays burial society operations and reports the fund", long_about = None)]
struct Args {
    /// Path to CSV file with operations
    ///
    /// Expected format: op,member,reference,amount
    /// Example: cargo run -- operations.csv > dashboard.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Date the snapshot is taken on; also the period of recorded contributions
    #[arg(long, value_name = "YYYY-MM-DD")]
    as_of: Option<NaiveDate>,

    /// How the fund row is updated
    #[arg(long, value_enum, env = "LEDGER_STRATEGY", default_value_t = UpdateStrategy::Atomic)]
    strategy: UpdateStrategy,

    /// Attempts before an optimistic update gives up
    #[arg(long, env = "LEDGER_MAX_ATTEMPTS", default_value_t = LedgerConfig::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let as_of = args.as_of.unwrap_or_else(|| Local::now().date_naive());
    let config = LedgerConfig {
        strategy: args.strategy,
        max_attempts: args.max_attempts,
    };

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            error!(path = %args.input.display(), "error opening file: {e}");
            process::exit(1);
        }
    };

    let society = match replay_operations(BufReader::new(file), config, as_of) {
        Ok(society) => society,
        Err(e) => {
            error!("error replaying operations: {e}");
            process::exit(1);
        }
    };

    match society.reconcile() {
        Ok(report) if report.is_consistent() => info!("ledger reconciles with paid history"),
        Ok(report) => warn!(
            balance_drift = %report.balance_drift(),
            "ledger does not reconcile with paid history"
        ),
        Err(e) => error!("reconciliation failed: {e}"),
    }

    if let Err(e) = write_dashboard(&society, as_of, std::io::stdout()) {
        error!("error writing output: {e}");
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `op, member, reference, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    op: String,
    member: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    reference: Option<u32>,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
}

/// Why a replay failed as a whole.
#[derive(Debug, thiserror::Error)]
enum ReplayError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Replay state: the society plus the external references seen so far.
struct Replay {
    society: Society,
    as_of: NaiveDate,
    members: HashMap<String, MemberId>,
    contributions: HashMap<u32, ContributionId>,
    claims: HashMap<u32, ClaimId>,
}

impl Replay {
    fn member(&self, number: &str) -> Option<MemberId> {
        self.members.get(number).copied()
    }

    /// Applies one record. `Ok(false)` means the record was incomplete.
    fn apply(&mut self, record: CsvRecord) -> Result<bool, LedgerError> {
        match record.op.to_lowercase().as_str() {
            "join" => {
                let Some(monthly_contribution) = record.amount else {
                    return Ok(false);
                };
                let member = self.society.register_member(NewMember {
                    policy_number: format!("POL-{}", record.member),
                    full_name: record.member.clone(),
                    member_number: record.member.clone(),
                    phone: None,
                    email: None,
                    address: None,
                    monthly_contribution,
                    status: MemberStatus::Active,
                    join_date: self.as_of,
                })?;
                self.members.insert(record.member, member.id);
            }
            "leave" => {
                let Some(id) = self.member(&record.member) else {
                    return Ok(false);
                };
                self.society.update_member(
                    id,
                    &MemberUpdate {
                        status: Some(MemberStatus::Inactive),
                        ..Default::default()
                    },
                )?;
            }
            "contribution" => {
                let (Some(member_id), Some(reference), Some(amount)) =
                    (self.member(&record.member), record.reference, record.amount)
                else {
                    return Ok(false);
                };
                let contribution = self.society.record_contribution(NewContribution {
                    member_id,
                    amount,
                    payment_date: self.as_of,
                    month: self.as_of.month(),
                    year: self.as_of.year(),
                    payment_method: PaymentMethod::Cash,
                    reference_number: Some(reference.to_string()),
                    status: ContributionStatus::Unpaid,
                    notes: None,
                })?;
                self.contributions.insert(reference, contribution.id);
            }
            "paid" => {
                let Some(id) = record.reference.and_then(|r| self.contributions.get(&r).copied())
                else {
                    return Ok(false);
                };
                self.society.mark_contribution_paid(id)?;
            }
            "claim" => {
                let (Some(member_id), Some(reference), Some(claim_amount)) =
                    (self.member(&record.member), record.reference, record.amount)
                else {
                    return Ok(false);
                };
                let claim = self.society.submit_claim(NewClaim {
                    member_id,
                    dependent_id: None,
                    deceased_name: record.member,
                    claim_amount,
                    submission_date: self.as_of,
                    notes: None,
                })?;
                self.claims.insert(reference, claim.id);
            }
            op @ ("approve" | "reject" | "payout") => {
                let Some(id) = record.reference.and_then(|r| self.claims.get(&r).copied()) else {
                    return Ok(false);
                };
                match op {
                    "approve" => self.society.approve_claim(id, self.as_of)?,
                    "reject" => self.society.reject_claim(id)?,
                    _ => self.society.pay_claim(id, record.amount, self.as_of)?,
                };
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Replay society operations from a CSV reader.
///
/// Rows are streamed, so arbitrarily large files are fine. Malformed rows and
/// rejected operations are skipped and logged at debug level. Only a missing
/// or unusable fund row aborts the replay.
///
/// # CSV Format
///
/// Expected columns: `op, member, reference, amount`
/// - `op`: join, leave, contribution, paid, claim, approve, reject, payout
/// - `member`: Member number
/// - `reference`: Caller's contribution or claim reference (u32)
/// - `amount`: Decimal amount (monthly contribution for `join`, optional payout override for `payout`)
///
/// # Example
///
/// ```csv
/// op,member,reference,amount
/// join,MEM001,,250.00
/// contribution,MEM001,1,250.00
/// paid,MEM001,1,
/// ```
fn replay_operations<R: Read>(
    reader: R,
    config: LedgerConfig,
    as_of: NaiveDate,
) -> Result<Society, ReplayError> {
    let store = Arc::new(InMemoryStore::provisioned());
    let mut replay = Replay {
        society: Society::new(store, config)?,
        as_of,
        members: HashMap::new(),
        contributions: HashMap::new(),
        claims: HashMap::new(),
    };

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for (line, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                debug!(line, "skipping malformed row: {e}");
                continue;
            }
        };
        match replay.apply(record) {
            Ok(true) => {}
            Ok(false) => debug!(line, "skipping incomplete operation"),
            Err(e @ LedgerError::LedgerNotProvisioned) => return Err(e.into()),
            Err(e) => debug!(line, "skipping rejected operation: {e}"),
        }
    }

    Ok(replay.society)
}

/// Write the dashboard snapshot as a single CSV row.
fn write_dashboard<W: Write>(
    society: &Society,
    as_of: NaiveDate,
    writer: W,
) -> Result<(), ReplayError> {
    let stats = society.dashboard_stats(as_of)?;
    let mut wtr = Writer::from_writer(writer);
    wtr.serialize(&stats)?;
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

//! Synchronization scheduler: cooldown-gated factual refresh of canonical
//! ballots.
//!
//! Entity lifecycle per run: Idle → Running → {Succeeded, Failed, Skipped}.
//! Succeeded persists the refreshed ballot and bumps the manifest version;
//! Failed persists nothing. Both record a last-attempt timestamp so the
//! cooldown also applies to failures. Races within a ballot refresh strictly
//! sequentially, in canonical order, with a fixed pause between model calls.

pub mod handlers;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::ballot::merge::apply_race_refresh;
use crate::errors::AppError;
use crate::gateway::ModelGateway;
use crate::models::ballot::{Ballot, Party};
use crate::models::envelope::RaceUpdate;
use crate::models::manifest::Manifest;
use crate::parser::parse_structured;
use crate::store::{get_json, keys, put_json, KeyValueStore, StoreError};
use crate::sync::prompts::{build_refresh_prompt, REFRESH_SYSTEM};

/// Pause between successive model calls within a run.
pub const DEFAULT_INTER_CALL_DELAY: Duration = Duration::from_secs(4);

/// Daily update logs expire after a month.
const UPDATE_LOG_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

// ────────────────────────────────────────────────────────────────────────────
// Cooldown
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Skipped { next_eligible: DateTime<Utc> },
}

/// Pure cooldown decision. The cooldown window counts from the last attempt
/// regardless of whether it succeeded, so a failing entity cannot hot-loop.
pub fn check_cooldown(
    last_attempt: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: chrono::Duration,
    force: bool,
) -> Eligibility {
    if force {
        return Eligibility::Eligible;
    }
    match last_attempt {
        Some(last) if now < last + cooldown => Eligibility::Skipped {
            next_eligible: last + cooldown,
        },
        _ => Eligibility::Eligible,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Terminal state of one entity's refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    #[serde(rename_all = "camelCase")]
    Succeeded {
        version: i64,
        races_updated: usize,
        races_failed: usize,
    },
    Failed {
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    Skipped {
        next_eligible: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOutcome {
    pub entity: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// Result of one full run across both party ballots. `halted` is set when a
/// credentials failure stopped the batch before every entity was attempted.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<EntityOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared bookkeeping (also used by the audit cycle)
// ────────────────────────────────────────────────────────────────────────────

pub(crate) async fn last_attempt(
    store: &dyn KeyValueStore,
    entity: &str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    get_json(store, &keys::last_attempt(entity)).await
}

pub(crate) async fn record_attempt(
    store: &dyn KeyValueStore,
    entity: &str,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    put_json(store, &keys::last_attempt(entity), &now, None).await
}

/// Appends one line to the day's human-readable update log.
pub(crate) async fn append_update_log(
    store: &dyn KeyValueStore,
    now: DateTime<Utc>,
    line: &str,
) -> Result<(), StoreError> {
    let key = keys::update_log(now.date_naive());
    let mut text = store
        .get(&key)
        .await?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    text.push_str(&format!("[{}] {line}\n", now.format("%H:%M:%S")));
    store.put(&key, Bytes::from(text), Some(UPDATE_LOG_TTL)).await
}

// ────────────────────────────────────────────────────────────────────────────
// Runner
// ────────────────────────────────────────────────────────────────────────────

pub struct SyncRunner {
    store: Arc<dyn KeyValueStore>,
    gateway: ModelGateway,
    models: Vec<String>,
    cooldown: chrono::Duration,
    /// Pause between successive model calls. Tests zero this.
    pub inter_call_delay: Duration,
}

impl SyncRunner {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        gateway: ModelGateway,
        models: Vec<String>,
        cooldown: chrono::Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            models,
            cooldown,
            inter_call_delay: DEFAULT_INTER_CALL_DELAY,
        }
    }

    /// Refreshes both party ballots sequentially. One entity's failure does
    /// not stop its sibling; invalid credentials or an exhausted quota stop
    /// the whole batch.
    pub async fn run(&self, force: bool) -> Result<SyncReport, AppError> {
        let mut outcomes = Vec::new();
        let mut halted = None;

        for (index, party) in Party::primaries().into_iter().enumerate() {
            if index > 0 && !outcomes.iter().all(Self::was_skipped) {
                tokio::time::sleep(self.inter_call_delay).await;
            }
            let (outcome, halt) = self.refresh_ballot(party, force).await?;
            if halt {
                if let SyncOutcome::Failed { reason } = &outcome {
                    halted = Some(reason.clone());
                }
            }
            outcomes.push(EntityOutcome {
                entity: keys::ballot(party),
                outcome,
            });
            if halted.is_some() {
                break;
            }
        }

        Ok(SyncReport { outcomes, halted })
    }

    fn was_skipped(outcome: &EntityOutcome) -> bool {
        matches!(outcome.outcome, SyncOutcome::Skipped { .. })
    }

    /// One entity's full refresh. The boolean asks the caller to halt the
    /// batch (credentials/quota failures only).
    async fn refresh_ballot(
        &self,
        party: Party,
        force: bool,
    ) -> Result<(SyncOutcome, bool), AppError> {
        let entity = keys::ballot(party);
        let now = Utc::now();

        let last = last_attempt(self.store.as_ref(), &entity).await?;
        if let Eligibility::Skipped { next_eligible } =
            check_cooldown(last, now, self.cooldown, force)
        {
            info!("{entity}: on cooldown until {next_eligible}, skipping");
            return Ok((SyncOutcome::Skipped { next_eligible }, false));
        }

        let Some(ballot) = get_json::<Ballot>(self.store.as_ref(), &entity).await? else {
            let reason = format!("no canonical ballot stored for {party}");
            warn!("{entity}: {reason}");
            self.finish_failed(&entity, &reason, now).await?;
            return Ok((SyncOutcome::Failed { reason }, false));
        };

        info!("{entity}: refreshing {} races", ballot.races.len());
        let mut refreshed = ballot.clone();
        let mut updated = 0usize;
        let mut failed = 0usize;

        for (index, race) in ballot.races.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inter_call_delay).await;
            }
            let seat = race.seat();

            let prompt = build_refresh_prompt(&ballot, race)?;
            let reply = match self.gateway.invoke(REFRESH_SYSTEM, &prompt, &self.models).await {
                Ok(reply) => reply,
                Err(e) if e.is_run_stopping() => {
                    let reason = e.to_string();
                    error!("{entity}: halting at '{seat}': {reason}");
                    self.finish_failed(&entity, &reason, now).await?;
                    return Ok((SyncOutcome::Failed { reason }, true));
                }
                Err(e) => {
                    warn!("{entity}: race '{seat}' skipped, models unavailable: {e}");
                    failed += 1;
                    continue;
                }
            };

            let update = match parse_structured::<RaceUpdate>(&reply) {
                Ok(extracted) => extracted.into_inner(),
                Err(e) => {
                    warn!("{entity}: race '{seat}' reply unusable: {e}");
                    failed += 1;
                    continue;
                }
            };

            match apply_race_refresh(race, &update) {
                Ok(race) => {
                    refreshed.races[index] = race;
                    updated += 1;
                }
                Err(violation) => {
                    warn!("{entity}: race '{seat}' update rejected: {violation}");
                    failed += 1;
                }
            }
        }

        if updated == 0 {
            let reason = format!("0 of {} races could be refreshed", ballot.races.len());
            warn!("{entity}: {reason}");
            self.finish_failed(&entity, &reason, now).await?;
            return Ok((SyncOutcome::Failed { reason }, false));
        }

        put_json(self.store.as_ref(), &entity, &refreshed, None).await?;

        let mut manifest: Manifest = get_json(self.store.as_ref(), keys::MANIFEST)
            .await?
            .unwrap_or_default();
        let Some(version) = manifest.bump(party, now) else {
            // Undecided never reaches the runner.
            let reason = format!("{party} has no manifest slot");
            self.finish_failed(&entity, &reason, now).await?;
            return Ok((SyncOutcome::Failed { reason }, false));
        };
        put_json(self.store.as_ref(), keys::MANIFEST, &manifest, None).await?;

        append_update_log(
            self.store.as_ref(),
            now,
            &format!(
                "{entity} refreshed: {updated}/{} races, version {version}",
                ballot.races.len()
            ),
        )
        .await?;
        record_attempt(self.store.as_ref(), &entity, now).await?;

        info!("{entity}: refresh complete, {updated} updated / {failed} failed, version {version}");
        Ok((
            SyncOutcome::Succeeded {
                version,
                races_updated: updated,
                races_failed: failed,
            },
            false,
        ))
    }

    async fn finish_failed(
        &self,
        entity: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        append_update_log(
            self.store.as_ref(),
            now,
            &format!("{entity} refresh failed: {reason}"),
        )
        .await?;
        record_attempt(self.store.as_ref(), entity, now).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

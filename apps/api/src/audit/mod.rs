//! Independent audit cycle: external reviewer models score the published
//! ballot content, one record per provider plus a cross-provider rollup.
//!
//! Shares the sync module's cooldown and update-log bookkeeping; providers
//! run sequentially and a credentials failure on one halts the rest.

pub mod handlers;
pub mod prompts;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::audit::prompts::{build_audit_prompt, AUDIT_SYSTEM};
use crate::errors::AppError;
use crate::gateway::ModelGateway;
use crate::models::audit::{AuditScoreRecord, AuditSummary};
use crate::models::ballot::{Ballot, Party};
use crate::parser::{parse_scores, ParseError, ParseMethod};
use crate::store::{get_json, keys, put_json, KeyValueStore};
use crate::sync::{
    append_update_log, check_cooldown, last_attempt, record_attempt, Eligibility,
    DEFAULT_INTER_CALL_DELAY,
};

/// Dimension vocabulary reviewers score against. The prose parser tier
/// accepts only these names.
pub const AUDIT_DIMENSIONS: [&str; 5] =
    ["accuracy", "balance", "completeness", "clarity", "usefulness"];

/// One reviewer: a provider name plus the gateway and model list it scores
/// through. Kept separate per provider so reviews stay independent of the
/// generation stack.
pub struct AuditProvider {
    pub name: String,
    pub gateway: ModelGateway,
    pub models: Vec<String>,
}

/// Terminal state of one provider's audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AuditOutcome {
    #[serde(rename_all = "camelCase")]
    Scored {
        overall_score: f64,
        method: ParseMethod,
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
pub struct ProviderOutcome {
    pub provider: String,
    #[serde(flatten)]
    pub outcome: AuditOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub outcomes: Vec<ProviderOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<AuditSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
}

pub struct AuditRunner {
    store: Arc<dyn KeyValueStore>,
    providers: Vec<AuditProvider>,
    cooldown: chrono::Duration,
    /// Pause between successive model calls. Tests zero this.
    pub inter_call_delay: Duration,
}

impl AuditRunner {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        providers: Vec<AuditProvider>,
        cooldown: chrono::Duration,
    ) -> Self {
        Self {
            store,
            providers,
            cooldown,
            inter_call_delay: DEFAULT_INTER_CALL_DELAY,
        }
    }

    /// Runs every configured reviewer against the currently published
    /// ballots. Failures are provider-local except credentials/quota, which
    /// halt the batch.
    pub async fn run(&self, force: bool) -> Result<AuditReport, AppError> {
        // Every provider reviews the same snapshot.
        let mut ballots = Vec::new();
        for party in Party::primaries() {
            if let Some(ballot) =
                get_json::<Ballot>(self.store.as_ref(), &keys::ballot(party)).await?
            {
                ballots.push(ballot);
            }
        }

        let mut outcomes: Vec<ProviderOutcome> = Vec::new();
        let mut halted = None;

        for (index, provider) in self.providers.iter().enumerate() {
            if index > 0 && !outcomes.iter().all(Self::was_skipped) {
                tokio::time::sleep(self.inter_call_delay).await;
            }
            let (outcome, halt) = self.audit_once(provider, &ballots, force).await?;
            if halt {
                if let AuditOutcome::Failed { reason } = &outcome {
                    halted = Some(reason.clone());
                }
            }
            outcomes.push(ProviderOutcome {
                provider: provider.name.clone(),
                outcome,
            });
            if halted.is_some() {
                break;
            }
        }

        let summary = get_json::<AuditSummary>(self.store.as_ref(), keys::AUDIT_SUMMARY).await?;
        Ok(AuditReport {
            outcomes,
            summary,
            halted,
        })
    }

    fn was_skipped(outcome: &ProviderOutcome) -> bool {
        matches!(outcome.outcome, AuditOutcome::Skipped { .. })
    }

    async fn audit_once(
        &self,
        provider: &AuditProvider,
        ballots: &[Ballot],
        force: bool,
    ) -> Result<(AuditOutcome, bool), AppError> {
        let entity = keys::audit(&provider.name);
        let now = Utc::now();

        let last = last_attempt(self.store.as_ref(), &entity).await?;
        if let Eligibility::Skipped { next_eligible } =
            check_cooldown(last, now, self.cooldown, force)
        {
            info!("{entity}: on cooldown until {next_eligible}, skipping");
            return Ok((AuditOutcome::Skipped { next_eligible }, false));
        }

        if ballots.is_empty() {
            let reason = "no ballots published to audit".to_string();
            warn!("{entity}: {reason}");
            self.finish_failed(&entity, &reason, now).await?;
            return Ok((AuditOutcome::Failed { reason }, false));
        }

        info!("{entity}: scoring {} ballots", ballots.len());
        let prompt = build_audit_prompt(ballots)?;
        let reply = match provider
            .gateway
            .invoke(AUDIT_SYSTEM, &prompt, &provider.models)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                let halt = e.is_run_stopping();
                let reason = e.to_string();
                if halt {
                    error!("{entity}: halting audits: {reason}");
                } else {
                    warn!("{entity}: models unavailable: {reason}");
                }
                self.finish_failed(&entity, &reason, now).await?;
                return Ok((AuditOutcome::Failed { reason }, halt));
            }
        };

        let extracted = match parse_scores(&reply, &AUDIT_DIMENSIONS) {
            Ok(extracted) => extracted,
            Err(e) => {
                let reason = e.to_string();
                warn!("{entity}: reply unusable: {reason}");
                self.finish_failed(&entity, &reason, now).await?;
                return Ok((AuditOutcome::Failed { reason }, false));
            }
        };
        let method = extracted.method();
        let sheet = extracted.into_inner();
        let Some(overall) = sheet.overall() else {
            let reason = ParseError::NoScores.to_string();
            warn!("{entity}: {reason}");
            self.finish_failed(&entity, &reason, now).await?;
            return Ok((AuditOutcome::Failed { reason }, false));
        };

        let record = AuditScoreRecord {
            overall_score: overall,
            dimensions: sheet.dimensions,
            top_strength: sheet.top_strength,
            top_weakness: sheet.top_weakness,
            method,
            provider: provider.name.clone(),
            generated_at: now,
        };
        put_json(self.store.as_ref(), &entity, &record, None).await?;
        self.rebuild_summary(now).await?;

        append_update_log(
            self.store.as_ref(),
            now,
            &format!("{entity} scored {overall:.1} overall via {method:?}"),
        )
        .await?;
        record_attempt(self.store.as_ref(), &entity, now).await?;

        info!("{entity}: scored {overall:.1} overall via {method:?}");
        Ok((
            AuditOutcome::Scored {
                overall_score: overall,
                method,
            },
            false,
        ))
    }

    /// Latest stored record for each configured provider.
    pub async fn latest_records(&self) -> Result<Vec<AuditScoreRecord>, AppError> {
        let mut records = Vec::new();
        for provider in &self.providers {
            if let Some(record) = get_json::<AuditScoreRecord>(
                self.store.as_ref(),
                &keys::audit(&provider.name),
            )
            .await?
            {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Latest record per provider, averaged. Persisted so readers never
    /// recompute.
    async fn rebuild_summary(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        let records = self.latest_records().await?;
        if let Some(summary) = AuditSummary::from_records(&records, now) {
            put_json(self.store.as_ref(), keys::AUDIT_SUMMARY, &summary, None).await?;
        }
        Ok(())
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
            &format!("{entity} audit failed: {reason}"),
        )
        .await?;
        record_attempt(self.store.as_ref(), entity, now).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

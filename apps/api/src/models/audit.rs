//! Audit records: independent quality scores for a published guide,
//! produced by external reviewer models and persisted per provider.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::ParseMethod;

/// One provider's scoring of the current guide. Superseded by the next
/// successful run for the same provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditScoreRecord {
    /// 1-10.
    pub overall_score: f64,
    /// Named dimension → 1-10. Missing dimensions are absent, never zero.
    pub dimensions: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_weakness: Option<String>,
    /// Which parser tier recovered the scores.
    pub method: ParseMethod,
    pub provider: String,
    pub generated_at: DateTime<Utc>,
}

/// Cross-provider rollup, recomputed whenever any provider record lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub average_overall: f64,
    pub provider_scores: BTreeMap<String, f64>,
    pub updated_at: DateTime<Utc>,
}

impl AuditSummary {
    /// Rollup over the latest record per provider. `None` when empty.
    pub fn from_records<'a, I>(records: I, now: DateTime<Utc>) -> Option<AuditSummary>
    where
        I: IntoIterator<Item = &'a AuditScoreRecord>,
    {
        let provider_scores: BTreeMap<String, f64> = records
            .into_iter()
            .map(|r| (r.provider.clone(), r.overall_score))
            .collect();
        if provider_scores.is_empty() {
            return None;
        }
        let average_overall =
            provider_scores.values().sum::<f64>() / provider_scores.len() as f64;
        Some(AuditSummary {
            average_overall,
            provider_scores,
            updated_at: now,
        })
    }
}

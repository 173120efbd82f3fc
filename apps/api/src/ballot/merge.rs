//! Merge engine: folds untrusted model output into the canonical ballot.
//!
//! Two distinct paths share this module:
//! - recommendation merge: applies an `AiResponseEnvelope` to a ballot copy,
//!   resolving proposals against the canonical candidate set;
//! - factual refresh: replaces candidate factual fields from a `RaceUpdate`
//!   after structural validation against the prior race.
//!
//! Both are pure functions over copies. Neither mutates its arguments, and
//! nothing here ever fabricates an entity the canonical ballot does not
//! already contain.

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::ballot::{Ballot, Race, RaceRecommendation};
use crate::models::envelope::{AiResponseEnvelope, RaceProposal, RaceUpdate};

// ────────────────────────────────────────────────────────────────────────────
// Recommendation merge
// ────────────────────────────────────────────────────────────────────────────

/// Applies a parsed envelope to a copy of `ballot` and returns the result.
///
/// Races are located by exact (office, district); candidates by exact name.
/// A proposal naming a candidate that is not on the ballot is dropped for
/// that race only (a mismatch means the model hallucinated, and hallucinated
/// names must never propagate). Races the envelope does not mention keep
/// whatever recommendation they already had.
pub fn merge_envelope(ballot: &Ballot, envelope: &AiResponseEnvelope) -> Ballot {
    let mut merged = ballot.clone();

    for proposal in &envelope.race_recommendations {
        let Some(race) = merged
            .races
            .iter_mut()
            .find(|r| r.office == proposal.office && r.district == proposal.district)
        else {
            debug!(
                "Envelope proposes recommendation for unknown race '{}', skipping",
                proposal.office
            );
            continue;
        };
        merge_race(race, proposal);
    }

    for proposal in &envelope.proposition_recommendations {
        let Some(prop) = merged
            .propositions
            .iter_mut()
            .find(|p| p.number == proposal.number)
        else {
            debug!(
                "Envelope proposes stance for unknown proposition {}, skipping",
                proposal.number
            );
            continue;
        };
        // Personalized fields are overwritten as a unit; factual context is
        // not touched by this path.
        prop.recommendation = Some(proposal.recommendation);
        prop.reasoning = Some(proposal.reasoning.clone());
        prop.caveats = proposal.caveats.clone();
        prop.confidence = proposal.confidence;
    }

    merged
}

fn merge_race(race: &mut Race, proposal: &RaceProposal) {
    // Clear first: after a merge the flags reflect this envelope alone.
    for candidate in &mut race.candidates {
        candidate.is_recommended = false;
    }

    let Some(candidate) = race
        .candidates
        .iter_mut()
        .find(|c| c.name == proposal.recommended_candidate)
    else {
        warn!(
            "Race '{}': proposed candidate '{}' is not on the ballot, dropping recommendation",
            race.seat(),
            proposal.recommended_candidate
        );
        race.recommendation = None;
        return;
    };

    candidate.is_recommended = true;
    // Id comes from the canonical candidate, never from the model.
    let candidate_id = candidate.id;
    let candidate_name = candidate.name.clone();

    race.recommendation = Some(RaceRecommendation {
        candidate_id,
        candidate_name,
        reasoning: proposal.reasoning.clone(),
        strategic_notes: proposal.strategic_notes.clone(),
        caveats: proposal.caveats.clone(),
        confidence: proposal.confidence,
    });
}

// ────────────────────────────────────────────────────────────────────────────
// Factual refresh
// ────────────────────────────────────────────────────────────────────────────

/// Why a race rejected its factual refresh. The whole race keeps its prior
/// data when any of these fire; other races in the batch are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefreshViolation {
    #[error("candidate count changed from {prior} to {new}")]
    CandidateCount { prior: usize, new: usize },

    #[error("prior candidate '{name}' is missing from the update")]
    MissingCandidate { name: String },

    #[error("update names unknown candidate '{name}'")]
    UnknownCandidate { name: String },

    #[error("candidate '{name}' endorsements would shrink from {prior} to {new}")]
    EndorsementsShrank {
        name: String,
        prior: usize,
        new: usize,
    },

    #[error("candidate '{name}' would have an empty {field}")]
    EmptyField { name: String, field: &'static str },
}

/// Replaces the factual fields of every candidate in a copy of `prior` and
/// returns it, after validating the update against the prior race.
/// `is_incumbent`, `is_recommended` and the race recommendation are
/// untouched by construction.
pub fn apply_race_refresh(prior: &Race, update: &RaceUpdate) -> Result<Race, RefreshViolation> {
    validate_refresh(prior, update)?;

    let mut race = prior.clone();
    for candidate in &mut race.candidates {
        // validate_refresh guarantees every prior name has exactly one match.
        let Some(u) = update.candidates.iter().find(|u| u.name == candidate.name) else {
            continue;
        };
        candidate.summary = u.summary.clone();
        candidate.background = u.background.clone();
        candidate.key_positions = u.key_positions.clone();
        candidate.endorsements = u.endorsements.clone();
        candidate.pros = u.pros.clone();
        candidate.cons = u.cons.clone();
        candidate.fundraising = u.fundraising.clone();
        candidate.polling = u.polling.clone();
    }
    Ok(race)
}

/// Structural invariants a refresh must hold against the prior race:
/// identical candidate count, identical name set, endorsement lists may not
/// shrink by more than half (when previously non-empty), and no summary may
/// become empty. An empty update name fails the set checks.
pub fn validate_refresh(prior: &Race, update: &RaceUpdate) -> Result<(), RefreshViolation> {
    if update.candidates.len() != prior.candidates.len() {
        return Err(RefreshViolation::CandidateCount {
            prior: prior.candidates.len(),
            new: update.candidates.len(),
        });
    }

    for u in &update.candidates {
        if prior.candidate_named(&u.name).is_none() {
            return Err(RefreshViolation::UnknownCandidate {
                name: u.name.clone(),
            });
        }
    }

    for candidate in &prior.candidates {
        let Some(u) = update.candidates.iter().find(|u| u.name == candidate.name) else {
            return Err(RefreshViolation::MissingCandidate {
                name: candidate.name.clone(),
            });
        };

        if !candidate.endorsements.is_empty()
            && u.endorsements.len() * 2 < candidate.endorsements.len()
        {
            return Err(RefreshViolation::EndorsementsShrank {
                name: candidate.name.clone(),
                prior: candidate.endorsements.len(),
                new: u.endorsements.len(),
            });
        }

        if u.summary.trim().is_empty() {
            return Err(RefreshViolation::EmptyField {
                name: candidate.name.clone(),
                field: "summary",
            });
        }
    }

    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

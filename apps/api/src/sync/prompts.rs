//! Prompt construction for the factual refresh cycle.
//!
//! One prompt per race. The model receives the current factual data and must
//! return the same candidate roster with refreshed fields; the validator in
//! `ballot::merge` rejects anything that drifts from that roster.

#![allow(dead_code)]

use serde_json::json;

use crate::errors::AppError;
use crate::models::ballot::{Ballot, Race};

/// System prompt for factual refresh; enforces JSON-only output.
pub const REFRESH_SYSTEM: &str = "You are a nonpartisan election researcher keeping factual \
    candidate data current. You report verifiable facts: filings, endorsements, fundraising \
    totals, public polling. You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent candidates, endorsements, or numbers.";

/// Refresh prompt. Replace `{election}`, `{seat}`, `{race_json}`,
/// `{candidate_names}`.
const REFRESH_PROMPT_TEMPLATE: &str = r#"Refresh the factual data for one primary race with what you know as of today.

ELECTION: {election}
RACE: {seat}

CURRENT DATA (may be stale):
{race_json}

Return a JSON object with this EXACT schema (no extra fields):
{
  "office": "string (copy unchanged)",
  "district": "string (copy unchanged; omit when the race is statewide)",
  "candidates": [
    {
      "name": "string (copy EXACTLY from CURRENT DATA)",
      "summary": "1-2 sentence current snapshot of the candidate",
      "background": "string",
      "keyPositions": ["string"],
      "endorsements": ["string"],
      "pros": ["string"],
      "cons": ["string"],
      "fundraising": "string (omit if unknown)",
      "polling": "string (omit if unknown)"
    }
  ]
}

HARD RULES:
1. Include EVERY candidate from CURRENT DATA and NO others: {candidate_names}
2. Copy each "name" EXACTLY as written. Never rename, add, or drop a candidate
3. Never return an emptier endorsement list than CURRENT DATA holds; keep entries you cannot verify
4. "summary" must never be empty
5. Report only verifiable facts. When nothing changed, return the current values
6. Return ONLY the JSON object, nothing else"#;

/// Builds the per-race refresh prompt. Factual fields only; recommendation
/// state never reaches the model.
pub fn build_refresh_prompt(ballot: &Ballot, race: &Race) -> Result<String, AppError> {
    let candidates: Vec<serde_json::Value> = race
        .candidates
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "summary": c.summary,
                "background": c.background,
                "keyPositions": c.key_positions,
                "endorsements": c.endorsements,
                "pros": c.pros,
                "cons": c.cons,
                "fundraising": c.fundraising,
                "polling": c.polling,
                "isIncumbent": c.is_incumbent,
            })
        })
        .collect();

    let race_json = serde_json::to_string_pretty(&json!({
        "office": race.office,
        "district": race.district,
        "candidates": candidates,
    }))
    .map_err(|e| AppError::Internal(e.into()))?;

    let names = race
        .candidates
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(REFRESH_PROMPT_TEMPLATE
        .replace(
            "{election}",
            &format!("{} ({})", ballot.election_name, ballot.election_date),
        )
        .replace("{seat}", &race.seat())
        .replace("{race_json}", &race_json)
        .replace("{candidate_names}", &names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::models::ballot::{Candidate, Confidence, Party, RaceRecommendation};

    fn fixture() -> (Ballot, Race) {
        let race = Race {
            id: Uuid::new_v4(),
            office: "Attorney General".to_string(),
            district: None,
            candidates: vec![
                Candidate {
                    id: Uuid::new_v4(),
                    name: "Jane Roe".to_string(),
                    is_incumbent: true,
                    is_recommended: true,
                    summary: "Incumbent attorney general.".to_string(),
                    background: "Former judge.".to_string(),
                    key_positions: vec!["Border enforcement".to_string()],
                    endorsements: vec!["State Fraternal Order".to_string()],
                    pros: vec![],
                    cons: vec![],
                    fundraising: Some("$2.1M raised".to_string()),
                    polling: None,
                },
                Candidate {
                    id: Uuid::new_v4(),
                    name: "John Den".to_string(),
                    is_incumbent: false,
                    is_recommended: false,
                    summary: "Challenger.".to_string(),
                    background: String::new(),
                    key_positions: vec![],
                    endorsements: vec![],
                    pros: vec![],
                    cons: vec![],
                    fundraising: None,
                    polling: None,
                },
            ],
            is_key_race: true,
            recommendation: Some(RaceRecommendation {
                candidate_id: Uuid::new_v4(),
                candidate_name: "Jane Roe".to_string(),
                reasoning: "Personalized reasoning that must stay private.".to_string(),
                strategic_notes: None,
                caveats: None,
                confidence: Confidence::Strong,
            }),
        };
        let ballot = Ballot {
            id: Uuid::new_v4(),
            party: Party::Republican,
            election_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            election_name: "2026 Republican Primary".to_string(),
            districts: None,
            races: vec![race.clone()],
            propositions: vec![],
        };
        (ballot, race)
    }

    #[test]
    fn test_prompt_names_the_closed_roster() {
        let (ballot, race) = fixture();
        let prompt = build_refresh_prompt(&ballot, &race).unwrap();
        assert!(prompt.contains("\"Jane Roe\", \"John Den\""));
        assert!(prompt.contains("RACE: Attorney General"));
        assert!(prompt.contains("2026 Republican Primary (2026-03-03)"));
    }

    #[test]
    fn test_prompt_excludes_recommendation_state() {
        let (ballot, race) = fixture();
        let prompt = build_refresh_prompt(&ballot, &race).unwrap();
        assert!(!prompt.contains("isRecommended"));
        assert!(!prompt.contains("Personalized reasoning"));
        assert!(!prompt.contains(&race.candidates[0].id.to_string()));
    }

    #[test]
    fn test_prompt_carries_current_factual_fields() {
        let (ballot, race) = fixture();
        let prompt = build_refresh_prompt(&ballot, &race).unwrap();
        assert!(prompt.contains("State Fraternal Order"));
        assert!(prompt.contains("$2.1M raised"));
        assert!(prompt.contains("\"isIncumbent\": true"));
    }
}

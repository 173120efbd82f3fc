//! Prompt construction for independent reviewer audits.

#![allow(dead_code)]

use serde_json::json;

use crate::errors::AppError;
use crate::models::ballot::Ballot;

/// System prompt for audit scoring; enforces JSON-only output.
pub const AUDIT_SYSTEM: &str = "You are an independent reviewer of election voting guides. \
    You evaluate guide content produced by another AI system for factual accuracy and \
    partisan balance. You are not the system under review. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Audit prompt. Replace `{guides_json}`.
const AUDIT_PROMPT_TEMPLATE: &str = r#"Review the published voting guide data below and score its quality.

GUIDE DATA:
{guides_json}

Score each dimension from 1 (unacceptable) to 10 (excellent):
- accuracy: are candidate facts, endorsements and numbers correct and current?
- balance: are candidates presented even-handedly, without partisan slant?
- completeness: are races, candidates and propositions covered thoroughly?
- clarity: is the writing plain, specific and readable for a lay voter?
- usefulness: would the recommendations actually help the stated voter decide?

Return a JSON object with this EXACT schema (no extra fields):
{
  "overallScore": 7.5,
  "dimensions": {
    "accuracy": 8,
    "balance": 7,
    "completeness": 8,
    "clarity": 9,
    "usefulness": 6
  },
  "topStrength": "one sentence",
  "topWeakness": "one sentence"
}

HARD RULES:
1. Every score is a number between 1 and 10 inclusive
2. Score ONLY the five dimensions listed above
3. Return ONLY the JSON object, nothing else"#;

/// Builds the reviewer prompt over every published ballot. Recommendation
/// content is included; it is what the reviewer grades.
pub fn build_audit_prompt(ballots: &[Ballot]) -> Result<String, AppError> {
    let guides: Vec<serde_json::Value> = ballots
        .iter()
        .map(|ballot| {
            json!({
                "party": ballot.party,
                "electionName": ballot.election_name,
                "electionDate": ballot.election_date,
                "races": ballot.races.iter().map(|race| {
                    json!({
                        "seat": race.seat(),
                        "isKeyRace": race.is_key_race,
                        "candidates": race.candidates.iter().map(|c| {
                            json!({
                                "name": c.name,
                                "isIncumbent": c.is_incumbent,
                                "summary": c.summary,
                                "endorsements": c.endorsements,
                            })
                        }).collect::<Vec<_>>(),
                        "recommendation": race.recommendation.as_ref().map(|rec| {
                            json!({
                                "candidateName": rec.candidate_name,
                                "reasoning": rec.reasoning,
                                "confidence": rec.confidence,
                            })
                        }),
                    })
                }).collect::<Vec<_>>(),
                "propositions": ballot.propositions.iter().map(|p| {
                    json!({
                        "number": p.number,
                        "title": p.title,
                        "recommendation": p.recommendation,
                        "reasoning": p.reasoning,
                    })
                }).collect::<Vec<_>>(),
            })
        })
        .collect();

    let guides_json =
        serde_json::to_string_pretty(&guides).map_err(|e| AppError::Internal(e.into()))?;

    Ok(AUDIT_PROMPT_TEMPLATE.replace("{guides_json}", &guides_json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::audit::AUDIT_DIMENSIONS;
    use crate::models::ballot::{Candidate, Confidence, Party, Race, RaceRecommendation};

    fn ballot() -> Ballot {
        Ballot {
            id: Uuid::new_v4(),
            party: Party::Republican,
            election_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            election_name: "2026 Republican Primary".to_string(),
            districts: None,
            races: vec![Race {
                id: Uuid::new_v4(),
                office: "U.S. Senator".to_string(),
                district: None,
                candidates: vec![Candidate {
                    id: Uuid::new_v4(),
                    name: "Jane Roe".to_string(),
                    is_incumbent: true,
                    is_recommended: true,
                    summary: "Incumbent senator.".to_string(),
                    background: String::new(),
                    key_positions: vec![],
                    endorsements: vec!["Farm Bureau".to_string()],
                    pros: vec![],
                    cons: vec![],
                    fundraising: None,
                    polling: None,
                }],
                is_key_race: true,
                recommendation: Some(RaceRecommendation {
                    candidate_id: Uuid::new_v4(),
                    candidate_name: "Jane Roe".to_string(),
                    reasoning: "Strongest record on stated priorities.".to_string(),
                    strategic_notes: None,
                    caveats: None,
                    confidence: Confidence::Strong,
                }),
            }],
            propositions: vec![],
        }
    }

    #[test]
    fn test_prompt_lists_every_scored_dimension() {
        let prompt = build_audit_prompt(&[ballot()]).unwrap();
        for dimension in AUDIT_DIMENSIONS {
            assert!(prompt.contains(&format!("\"{dimension}\"")), "{dimension} missing");
            assert!(prompt.contains(&format!("- {dimension}:")), "{dimension} missing");
        }
    }

    #[test]
    fn test_prompt_carries_recommendation_content_for_review() {
        let prompt = build_audit_prompt(&[ballot()]).unwrap();
        assert!(prompt.contains("Strongest record on stated priorities."));
        assert!(prompt.contains("\"candidateName\": \"Jane Roe\""));
        assert!(prompt.contains("Farm Bureau"));
    }

    #[test]
    fn test_prompt_excludes_internal_ids() {
        let b = ballot();
        let prompt = build_audit_prompt(&[b.clone()]).unwrap();
        assert!(!prompt.contains(&b.races[0].id.to_string()));
        assert!(!prompt.contains(&b.races[0].candidates[0].id.to_string()));
    }
}

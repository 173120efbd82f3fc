#![allow(dead_code)]

// Prompt construction for personalized guide generation. Pure string
// building; no network or storage access. The candidate name lists rendered
// here are the same closed set the merge engine later resolves against.

use serde_json::json;

use crate::errors::AppError;
use crate::gateway::prompts::CLOSED_SET_INSTRUCTION;
use crate::models::ballot::Ballot;
use crate::models::profile::VoterProfile;

/// System prompt for guide generation; enforces JSON-only output.
pub const GUIDE_SYSTEM: &str = "You are a nonpartisan election analyst producing a personalized \
    primary voting guide. You match a voter's stated priorities against factual candidate data. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Guide prompt template.
/// Replace: {closed_set_instruction}, {profile_block}, {races_json},
///          {propositions_json}, {candidate_lists}, {locale}
pub const GUIDE_PROMPT_TEMPLATE: &str = r#"{closed_set_instruction}

VOTER PROFILE:
{profile_block}

RACES (source of truth — base every claim on these fields only):
{races_json}

PROPOSITIONS:
{propositions_json}

VALID CANDIDATE NAMES per race (a recommendation outside these lists is discarded):
{candidate_lists}

LANGUAGE: write profileSummary, reasoning, strategicNotes and caveats in "{locale}".

Return a JSON object with this EXACT schema (no extra fields):
{
  "profileSummary": "One short paragraph describing this voter's priorities in plain language",
  "raceRecommendations": [
    {
      "office": "U.S. Senator",
      "district": null,
      "recommendedCandidate": "exact name from the valid list for that race",
      "reasoning": "Why this candidate fits the voter's stated priorities",
      "strategicNotes": "Optional electability or field context",
      "caveats": "Optional conflicts with the voter's stated views",
      "confidence": "strong"
    }
  ],
  "propositionRecommendations": [
    {
      "number": 7,
      "recommendation": "leanYes",
      "reasoning": "Why this stance follows from the voter's positions",
      "caveats": null,
      "confidence": "moderate"
    }
  ]
}

ENUM VALUES (use EXACTLY these literals):
- confidence: "strong" | "moderate" | "weak" | "symbolic"
- recommendation: "leanYes" | "leanNo" | "yourCall"

HARD RULES:
1. `recommendedCandidate` MUST be copied character-for-character from the valid candidate list for its race
2. `office` and `district` MUST echo the ballot values exactly; `district` is null for statewide races
3. Omit a race entirely rather than guessing; never fabricate a candidate
4. Base reasoning ONLY on the supplied factual fields and the voter profile, never on outside knowledge
5. Address every proposition; use "yourCall" when the voter's stated positions do not decide it
6. Keep reasoning specific: cite the voter priority and the candidate fact that connect"#;

/// Builds the complete guide prompt for one party's ballot.
///
/// The ballot is rendered without internal ids and without any existing
/// personalized fields, so the model sees factual data only and can never
/// echo an id back.
pub fn build_guide_prompt(
    profile: &VoterProfile,
    ballot: &Ballot,
    locale: &str,
) -> Result<String, AppError> {
    let races = ballot
        .races
        .iter()
        .map(|race| {
            json!({
                "office": race.office,
                "district": race.district,
                "isKeyRace": race.is_key_race,
                "isContested": race.is_contested(),
                "candidates": race.candidates.iter().map(|c| {
                    json!({
                        "name": c.name,
                        "isIncumbent": c.is_incumbent,
                        "summary": c.summary,
                        "background": c.background,
                        "keyPositions": c.key_positions,
                        "endorsements": c.endorsements,
                        "pros": c.pros,
                        "cons": c.cons,
                        "fundraising": c.fundraising,
                        "polling": c.polling,
                    })
                }).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();

    let propositions = ballot
        .propositions
        .iter()
        .map(|p| {
            json!({
                "number": p.number,
                "title": p.title,
                "description": p.description,
                "background": p.background,
                "fiscalImpact": p.fiscal_impact,
                "supporters": p.supporters,
                "opponents": p.opponents,
                "ifPasses": p.if_passes,
                "ifFails": p.if_fails,
            })
        })
        .collect::<Vec<_>>();

    let races_json = serde_json::to_string_pretty(&races)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize races: {e}")))?;
    let propositions_json = serde_json::to_string_pretty(&propositions)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize propositions: {e}")))?;

    Ok(GUIDE_PROMPT_TEMPLATE
        .replace("{closed_set_instruction}", CLOSED_SET_INSTRUCTION)
        .replace("{profile_block}", &render_profile(profile))
        .replace("{races_json}", &races_json)
        .replace("{propositions_json}", &propositions_json)
        .replace("{candidate_lists}", &render_candidate_lists(ballot))
        .replace("{locale}", locale))
}

/// Plain-text profile block. Priority order is preserved verbatim.
fn render_profile(profile: &VoterProfile) -> String {
    let mut out = format!("Party: {}\n", profile.party);

    if !profile.issue_priorities.is_empty() {
        out.push_str("Issue priorities (most important first):\n");
        for (i, issue) in profile.issue_priorities.iter().enumerate() {
            out.push_str(&format!("  {}. {issue}\n", i + 1));
        }
    }
    if let Some(spectrum) = &profile.political_spectrum {
        out.push_str(&format!("Political spectrum: {spectrum}\n"));
    }
    if !profile.policy_stances.is_empty() {
        out.push_str("Policy positions:\n");
        for stance in &profile.policy_stances {
            out.push_str(&format!("  - {}: {}\n", stance.topic, stance.position));
        }
    }
    if !profile.valued_qualities.is_empty() {
        out.push_str(&format!(
            "Qualities valued in candidates: {}\n",
            profile.valued_qualities.join(", ")
        ));
    }

    out
}

/// One line per race: the only legal `recommendedCandidate` values.
fn render_candidate_lists(ballot: &Ballot) -> String {
    ballot
        .races
        .iter()
        .map(|race| {
            let names = race
                .candidates
                .iter()
                .map(|c| format!("\"{}\"", c.name))
                .collect::<Vec<_>>()
                .join(" | ");
            format!("- {}: {}", race.seat(), names)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::models::ballot::{Candidate, Party, Race};
    use crate::models::profile::PolicyStance;

    fn candidate(name: &str) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_incumbent: false,
            is_recommended: false,
            summary: format!("{name} is a county official."),
            background: String::new(),
            key_positions: vec![],
            endorsements: vec![],
            pros: vec![],
            cons: vec![],
            fundraising: None,
            polling: None,
        }
    }

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
                candidates: vec![candidate("Cornyn"), candidate("Paxton")],
                is_key_race: true,
                recommendation: None,
            }],
            propositions: vec![],
        }
    }

    fn profile() -> VoterProfile {
        VoterProfile {
            party: Party::Republican,
            issue_priorities: vec!["border security".to_string(), "property taxes".to_string()],
            political_spectrum: Some("center-right".to_string()),
            policy_stances: vec![PolicyStance {
                topic: "energy".to_string(),
                position: "expand domestic production".to_string(),
            }],
            valued_qualities: vec!["integrity".to_string()],
        }
    }

    #[test]
    fn test_prompt_renders_closed_candidate_set() {
        let prompt = build_guide_prompt(&profile(), &ballot(), "en").unwrap();
        assert!(prompt.contains("- U.S. Senator: \"Cornyn\" | \"Paxton\""));
        assert!(prompt.contains("character-for-character"));
    }

    #[test]
    fn test_prompt_contains_schema_and_enum_literals() {
        let prompt = build_guide_prompt(&profile(), &ballot(), "en").unwrap();
        assert!(prompt.contains("\"raceRecommendations\""));
        assert!(prompt.contains("\"recommendedCandidate\""));
        assert!(prompt.contains("\"strong\" | \"moderate\" | \"weak\" | \"symbolic\""));
        assert!(prompt.contains("\"leanYes\" | \"leanNo\" | \"yourCall\""));
    }

    #[test]
    fn test_prompt_preserves_priority_order() {
        let prompt = build_guide_prompt(&profile(), &ballot(), "en").unwrap();
        let border = prompt.find("1. border security").unwrap();
        let taxes = prompt.find("2. property taxes").unwrap();
        assert!(border < taxes);
    }

    #[test]
    fn test_prompt_never_leaks_internal_ids() {
        let ballot = ballot();
        let prompt = build_guide_prompt(&profile(), &ballot, "en").unwrap();
        assert!(!prompt.contains(&ballot.id.to_string()));
        assert!(!prompt.contains(&ballot.races[0].id.to_string()));
        assert!(!prompt.contains(&ballot.races[0].candidates[0].id.to_string()));
    }

    #[test]
    fn test_prompt_embeds_locale() {
        let prompt = build_guide_prompt(&profile(), &ballot(), "es").unwrap();
        assert!(prompt.contains("in \"es\""));
    }

    #[test]
    fn test_profile_block_skips_absent_sections() {
        let bare = VoterProfile {
            party: Party::Democratic,
            issue_priorities: vec![],
            political_spectrum: None,
            policy_stances: vec![],
            valued_qualities: vec![],
        };
        let block = render_profile(&bare);
        assert_eq!(block, "Party: democratic\n");
    }
}

//! Canonical ballot entities: the human-curated source of truth that the
//! AI pipeline personalizes but must never corrupt.
//!
//! Field taxonomy matters here: candidate *factual* fields (summary,
//! background, endorsements, …) may be overwritten by a data-refresh cycle;
//! *personalized* fields (`is_recommended`, `Race::recommendation`,
//! proposition stances) are owned exclusively by the merge engine.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary party a ballot belongs to. `Undecided` voters receive both
/// primary guides; no canonical ballot is stored under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Republican,
    Democratic,
    Undecided,
}

impl Party {
    /// The two parties that carry canonical primary ballots.
    pub fn primaries() -> [Party; 2] {
        [Party::Republican, Party::Democratic]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Republican => "republican",
            Party::Democratic => "democratic",
            Party::Undecided => "undecided",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How firmly a recommendation is held. Rendered verbatim in prompts, so the
/// wire names below are also the only literals the model may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Strong,
    Moderate,
    Weak,
    Symbolic,
}

/// Stance on a ballot proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropositionStance {
    LeanYes,
    LeanNo,
    YourCall,
}

/// Voting districts resolved for one voter. A `None` jurisdiction means the
/// lookup could not resolve it; only the non-null values take part in race
/// filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congressional: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_senate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_house: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
}

impl DistrictSet {
    /// The resolved district identifiers, nulls excluded.
    pub fn known(&self) -> HashSet<&str> {
        [
            self.congressional.as_deref(),
            self.state_senate.as_deref(),
            self.state_house.as_deref(),
            self.county.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.known().is_empty()
    }
}

/// Root election document for one party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub id: Uuid,
    /// Immutable once assigned; no pipeline path rewrites it.
    pub party: Party,
    pub election_date: NaiveDate,
    pub election_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub districts: Option<DistrictSet>,
    pub races: Vec<Race>,
    #[serde(default)]
    pub propositions: Vec<Proposition>,
}

impl Ballot {
    pub fn race_count(&self) -> usize {
        self.races.len()
    }
}

/// A single contest. (office, district) is unique within a ballot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub id: Uuid,
    pub office: String,
    /// Absent ⇒ statewide / at-large.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub candidates: Vec<Candidate>,
    /// Curator flag for races worth surfacing prominently.
    #[serde(default)]
    pub is_key_race: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RaceRecommendation>,
}

impl Race {
    /// Derived, never stored.
    pub fn is_contested(&self) -> bool {
        self.candidates.len() > 1
    }

    pub fn candidate_named(&self, name: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.name == name)
    }

    /// Log/display label: `"U.S. Senator"` or `"State Representative (HD-48)"`.
    pub fn seat(&self) -> String {
        match &self.district {
            Some(d) => format!("{} ({})", self.office, d),
            None => self.office.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Uuid,
    /// Unique within a race; the closed set recommendations resolve against.
    pub name: String,
    #[serde(default)]
    pub is_incumbent: bool,
    /// Personalized. Exactly one candidate carries `true` in a race with a
    /// recommendation; none otherwise.
    #[serde(default)]
    pub is_recommended: bool,

    // Factual fields, the only ones a data-refresh cycle may overwrite.
    pub summary: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub key_positions: Vec<String>,
    #[serde(default)]
    pub endorsements: Vec<String>,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fundraising: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling: Option<String>,
}

/// Race-scoped recommendation. Built only by the merge engine, with
/// `candidate_id` always taken from the canonical candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceRecommendation {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategic_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<String>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposition {
    pub id: Uuid,
    pub number: u32,
    pub title: String,
    pub description: String,

    // Factual context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_impact: Option<String>,
    #[serde(default)]
    pub supporters: Vec<String>,
    #[serde(default)]
    pub opponents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_passes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_fails: Option<String>,

    // Personalized fields, overwritten as a unit by the merge engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<PropositionStance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_incumbent: false,
            is_recommended: false,
            summary: format!("{name} summary"),
            background: String::new(),
            key_positions: vec![],
            endorsements: vec![],
            pros: vec![],
            cons: vec![],
            fundraising: None,
            polling: None,
        }
    }

    #[test]
    fn test_party_wire_names_are_lowercase() {
        assert_eq!(serde_json::to_string(&Party::Republican).unwrap(), "\"republican\"");
        assert_eq!(serde_json::to_string(&Party::Undecided).unwrap(), "\"undecided\"");
        let p: Party = serde_json::from_str("\"democratic\"").unwrap();
        assert_eq!(p, Party::Democratic);
    }

    #[test]
    fn test_primaries_excludes_undecided() {
        assert!(!Party::primaries().contains(&Party::Undecided));
    }

    #[test]
    fn test_confidence_wire_names() {
        assert_eq!(serde_json::to_string(&Confidence::Symbolic).unwrap(), "\"symbolic\"");
        let c: Confidence = serde_json::from_str("\"moderate\"").unwrap();
        assert_eq!(c, Confidence::Moderate);
    }

    #[test]
    fn test_proposition_stance_wire_names_are_camel_case() {
        assert_eq!(serde_json::to_string(&PropositionStance::LeanYes).unwrap(), "\"leanYes\"");
        assert_eq!(serde_json::to_string(&PropositionStance::YourCall).unwrap(), "\"yourCall\"");
        let s: PropositionStance = serde_json::from_str("\"leanNo\"").unwrap();
        assert_eq!(s, PropositionStance::LeanNo);
    }

    #[test]
    fn test_race_contested_is_derived_from_candidate_count() {
        let mut race = Race {
            id: Uuid::new_v4(),
            office: "U.S. Senator".to_string(),
            district: None,
            candidates: vec![candidate("A")],
            is_key_race: false,
            recommendation: None,
        };
        assert!(!race.is_contested());
        race.candidates.push(candidate("B"));
        assert!(race.is_contested());
    }

    #[test]
    fn test_seat_label_includes_district_when_present() {
        let race = Race {
            id: Uuid::new_v4(),
            office: "State Representative".to_string(),
            district: Some("HD-48".to_string()),
            candidates: vec![],
            is_key_race: false,
            recommendation: None,
        };
        assert_eq!(race.seat(), "State Representative (HD-48)");
    }

    #[test]
    fn test_district_set_known_skips_nulls() {
        let districts = DistrictSet {
            congressional: Some("TX-10".to_string()),
            state_senate: None,
            state_house: Some("HD-48".to_string()),
            county: None,
        };
        let known = districts.known();
        assert_eq!(known.len(), 2);
        assert!(known.contains("TX-10"));
        assert!(known.contains("HD-48"));
        assert!(!DistrictSet::default().known().contains("TX-10"));
        assert!(DistrictSet::default().is_empty());
    }

    #[test]
    fn test_ballot_json_round_trip_uses_camel_case() {
        let ballot = Ballot {
            id: Uuid::new_v4(),
            party: Party::Republican,
            election_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            election_name: "2026 Republican Primary".to_string(),
            districts: None,
            races: vec![Race {
                id: Uuid::new_v4(),
                office: "Governor".to_string(),
                district: None,
                candidates: vec![candidate("Jane Roe")],
                is_key_race: true,
                recommendation: None,
            }],
            propositions: vec![],
        };

        let json = serde_json::to_string(&ballot).unwrap();
        assert!(json.contains("\"electionName\""));
        assert!(json.contains("\"isKeyRace\""));
        assert!(json.contains("\"electionDate\":\"2026-03-03\""));

        let back: Ballot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ballot);
    }

    #[test]
    fn test_candidate_optional_factual_fields_default_on_deserialize() {
        let json = r#"{
            "id": "8f1f4e34-2a52-4c8e-9d2f-0c9a6a1f3b77",
            "name": "Jane Roe",
            "summary": "County judge since 2018."
        }"#;
        let c: Candidate = serde_json::from_str(json).unwrap();
        assert!(!c.is_incumbent);
        assert!(!c.is_recommended);
        assert!(c.endorsements.is_empty());
        assert!(c.polling.is_none());
    }
}

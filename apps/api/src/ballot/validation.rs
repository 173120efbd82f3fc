//! Structural validation for curator ballot uploads.
//!
//! Uploads replace the canonical ballot wholesale, so the checks here are the
//! ones every downstream consumer assumes: seats are unique, candidate names
//! are unique and non-empty within a race, and any pre-seeded recommendation
//! points at a real candidate.

use std::collections::HashSet;

use thiserror::Error;

use crate::models::ballot::{Ballot, Party};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadViolation {
    #[error("no canonical ballot exists for undecided voters; upload a party primary")]
    UndecidedParty,
    #[error("ballot has no races")]
    NoRaces,
    #[error("duplicate race for seat '{seat}'")]
    DuplicateSeat { seat: String },
    #[error("race '{seat}' has no candidates")]
    NoCandidates { seat: String },
    #[error("race '{seat}' has a candidate with an empty name")]
    EmptyCandidateName { seat: String },
    #[error("race '{seat}' lists candidate '{name}' more than once")]
    DuplicateCandidate { seat: String, name: String },
    #[error("race '{seat}' recommends '{name}', which is not on the candidate list")]
    UnknownRecommendedCandidate { seat: String, name: String },
    #[error("proposition number {number} appears more than once")]
    DuplicatePropositionNumber { number: u32 },
}

/// Checks an uploaded ballot before it replaces the stored one. First
/// violation wins; nothing is persisted on failure.
pub fn validate_upload(ballot: &Ballot) -> Result<(), UploadViolation> {
    if ballot.party == Party::Undecided {
        return Err(UploadViolation::UndecidedParty);
    }
    if ballot.races.is_empty() {
        return Err(UploadViolation::NoRaces);
    }

    let mut seats = HashSet::new();
    for race in &ballot.races {
        let seat = race.seat();
        if !seats.insert(seat.clone()) {
            return Err(UploadViolation::DuplicateSeat { seat });
        }
        if race.candidates.is_empty() {
            return Err(UploadViolation::NoCandidates { seat });
        }

        let mut names = HashSet::new();
        for candidate in &race.candidates {
            let name = candidate.name.trim();
            if name.is_empty() {
                return Err(UploadViolation::EmptyCandidateName { seat });
            }
            if !names.insert(name.to_string()) {
                return Err(UploadViolation::DuplicateCandidate {
                    seat,
                    name: name.to_string(),
                });
            }
        }

        if let Some(rec) = &race.recommendation {
            if race.candidate_named(&rec.candidate_name).is_none() {
                return Err(UploadViolation::UnknownRecommendedCandidate {
                    seat,
                    name: rec.candidate_name.clone(),
                });
            }
        }
    }

    let mut numbers = HashSet::new();
    for proposition in &ballot.propositions {
        if !numbers.insert(proposition.number) {
            return Err(UploadViolation::DuplicatePropositionNumber {
                number: proposition.number,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::models::ballot::{Candidate, Confidence, Proposition, PropositionStance, Race, RaceRecommendation};

    fn candidate(name: &str) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            is_incumbent: false,
            is_recommended: false,
            summary: format!("{name} summary."),
            background: String::new(),
            key_positions: vec![],
            endorsements: vec![],
            pros: vec![],
            cons: vec![],
            fundraising: None,
            polling: None,
        }
    }

    fn race(office: &str, district: Option<&str>, names: &[&str]) -> Race {
        Race {
            id: Uuid::new_v4(),
            office: office.to_string(),
            district: district.map(|s| s.to_string()),
            candidates: names.iter().map(|n| candidate(n)).collect(),
            is_key_race: false,
            recommendation: None,
        }
    }

    fn proposition(number: u32) -> Proposition {
        Proposition {
            id: Uuid::new_v4(),
            number,
            title: format!("Prop {number}"),
            description: String::new(),
            background: None,
            fiscal_impact: None,
            supporters: vec![],
            opponents: vec![],
            if_passes: None,
            if_fails: None,
            recommendation: None,
            reasoning: None,
            caveats: None,
            confidence: None,
        }
    }

    fn ballot(races: Vec<Race>) -> Ballot {
        Ballot {
            id: Uuid::new_v4(),
            party: Party::Republican,
            election_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            election_name: "2026 Republican Primary".to_string(),
            districts: None,
            races,
            propositions: vec![],
        }
    }

    #[test]
    fn test_accepts_well_formed_ballot() {
        let mut b = ballot(vec![
            race("U.S. Senator", None, &["Cornyn", "Paxton"]),
            race("U.S. Representative", Some("TX-10"), &["A"]),
            race("U.S. Representative", Some("TX-21"), &["B"]),
        ]);
        b.propositions = vec![proposition(1), proposition(2)];
        assert_eq!(validate_upload(&b), Ok(()));
    }

    #[test]
    fn test_rejects_undecided_party() {
        let mut b = ballot(vec![race("Governor", None, &["X"])]);
        b.party = Party::Undecided;
        assert_eq!(validate_upload(&b), Err(UploadViolation::UndecidedParty));
    }

    #[test]
    fn test_rejects_empty_race_list() {
        assert_eq!(validate_upload(&ballot(vec![])), Err(UploadViolation::NoRaces));
    }

    #[test]
    fn test_rejects_duplicate_seat() {
        let b = ballot(vec![
            race("U.S. Representative", Some("TX-10"), &["A"]),
            race("U.S. Representative", Some("TX-10"), &["B"]),
        ]);
        assert_eq!(
            validate_upload(&b),
            Err(UploadViolation::DuplicateSeat {
                seat: "U.S. Representative (TX-10)".to_string()
            })
        );
    }

    #[test]
    fn test_same_office_different_district_is_fine() {
        let b = ballot(vec![
            race("U.S. Representative", Some("TX-10"), &["A"]),
            race("U.S. Representative", None, &["B"]),
        ]);
        assert_eq!(validate_upload(&b), Ok(()));
    }

    #[test]
    fn test_rejects_race_without_candidates() {
        let b = ballot(vec![race("Governor", None, &[])]);
        assert!(matches!(
            validate_upload(&b),
            Err(UploadViolation::NoCandidates { .. })
        ));
    }

    #[test]
    fn test_rejects_blank_and_duplicate_candidate_names() {
        let b = ballot(vec![race("Governor", None, &["  "])]);
        assert!(matches!(
            validate_upload(&b),
            Err(UploadViolation::EmptyCandidateName { .. })
        ));

        let b = ballot(vec![race("Governor", None, &["Abbott", "Abbott"])]);
        assert!(matches!(
            validate_upload(&b),
            Err(UploadViolation::DuplicateCandidate { .. })
        ));
    }

    #[test]
    fn test_rejects_recommendation_for_unknown_candidate() {
        let mut r = race("Governor", None, &["Abbott"]);
        r.recommendation = Some(RaceRecommendation {
            candidate_id: Uuid::new_v4(),
            candidate_name: "Nobody".to_string(),
            reasoning: String::new(),
            strategic_notes: None,
            caveats: None,
            confidence: Confidence::Weak,
        });
        assert!(matches!(
            validate_upload(&ballot(vec![r])),
            Err(UploadViolation::UnknownRecommendedCandidate { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_proposition_numbers() {
        let mut b = ballot(vec![race("Governor", None, &["X"])]);
        b.propositions = vec![proposition(7), proposition(7)];
        assert_eq!(
            validate_upload(&b),
            Err(UploadViolation::DuplicatePropositionNumber { number: 7 })
        );
    }

    #[test]
    fn test_proposition_stance_unused_fields_do_not_affect_validation() {
        let mut b = ballot(vec![race("Governor", None, &["X"])]);
        let mut p = proposition(3);
        p.recommendation = Some(PropositionStance::LeanYes);
        b.propositions = vec![p];
        assert_eq!(validate_upload(&b), Ok(()));
    }
}

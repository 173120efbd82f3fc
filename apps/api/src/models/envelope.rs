//! Wire shapes the models return. These are *proposals* keyed by natural
//! names (office, candidate name, proposition number); they never carry
//! canonical ids. The merge engine resolves them against the stored ballot
//! and discards anything that fails to resolve.

use serde::{Deserialize, Serialize};

use super::ballot::{Confidence, PropositionStance};

/// Top-level personalization envelope for one party's guide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_summary: Option<String>,
    #[serde(default)]
    pub race_recommendations: Vec<RaceProposal>,
    #[serde(default)]
    pub proposition_recommendations: Vec<PropositionProposal>,
}

/// One proposed race recommendation, keyed by (office, district).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceProposal {
    pub office: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    /// Must match a canonical candidate name exactly, or the proposal is
    /// skipped.
    pub recommended_candidate: String,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategic_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<String>,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropositionProposal {
    pub number: u32,
    pub recommendation: PropositionStance,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caveats: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

/// Factual-refresh payload for one race, as returned by the research model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceUpdate {
    pub office: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub candidates: Vec<CandidateUpdate>,
}

/// Replacement factual fields for one candidate. Identity and personalized
/// fields are absent on purpose: the refresh path may not touch them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateUpdate {
    pub name: String,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_tolerates_missing_sections() {
        let envelope: AiResponseEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.profile_summary.is_none());
        assert!(envelope.race_recommendations.is_empty());
        assert!(envelope.proposition_recommendations.is_empty());
    }

    #[test]
    fn test_envelope_parses_model_shaped_payload() {
        let json = r#"{
            "profileSummary": "A fiscally focused primary voter.",
            "raceRecommendations": [{
                "office": "U.S. Senator",
                "recommendedCandidate": "Jane Roe",
                "reasoning": "Closest match on spending restraint.",
                "strategicNotes": "Leads rural polling.",
                "confidence": "strong"
            }],
            "propositionRecommendations": [{
                "number": 7,
                "recommendation": "leanNo",
                "reasoning": "Conflicts with your stated tax priorities.",
                "confidence": "moderate"
            }]
        }"#;

        let envelope: AiResponseEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.race_recommendations.len(), 1);
        assert_eq!(envelope.race_recommendations[0].recommended_candidate, "Jane Roe");
        assert_eq!(envelope.race_recommendations[0].confidence, Confidence::Strong);
        assert_eq!(
            envelope.proposition_recommendations[0].recommendation,
            PropositionStance::LeanNo
        );
    }

    #[test]
    fn test_candidate_update_carries_no_recommendation_fields() {
        let json = r#"{
            "name": "Jane Roe",
            "summary": "Updated summary.",
            "endorsements": ["County GOP"],
            "isRecommended": true
        }"#;
        // Unknown fields are ignored; the refresh shape cannot smuggle
        // personalized state in.
        let update: CandidateUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.endorsements, vec!["County GOP"]);
        assert_eq!(
            serde_json::to_value(&update)
                .unwrap()
                .get("isRecommended"),
            None
        );
    }
}

//! Guide generation: orchestrates the personalization pipeline.
//!
//! Flow: resolve districts → load canonical ballot → filter → build prompt →
//!       model gateway → parse envelope → merge → return guide.
//!
//! Undecided voters get both primary guides, generated in parallel; the two
//! flows share no mutable state. District lookup failure degrades to an
//! unfiltered ballot; it never blocks generation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ballot::merge::merge_envelope;
use crate::districts::{filter_ballot, DistrictLocator, PostalAddress};
use crate::errors::AppError;
use crate::gateway::ModelGateway;
use crate::guide::prompts::{build_guide_prompt, GUIDE_SYSTEM};
use crate::models::ballot::{Ballot, DistrictSet, Party};
use crate::models::envelope::AiResponseEnvelope;
use crate::models::profile::VoterProfile;
use crate::parser::parse_structured;
use crate::store::{get_json, keys, KeyValueStore};

/// Request body for guide generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideRequest {
    pub profile: VoterProfile,
    #[serde(default)]
    pub address: Option<PostalAddress>,
    #[serde(default)]
    pub locale: Option<String>,
}

/// One party's personalized guide.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedGuide {
    pub party: Party,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_summary: Option<String>,
    pub ballot: Ballot,
}

/// Response from the generation pipeline. Two guides for undecided voters,
/// one otherwise.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideResponse {
    pub guides: Vec<PersonalizedGuide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub districts: Option<DistrictSet>,
}

/// Runs the full guide pipeline for one request.
pub async fn generate_guides(
    store: &dyn KeyValueStore,
    gateway: &ModelGateway,
    locator: Option<&dyn DistrictLocator>,
    models: &[String],
    request: GuideRequest,
) -> Result<GuideResponse, AppError> {
    let locale = request.locale.as_deref().unwrap_or("en");
    let districts = resolve_districts(locator, request.address.as_ref()).await;

    let guides = match request.profile.party {
        Party::Undecided => {
            info!("Undecided voter: generating both primary guides in parallel");
            let (republican, democratic) = tokio::join!(
                generate_one(
                    store,
                    gateway,
                    models,
                    &request.profile,
                    Party::Republican,
                    districts.as_ref(),
                    locale,
                ),
                generate_one(
                    store,
                    gateway,
                    models,
                    &request.profile,
                    Party::Democratic,
                    districts.as_ref(),
                    locale,
                ),
            );
            vec![republican?, democratic?]
        }
        party => vec![
            generate_one(
                store,
                gateway,
                models,
                &request.profile,
                party,
                districts.as_ref(),
                locale,
            )
            .await?,
        ],
    };

    Ok(GuideResponse { guides, districts })
}

/// District lookup with graceful degradation: any failure means "show all
/// races", never an error to the caller.
async fn resolve_districts(
    locator: Option<&dyn DistrictLocator>,
    address: Option<&PostalAddress>,
) -> Option<DistrictSet> {
    let (locator, address) = match (locator, address) {
        (Some(l), Some(a)) => (l, a),
        _ => return None,
    };
    match locator.locate(address).await {
        Ok(Some(districts)) => Some(districts),
        Ok(None) => {
            warn!("District lookup did not recognize the address; showing all races");
            None
        }
        Err(e) => {
            warn!("District lookup failed, showing all races: {e}");
            None
        }
    }
}

async fn generate_one(
    store: &dyn KeyValueStore,
    gateway: &ModelGateway,
    models: &[String],
    profile: &VoterProfile,
    party: Party,
    districts: Option<&DistrictSet>,
    locale: &str,
) -> Result<PersonalizedGuide, AppError> {
    // Step 1: canonical ballot.
    let ballot: Ballot = get_json(store, &keys::ballot(party))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No ballot published for the {party} primary")))?;

    // Step 2: jurisdiction filter, before the model ever sees the ballot.
    let ballot = match districts {
        Some(d) => filter_ballot(&ballot, d),
        None => ballot,
    };

    // Step 3: prompt and model call.
    let prompt = build_guide_prompt(profile, &ballot, locale)?;
    let reply = gateway.invoke(GUIDE_SYSTEM, &prompt, models).await?;

    // Step 4: parse and merge.
    let extracted = parse_structured::<AiResponseEnvelope>(&reply)?;
    debug!("Guide envelope parsed via {:?}", extracted.method());
    let envelope = extracted.into_inner();
    let merged = merge_envelope(&ballot, &envelope);

    info!(
        "Generated {} guide: {}/{} races recommended, {} proposition stances",
        party,
        merged.races.iter().filter(|r| r.recommendation.is_some()).count(),
        merged.races.len(),
        merged
            .propositions
            .iter()
            .filter(|p| p.recommendation.is_some())
            .count()
    );

    Ok(PersonalizedGuide {
        party,
        profile_summary: envelope.profile_summary,
        ballot: merged,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! District resolution and ballot filtering.
//!
//! The locator is a black box: address in, district identifiers out. Lookup
//! failure degrades to an unfiltered ballot (every race visible) rather than
//! blocking guide generation, so the filter itself never errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::ballot::{Ballot, DistrictSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Error)]
#[error("district lookup failed: {0}")]
pub struct LocateError(pub String);

impl From<reqwest::Error> for LocateError {
    fn from(e: reqwest::Error) -> Self {
        LocateError(e.to_string())
    }
}

/// Address → district identifiers. `Ok(None)` means the service did not
/// recognize the address.
#[async_trait]
pub trait DistrictLocator: Send + Sync {
    async fn locate(&self, address: &PostalAddress) -> Result<Option<DistrictSet>, LocateError>;
}

/// Talks to the configured geocoding endpoint.
#[derive(Clone)]
pub struct HttpDistrictLocator {
    client: Client,
    endpoint: String,
}

impl HttpDistrictLocator {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
        }
    }
}

#[async_trait]
impl DistrictLocator for HttpDistrictLocator {
    async fn locate(&self, address: &PostalAddress) -> Result<Option<DistrictSet>, LocateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(address)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LocateError(format!(
                "service returned status {}",
                response.status()
            )));
        }

        let districts: DistrictSet = response.json().await?;
        debug!("Districts resolved: {:?}", districts.known());
        Ok(Some(districts))
    }
}

/// Returns a copy of `ballot` holding only the races the voter can actually
/// vote in: statewide races, plus races whose district is among the resolved
/// values. Propositions and metadata pass through; `districts` is replaced
/// with the supplied set. Idempotent, and applied before prompt construction
/// so the model never sees out-of-jurisdiction races.
pub fn filter_ballot(ballot: &Ballot, districts: &DistrictSet) -> Ballot {
    let known = districts.known();
    let mut filtered = ballot.clone();
    filtered
        .races
        .retain(|race| match race.district.as_deref() {
            None => true,
            Some(d) => known.contains(d),
        });
    filtered.districts = Some(districts.clone());
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::models::ballot::{Party, Race};

    fn race(office: &str, district: Option<&str>) -> Race {
        Race {
            id: Uuid::new_v4(),
            office: office.to_string(),
            district: district.map(|s| s.to_string()),
            candidates: vec![],
            is_key_race: false,
            recommendation: None,
        }
    }

    fn ballot() -> Ballot {
        Ballot {
            id: Uuid::new_v4(),
            party: Party::Democratic,
            election_date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            election_name: "2026 Democratic Primary".to_string(),
            districts: None,
            races: vec![
                race("Governor", None),
                race("U.S. Representative", Some("TX-10")),
                race("U.S. Representative", Some("TX-21")),
                race("State Representative", Some("HD-48")),
            ],
            propositions: vec![],
        }
    }

    fn resolved() -> DistrictSet {
        DistrictSet {
            congressional: Some("TX-10".to_string()),
            state_senate: None,
            state_house: Some("HD-48".to_string()),
            county: None,
        }
    }

    #[test]
    fn test_filter_keeps_statewide_and_matching_districts() {
        let filtered = filter_ballot(&ballot(), &resolved());

        let offices: Vec<String> = filtered.races.iter().map(|r| r.seat()).collect();
        assert_eq!(
            offices,
            vec![
                "Governor",
                "U.S. Representative (TX-10)",
                "State Representative (HD-48)"
            ]
        );
        assert_eq!(filtered.districts, Some(resolved()));
    }

    #[test]
    fn test_filter_drops_races_in_unresolved_jurisdictions() {
        let mut districts = resolved();
        districts.state_house = None;

        let filtered = filter_ballot(&ballot(), &districts);

        assert!(filtered.races.iter().all(|r| r.district.as_deref() != Some("HD-48")));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let once = filter_ballot(&ballot(), &resolved());
        let twice = filter_ballot(&once, &resolved());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_with_empty_set_keeps_only_statewide() {
        let filtered = filter_ballot(&ballot(), &DistrictSet::default());
        assert_eq!(filtered.races.len(), 1);
        assert_eq!(filtered.races[0].office, "Governor");
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let original = ballot();
        let snapshot = original.clone();
        let _ = filter_ballot(&original, &resolved());
        assert_eq!(original, snapshot);
    }
}

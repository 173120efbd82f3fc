use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ballot::Party;

/// Per-party freshness marker. Consumers compare `version` against their
/// cache to decide whether to refetch the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub republican: Option<ManifestEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub democratic: Option<ManifestEntry>,
}

impl Manifest {
    pub fn entry(&self, party: Party) -> Option<&ManifestEntry> {
        match party {
            Party::Republican => self.republican.as_ref(),
            Party::Democratic => self.democratic.as_ref(),
            Party::Undecided => None,
        }
    }

    /// Current version for the party; 0 before the first refresh.
    pub fn version(&self, party: Party) -> i64 {
        self.entry(party).map(|e| e.version).unwrap_or(0)
    }

    /// Advance the party's version. Versions only ever increase. Returns the
    /// new version, or `None` for `Undecided` (which has no manifest slot).
    pub fn bump(&mut self, party: Party, now: DateTime<Utc>) -> Option<i64> {
        let slot = match party {
            Party::Republican => &mut self.republican,
            Party::Democratic => &mut self.democratic,
            Party::Undecided => return None,
        };
        let version = slot.as_ref().map(|e| e.version).unwrap_or(0) + 1;
        *slot = Some(ManifestEntry {
            updated_at: now,
            version,
        });
        Some(version)
    }
}

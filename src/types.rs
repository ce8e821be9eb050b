use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Province- or city-level administrative name as presented by the region catalog.
pub type Region = String;

/// Outcome of decomposing a free-text address.
///
/// Both fields are always decided by the same call; there is no "half done" state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub building: Option<String>,
    pub sub_locality: Option<String>,
}

impl Decomposition {
    pub fn new(building: Option<String>, sub_locality: Option<String>) -> Self {
        Self {
            building,
            sub_locality,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// One post office as listed in the directory, plus the derived address parts.
///
/// Field order here is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub name: String,
    pub municipality: String,
    pub address: String,
    pub zip_code: String,
    pub province: String,
    pub building: Option<String>,
    pub sub_locality: Option<String>,
}

/// Source of the list of valid regions.
#[async_trait::async_trait]
pub trait RegionCatalog: Send + Sync {
    /// Regions in whatever order the remote presents them. Not stable across calls.
    async fn list_regions(&self) -> Result<Vec<Region>>;
}

/// Fetches the raw facility listing for a single region.
#[async_trait::async_trait]
pub trait FacilityFetcher: Send + Sync {
    async fn fetch(&self, region: &str) -> Result<String>;
}

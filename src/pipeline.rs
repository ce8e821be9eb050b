use crate::address::AddressDecomposer;
use crate::apis::PhlpostClient;
use crate::cache::{DocumentOrigin, RegionCache};
use crate::config::Config;
use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::parser::FacilityTableParser;
use crate::types::{FacilityFetcher, FacilityRecord, Region, RegionCatalog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// What to do when one region cannot be fetched or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run and return the first region error.
    #[default]
    Abort,
    /// Record the failure against the region and carry on with the rest.
    Isolate,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionFailure {
    pub region: Region,
    pub error: String,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineRun {
    /// All records, region by region in catalog order.
    pub records: Vec<FacilityRecord>,
    /// Only ever populated under [`FailurePolicy::Isolate`].
    pub failures: Vec<RegionFailure>,
    pub regions_processed: usize,
    pub fetched: usize,
    pub cache_hits: usize,
}

/// Catalog → cache/fetch → parse, one region at a time.
pub struct Pipeline {
    catalog: Arc<dyn RegionCatalog>,
    fetcher: Arc<dyn FacilityFetcher>,
    cache: RegionCache,
    parser: FacilityTableParser,
    policy: FailurePolicy,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<dyn RegionCatalog>,
        fetcher: Arc<dyn FacilityFetcher>,
        cache: RegionCache,
        parser: FacilityTableParser,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            cache,
            parser,
            policy: FailurePolicy::default(),
        }
    }

    /// Wire the live PHLPost client, on-disk cache and configured parser together.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(PhlpostClient::new(config.source.clone())?);
        let decomposer = Arc::new(AddressDecomposer::new(config.locale_registry()));
        let parser = FacilityTableParser::new(config.table.clone(), decomposer);
        let cache = RegionCache::on_disk(config.cache.dir.clone());

        Ok(Self::new(client.clone(), client, cache, parser)
            .with_failure_policy(config.pipeline.failure_policy))
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Every region the catalog lists, in the order it lists them.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<PipelineRun> {
        let regions = self.catalog.list_regions().await?;
        self.run_regions(&regions).await
    }

    /// An explicit set of regions, in the given order. No deduplication across regions.
    #[instrument(skip(self, regions), fields(regions = regions.len(), policy = ?self.policy))]
    pub async fn run_regions(&self, regions: &[Region]) -> Result<PipelineRun> {
        info!("Starting pipeline over {} regions", regions.len());
        let mut run = PipelineRun::default();

        for region in regions {
            match self.process_region(region).await {
                Ok((records, origin)) => {
                    match origin {
                        DocumentOrigin::Cache => run.cache_hits += 1,
                        DocumentOrigin::Fetched => run.fetched += 1,
                    }
                    run.regions_processed += 1;
                    run.records.extend(records);
                }
                Err(e) => {
                    PipelineMetrics::record_region_failure(region);
                    match self.policy {
                        FailurePolicy::Abort => {
                            error!("Region {} failed, aborting run: {}", region, e);
                            return Err(e);
                        }
                        FailurePolicy::Isolate => {
                            warn!("Region {} failed, continuing: {}", region, e);
                            run.failures.push(RegionFailure {
                                region: region.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        info!(
            "Pipeline finished: {} records from {} regions ({} fetched, {} cached, {} failed)",
            run.records.len(),
            run.regions_processed,
            run.fetched,
            run.cache_hits,
            run.failures.len()
        );
        Ok(run)
    }

    async fn process_region(&self, region: &str) -> Result<(Vec<FacilityRecord>, DocumentOrigin)> {
        let fetcher = self.fetcher.clone();
        let (document, origin) = self
            .cache
            .lookup_or_fetch(region, |region| async move { fetcher.fetch(&region).await })
            .await?;
        let records = self.parser.parse(region, &document)?;
        Ok((records, origin))
    }
}

use anyhow::Result;
use phlpost_scraper::cache::{InMemoryRegionStore, RegionCache};
use phlpost_scraper::parser::FacilityTableParser;
use phlpost_scraper::types::{FacilityFetcher, RegionCatalog};
use phlpost_scraper::{FailurePolicy, Pipeline, ScraperError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

struct FixedCatalog(Vec<String>);

#[async_trait::async_trait]
impl RegionCatalog for FixedCatalog {
    async fn list_regions(&self) -> phlpost_scraper::Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct CountingFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl CountingFetcher {
    fn with_page(mut self, region: &str, html: &str) -> Self {
        self.pages.insert(region.to_string(), html.to_string());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FacilityFetcher for CountingFetcher {
    async fn fetch(&self, region: &str) -> phlpost_scraper::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(region)
            .cloned()
            .ok_or_else(|| ScraperError::UpstreamUnavailable(format!("no route to {region}")))
    }
}

fn listing(rows: &[(&str, &str, &str, &str)]) -> String {
    let mut html = String::from(
        "<h2>Result(s)</h2><table><tr><th>#</th><th>Post Office</th>\
         <th>Municipality/City</th><th>Address</th><th>Zip Code</th></tr>",
    );
    for (i, (name, municipality, address, zip)) in rows.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{name}</td><td>{municipality}</td><td>{address}</td><td>{zip}</td></tr>",
            i + 1
        ));
    }
    html.push_str("</table>");
    html
}

fn fixture_fetcher() -> CountingFetcher {
    CountingFetcher::default()
        .with_page(
            "Surigao del Sur",
            &listing(&[
                ("Lanuza PO", "Lanuza", "Municipal Bldg.,Lanuza, Surigao del Sur", "8314"),
                ("Tandag PO", "Tandag City", "Capitol Hills, Telaje, Tandag City", "8300"),
            ]),
        )
        .with_page(
            "Davao Del Norte / Compostela Valley",
            &listing(&[(
                "Tagum PO",
                "Tagum City",
                "Gaisano Mall, Quirante 2, Tagum City",
                "8100",
            )]),
        )
}

fn regions() -> Vec<String> {
    vec![
        "Surigao del Sur".to_string(),
        "Davao Del Norte / Compostela Valley".to_string(),
    ]
}

fn pipeline(fetcher: Arc<CountingFetcher>, cache: RegionCache) -> Pipeline {
    Pipeline::new(
        Arc::new(FixedCatalog(regions())),
        fetcher,
        cache,
        FacilityTableParser::default(),
    )
}

#[tokio::test]
async fn test_records_follow_catalog_order_with_province_attached() -> Result<()> {
    let fetcher = Arc::new(fixture_fetcher());
    let run = pipeline(fetcher.clone(), RegionCache::new(Arc::new(InMemoryRegionStore::new())))
        .run()
        .await?;

    let names: Vec<&str> = run.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Lanuza PO", "Tandag PO", "Tagum PO"]);
    assert_eq!(run.records[0].province, "Surigao del Sur");
    assert_eq!(run.records[2].province, "Davao Del Norte / Compostela Valley");

    assert_eq!(run.records[1].building.as_deref(), Some("Capitol Hills"));
    assert_eq!(run.records[1].sub_locality.as_deref(), Some("Telaje"));
    assert_eq!(run.records[2].building.as_deref(), Some("Gaisano Mall"));
    assert_eq!(run.records[2].sub_locality.as_deref(), Some("Quirante 2"));

    assert_eq!(run.fetched, 2);
    assert_eq!(fetcher.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_second_run_over_warm_disk_cache_fetches_nothing() -> Result<()> {
    let temp_dir = tempdir()?;
    let cache_dir = temp_dir.path().join("cache");

    let first_fetcher = Arc::new(fixture_fetcher());
    let first = pipeline(first_fetcher.clone(), RegionCache::on_disk(&cache_dir))
        .run()
        .await?;
    assert_eq!(first_fetcher.calls(), 2);

    // A fresh cache instance over the same directory, as on a later process start
    let second_fetcher = Arc::new(fixture_fetcher());
    let second = pipeline(second_fetcher.clone(), RegionCache::on_disk(&cache_dir))
        .run()
        .await?;

    assert_eq!(second_fetcher.calls(), 0);
    assert_eq!(second.cache_hits, 2);
    assert_eq!(first.records, second.records);
    assert!(cache_dir
        .join("Davao Del Norte _ Compostela Valley.html")
        .exists());
    Ok(())
}

#[tokio::test]
async fn test_abort_policy_propagates_first_region_failure() {
    let fetcher = Arc::new(fixture_fetcher());
    let err = pipeline(fetcher, RegionCache::new(Arc::new(InMemoryRegionStore::new())))
        .run_regions(&["Basilan".to_string(), "Surigao del Sur".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn test_isolate_policy_records_failure_and_continues() -> Result<()> {
    let fetcher = Arc::new(fixture_fetcher().with_page("Basilan", "<p>Under maintenance</p>"));
    let run = pipeline(fetcher, RegionCache::new(Arc::new(InMemoryRegionStore::new())))
        .with_failure_policy(FailurePolicy::Isolate)
        .run_regions(&[
            "Basilan".to_string(),
            "Sulu".to_string(),
            "Surigao del Sur".to_string(),
        ])
        .await?;

    assert_eq!(run.records.len(), 2);
    assert_eq!(run.regions_processed, 1);
    let failed: Vec<&str> = run.failures.iter().map(|f| f.region.as_str()).collect();
    assert_eq!(failed, vec!["Basilan", "Sulu"]);
    assert!(run.failures[0].error.contains("Unparsable document"));
    Ok(())
}

#[tokio::test]
async fn test_unparsable_cached_document_is_surfaced() -> Result<()> {
    let store = Arc::new(InMemoryRegionStore::new());
    phlpost_scraper::cache::RegionStore::put(&*store, "Basilan", "<p>truncated")?;

    let fetcher = Arc::new(fixture_fetcher());
    let err = pipeline(fetcher.clone(), RegionCache::new(store))
        .run_regions(&["Basilan".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::UnparsableDocument { .. }));
    assert_eq!(fetcher.calls(), 0);
    Ok(())
}

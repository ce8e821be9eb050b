use crate::config::SourceConfig;
use crate::error::{Result, ScraperError};
use crate::types::{FacilityFetcher, Region, RegionCatalog};
use reqwest::StatusCode;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// HTTP client for the PHLPost post office locator.
///
/// Serves both the region catalog and the per-region facility listing.
pub struct PhlpostClient {
    client: reqwest::Client,
    source: SourceConfig,
}

impl PhlpostClient {
    pub fn new(source: SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(source.timeout_seconds))
            .user_agent(source.user_agent.clone())
            .build()
            .map_err(|e| ScraperError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, source })
    }

    async fn read_body(&self, response: reqwest::Response, endpoint: &str) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, endpoint));
        }
        response
            .text()
            .await
            .map_err(|e| ScraperError::UpstreamUnavailable(format!("{endpoint}: {e}")))
    }
}

#[async_trait::async_trait]
impl RegionCatalog for PhlpostClient {
    #[instrument(skip(self), fields(url = %self.source.catalog_url))]
    async fn list_regions(&self) -> Result<Vec<Region>> {
        let url = &self.source.catalog_url;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScraperError::UpstreamUnavailable(format!("{url}: {e}")))?;
        let body = self.read_body(response, url).await?;

        let regions = regions_from_page(url, &body)?;
        info!("Region catalog lists {} regions", regions.len());
        Ok(regions)
    }
}

#[async_trait::async_trait]
impl FacilityFetcher for PhlpostClient {
    #[instrument(skip(self), fields(url = %self.source.listing_url))]
    async fn fetch(&self, region: &str) -> Result<String> {
        if self.source.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.source.delay_ms)).await;
        }

        let url = &self.source.listing_url;
        let form = [(self.source.region_field.as_str(), region)];
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ScraperError::UpstreamUnavailable(format!("{url}: {e}")))?;
        let body = listing_body(url, region, self.read_body(response, url).await?)?;
        debug!(bytes = body.len(), "fetched listing");
        Ok(body)
    }
}

/// Region list from a catalog page. A page without a usable selector counts as the
/// catalog being unavailable.
pub fn regions_from_page(url: &str, body: &str) -> Result<Vec<Region>> {
    extract_regions(body).ok_or_else(|| {
        ScraperError::UpstreamUnavailable(format!("{url}: page has no region selector"))
    })
}

/// Accept a listing body unless it is blank.
pub fn listing_body(url: &str, region: &str, body: String) -> Result<String> {
    if body.trim().is_empty() {
        return Err(ScraperError::UnexpectedResponseShape(format!(
            "{url}: empty listing for region '{region}'"
        )));
    }
    Ok(body)
}

/// Non-empty `<option value>`s of the page's `<select>`, in page order.
///
/// `None` when the page has no selector or only placeholder options.
pub fn extract_regions(html: &str) -> Option<Vec<Region>> {
    let document = Html::parse_document(html);
    let option_selector = Selector::parse("select option").expect("valid option selector");
    let regions: Vec<Region> = document
        .select(&option_selector)
        .filter_map(|option| option.value().attr("value"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();

    if regions.is_empty() {
        None
    } else {
        Some(regions)
    }
}

/// Server-side trouble is worth retrying; anything else means we asked for the wrong thing.
fn classify_status(status: StatusCode, endpoint: &str) -> ScraperError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ScraperError::UpstreamUnavailable(format!("{endpoint}: HTTP {}", status.as_u16()))
    } else {
        ScraperError::UnexpectedResponseShape(format!("{endpoint}: HTTP {}", status.as_u16()))
    }
}

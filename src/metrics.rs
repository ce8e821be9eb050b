//! Pipeline metrics, recorded through the `metrics` facade.
//!
//! Nothing here installs a recorder; without one every call is a no-op, which
//! keeps tests and the decomposer free of side effects beyond the log line.

/// Metric names, kept in one place so dashboards and code agree.
pub mod names {
    pub const REGIONS_FETCHED: &str = "phlpost_regions_fetched_total";
    pub const CACHE_HITS: &str = "phlpost_cache_hits_total";
    pub const FETCH_DURATION: &str = "phlpost_fetch_duration_seconds";
    pub const RECORDS_PARSED: &str = "phlpost_records_parsed_total";
    pub const REGION_FAILURES: &str = "phlpost_region_failures_total";
    pub const AMBIGUOUS_ADDRESSES: &str = "phlpost_ambiguous_addresses_total";
}

pub struct CacheMetrics;

impl CacheMetrics {
    pub fn record_hit() {
        ::metrics::counter!(names::CACHE_HITS).increment(1);
    }

    pub fn record_fetch(duration_secs: f64) {
        ::metrics::counter!(names::REGIONS_FETCHED).increment(1);
        ::metrics::histogram!(names::FETCH_DURATION).record(duration_secs);
    }
}

pub struct ParserMetrics;

impl ParserMetrics {
    pub fn record_parse_success(region: &str, records_produced: usize) {
        ::metrics::counter!(names::RECORDS_PARSED, "region" => region.to_string())
            .increment(records_produced as u64);
    }
}

pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn record_region_failure(region: &str) {
        ::metrics::counter!(names::REGION_FAILURES, "region" => region.to_string()).increment(1);
    }
}

pub struct DecomposerMetrics;

impl DecomposerMetrics {
    pub fn record_ambiguous() {
        ::metrics::counter!(names::AMBIGUOUS_ADDRESSES).increment(1);
    }
}

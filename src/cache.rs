use crate::constants::CACHE_EXTENSION;
use crate::error::{Result, ScraperError};
use crate::metrics::CacheMetrics;
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Key → raw document store backing the region cache.
///
/// Presence of a key means the region is never fetched again.
pub trait RegionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, document: &str) -> Result<()>;
}

/// One `<key>.html` file per region under a directory.
#[derive(Debug, Clone)]
pub struct FsRegionStore {
    dir: PathBuf,
}

impl FsRegionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{CACHE_EXTENSION}"))
    }
}

impl RegionStore for FsRegionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, document: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Write then rename so an interrupted run never leaves a truncated entry behind
        let tmp = path.with_extension(format!("{CACHE_EXTENSION}.tmp"));
        fs::write(&tmp, document)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory store for development/testing
#[derive(Debug, Default)]
pub struct InMemoryRegionStore {
    documents: Mutex<HashMap<String, String>>,
}

impl InMemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RegionStore for InMemoryRegionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(documents.get(key).cloned())
    }

    fn put(&self, key: &str, document: &str) -> Result<()> {
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents.insert(key.to_string(), document.to_string());
        Ok(())
    }
}

/// Where a document handed out by the cache came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOrigin {
    Cache,
    Fetched,
}

/// Region → raw listing document, fetching at most once per region.
///
/// Safe to share between tasks: a per-key async lock serializes the
/// check-fetch-store sequence for each region.
pub struct RegionCache {
    store: Arc<dyn RegionStore>,
    key_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    claimed_keys: Mutex<HashMap<String, String>>,
}

impl RegionCache {
    pub fn new(store: Arc<dyn RegionStore>) -> Self {
        Self {
            store,
            key_locks: Mutex::new(HashMap::new()),
            claimed_keys: Mutex::new(HashMap::new()),
        }
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsRegionStore::new(dir)))
    }

    /// Cached document for `region`, or the result of `fetch` after storing it.
    pub async fn get_or_fetch<F, Fut>(&self, region: &str, fetch: F) -> Result<String>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        self.lookup_or_fetch(region, fetch)
            .await
            .map(|(document, _)| document)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), also reporting whether a fetch happened.
    pub async fn lookup_or_fetch<F, Fut>(
        &self,
        region: &str,
        fetch: F,
    ) -> Result<(String, DocumentOrigin)>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let key = cache_key(region);
        self.claim(&key, region)?;

        let lock = self.lock_for(&key);
        let _guard = lock.lock().await;

        if let Some(document) = self.store.get(&key)? {
            debug!(region, key = %key, "cache hit");
            CacheMetrics::record_hit();
            return Ok((document, DocumentOrigin::Cache));
        }

        info!("Cache miss for {}, fetching", region);
        let started = std::time::Instant::now();
        let document = fetch(region.to_string()).await?;
        CacheMetrics::record_fetch(started.elapsed().as_secs_f64());

        self.store.put(&key, &document)?;
        Ok((document, DocumentOrigin::Fetched))
    }

    /// Bind `key` to `region` for the lifetime of this cache, refusing a second region.
    fn claim(&self, key: &str, region: &str) -> Result<()> {
        let mut claimed = self.claimed_keys.lock().unwrap_or_else(PoisonError::into_inner);
        match claimed.get(key) {
            Some(existing) if existing != region => Err(ScraperError::CacheKeyCollision {
                key: key.to_string(),
                existing: existing.clone(),
                incoming: region.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                claimed.insert(key.to_string(), region.to_string());
                Ok(())
            }
        }
    }

    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }
}

/// Filesystem-safe key for a region name.
///
/// Path separators, reserved punctuation and control characters become `_`.
/// Region names like "Davao Del Norte / Compostela Valley" are common upstream.
pub fn cache_key(region: &str) -> String {
    region
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

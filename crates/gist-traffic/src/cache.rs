//! Durable fixture store keyed by request fingerprint
//!
//! The store is a directory with one pretty-printed JSON file per
//! fingerprint:
//!
//! ```text
//! recorded_traffic/
//! ├── .lock
//! ├── 0c5e…91.json   { fingerprint, request, response }
//! └── f3a1…0d.json
//! ```
//!
//! Entries are content-addressed, so re-recording touches only the files of
//! the requests that were made and the diff does not depend on test order.
//! Writers take an exclusive `fs2` lock on `.lock` and replace the entry via
//! temp file + rename, so parallel test processes can record into the same
//! store. Readers take no lock and never write to the store, so replaying
//! works from a read-only checkout.

use crate::fingerprint::{fingerprint, Fingerprint};
use crate::http::{HttpRequest, HttpResponse};
use crate::sanitize::{sanitize_request, sanitize_response};
use fs2::FileExt;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

const LOCK_FILE: &str = ".lock";
const ENTRY_EXTENSION: &str = "json";

/// Errors raised by the fixture store
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("fixture store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt fixture {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CacheError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One archived request/response pair, both already sanitized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedInteraction {
    pub fingerprint: Fingerprint,
    pub request: HttpRequest,
    pub response: HttpResponse,
}

/// Counters for one `TrafficCache` instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

/// Fixture store rooted at a directory
#[derive(Debug)]
pub struct TrafficCache {
    dir: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl TrafficCache {
    /// Open (and create if needed) the store at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        debug!("Opened traffic cache at {}", dir.display());
        Ok(Self {
            dir,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the fixture file for a fingerprint
    pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.{}", fingerprint, ENTRY_EXTENSION))
    }

    /// Look up the response recorded for `request`
    pub fn get(&self, request: &HttpRequest) -> Result<Option<HttpResponse>> {
        let key = fingerprint(request);

        match self.read_entry(&key)? {
            Some(interaction) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache HIT for {} {} ({})",
                    request.method, request.path, key
                );
                Ok(Some(interaction.response))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache MISS for {} {} ({})",
                    request.method, request.path, key
                );
                Ok(None)
            }
        }
    }

    /// Whether a fixture exists for `request`
    pub fn contains(&self, request: &HttpRequest) -> bool {
        self.entry_path(&fingerprint(request)).is_file()
    }

    /// Archive `response` for `request`, replacing any previous entry
    pub fn set(&self, request: &HttpRequest, response: &HttpResponse) -> Result<()> {
        let interaction = CachedInteraction {
            fingerprint: fingerprint(request),
            request: sanitize_request(request),
            response: sanitize_response(response),
        };
        let path = self.entry_path(&interaction.fingerprint);

        let mut json = serde_json::to_string_pretty(&interaction).map_err(|source| {
            CacheError::Corrupt {
                path: path.clone(),
                source,
            }
        })?;
        json.push('\n');

        let _lock = self.lock()?;

        if let Ok(Some(previous)) = self.read_entry(&interaction.fingerprint) {
            if previous.response != interaction.response {
                info!(
                    "Overwriting recorded response for {} {} ({})",
                    interaction.request.method, interaction.request.path, interaction.fingerprint
                );
            }
        }

        let temp_path = path.with_extension(format!("{}.tmp", ENTRY_EXTENSION));
        {
            let mut file = File::create(&temp_path).map_err(io_err(&temp_path))?;
            file.write_all(json.as_bytes()).map_err(io_err(&temp_path))?;
            file.sync_all().map_err(io_err(&temp_path))?;
        }
        fs::rename(&temp_path, &path).map_err(io_err(&path))?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Recorded {} {} as {}",
            interaction.request.method, interaction.request.path, interaction.fingerprint
        );
        Ok(())
    }

    /// All archived interactions, ordered by fingerprint
    pub fn entries(&self) -> Result<Vec<CachedInteraction>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_err(&self.dir))? {
            let entry = entry.map_err(io_err(&self.dir))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(Fingerprint::parse)
            {
                keys.push(key);
            }
        }
        keys.sort();

        let mut interactions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(interaction) = self.read_entry(&key)? {
                interactions.push(interaction);
            }
        }
        Ok(interactions)
    }

    /// Number of archived interactions
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    fn read_entry(&self, key: &Fingerprint) -> Result<Option<CachedInteraction>> {
        let path = self.entry_path(key);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };
        let interaction = serde_json::from_str(&json)
            .map_err(|source| CacheError::Corrupt { path, source })?;
        Ok(Some(interaction))
    }

    /// Lock the store for writing; released when the returned file is dropped
    fn lock(&self) -> Result<File> {
        let path = self.dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err(&path))?;
        // Explicit fs2 call: std::fs::File has inherent lock methods since 1.89
        FileExt::lock_exclusive(&file).map_err(io_err(&path))?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store() -> (TempDir, TrafficCache) {
        let dir = TempDir::new().unwrap();
        let cache = TrafficCache::open(dir.path().join("recorded_traffic")).unwrap();
        (dir, cache)
    }

    fn get_gist(token: &str) -> HttpRequest {
        HttpRequest::get("/gists/abc")
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", token))
    }

    #[test]
    fn test_open_creates_directory() {
        let (_dir, cache) = store();
        assert!(cache.dir().is_dir());
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_reads_leave_store_untouched() {
        let (_dir, cache) = store();
        assert_eq!(cache.get(&get_gist("t")).unwrap(), None);
        assert!(!cache.contains(&get_gist("t")));
        assert!(cache.entries().unwrap().is_empty());

        let files: Vec<_> = fs::read_dir(cache.dir()).unwrap().collect();
        assert!(files.is_empty(), "reads created {:?}", files);
    }

    #[test]
    fn test_miss_then_hit() {
        let (_dir, cache) = store();
        let req = get_gist("real-token");
        assert_eq!(cache.get(&req).unwrap(), None);

        let resp = HttpResponse::new(200).body(r#"{"id":"abc"}"#);
        cache.set(&req, &resp).unwrap();

        assert_eq!(cache.get(&req).unwrap(), Some(resp));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                writes: 1
            }
        );
    }

    #[test]
    fn test_lookup_ignores_token_value() {
        let (_dir, cache) = store();
        cache
            .set(&get_gist("recorded-token"), &HttpResponse::new(200))
            .unwrap();
        assert!(cache.contains(&get_gist("dummy-token")));
        assert_eq!(
            cache.get(&get_gist("another")).unwrap(),
            Some(HttpResponse::new(200))
        );
    }

    #[test]
    fn test_persisted_request_has_no_credential() {
        let (_dir, cache) = store();
        let req = get_gist("ghp_supersecret");
        cache.set(&req, &HttpResponse::new(200)).unwrap();

        let raw = fs::read_to_string(cache.entry_path(&fingerprint(&req))).unwrap();
        assert!(!raw.contains("ghp_supersecret"));

        let entries = cache.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].request.header_value("authorization"),
            Some(crate::PLACEHOLDER_AUTHORIZATION)
        );
    }

    #[test]
    fn test_persisted_response_is_sanitized() {
        let (_dir, cache) = store();
        let req = get_gist("t");
        let resp = HttpResponse::new(200)
            .header("Date", "today")
            .header("X-RateLimit-Remaining", "59")
            .header("Content-Type", "application/json");
        cache.set(&req, &resp).unwrap();

        let stored = cache.get(&req).unwrap().unwrap();
        assert_eq!(stored, sanitize_response(&resp));
        assert_eq!(stored.headers.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let (_dir, cache) = store();
        let req = HttpRequest::delete("/gists/abc");
        cache.set(&req, &HttpResponse::new(204)).unwrap();
        cache.set(&req, &HttpResponse::new(404)).unwrap();

        assert_eq!(cache.get(&req).unwrap(), Some(HttpResponse::new(404)));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_entries_are_ordered_by_fingerprint() {
        let (_dir, cache) = store();
        for path in ["/gists/c", "/gists/a", "/gists/b"] {
            cache
                .set(&HttpRequest::get(path), &HttpResponse::new(200))
                .unwrap();
        }
        let keys: Vec<Fingerprint> = cache
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.fingerprint)
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_corrupt_fixture_is_reported() {
        let (_dir, cache) = store();
        let req = HttpRequest::get("/gists/broken");
        fs::write(cache.entry_path(&fingerprint(&req)), "not json").unwrap();

        match cache.get(&req) {
            Err(CacheError::Corrupt { path, .. }) => {
                assert_eq!(path.extension().and_then(|e| e.to_str()), Some("json"))
            }
            other => panic!("expected corrupt fixture error, got {:?}", other),
        }
    }

    #[test]
    fn test_reopened_store_serves_recorded_entries() {
        let (_dir, cache) = store();
        let req = get_gist("t");
        let resp = HttpResponse::new(200).body(vec![0u8, 159, 146, 150]);
        cache.set(&req, &resp).unwrap();

        let reopened = TrafficCache::open(cache.dir()).unwrap();
        assert_eq!(reopened.get(&req).unwrap(), Some(resp));
    }

    #[test]
    fn test_concurrent_writers_keep_store_consistent() {
        let (_dir, cache) = store();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        let req = HttpRequest::get(format!("/gists/{}", j));
                        let resp = HttpResponse::new(200).body(format!("writer {}", i));
                        cache.set(&req, &resp).unwrap();
                        assert!(cache.get(&req).unwrap().is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = cache.entries().unwrap();
        assert_eq!(entries.len(), 10);
        assert!(entries
            .iter()
            .all(|e| e.response.text().starts_with("writer ")));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_round_trip_is_byte_exact(
            path in "/gists/[a-z0-9]{1,12}",
            token in "[A-Za-z0-9]{1,20}",
            status in 100u16..600,
            body in prop::collection::vec(any::<u8>(), 0..256),
            content_type in "[a-z/+.-]{1,30}",
        ) {
            let (_dir, cache) = store();
            let req = HttpRequest::patch(path)
                .header("Authorization", format!("Bearer {}", token))
                .body(r#"{"files":{}}"#);
            let resp = HttpResponse::new(status)
                .header("Content-Type", content_type)
                .body(body);

            cache.set(&req, &resp).unwrap();
            prop_assert_eq!(cache.get(&req).unwrap(), Some(resp));
        }
    }
}

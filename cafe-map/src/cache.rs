//! Persisted cache of raw place-search responses.
//!
//! Every place-search call costs money, so raw responses are kept keyed by
//! the exact query term and consulted before any network call. The
//! [`ResultCache`] trait hides the backing medium; [`FileResultCache`]
//! stores a JSON document on disk and [`MemoryResultCache`] lives only for
//! the process.
//!
//! Entries never expire on their own. A freshness predicate can be
//! injected to treat old entries as misses.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Decides whether a cached entry may still be served.
pub type Freshness = Arc<dyn Fn(&CacheEntry) -> bool + Send + Sync>;

/// Freshness predicate that accepts entries younger than `max_age`.
pub fn max_age(max_age: Duration) -> Freshness {
    let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
    Arc::new(move |entry: &CacheEntry| Utc::now() - entry.fetched_at < max_age)
}

/// Errors from the cache backing store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One cached response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query_term: String,
    /// The raw response document, exactly as received.
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(query_term: impl Into<String>, payload: Value) -> Self {
        Self {
            query_term: query_term.into(),
            payload,
            fetched_at: Utc::now(),
        }
    }
}

/// Key → raw response store.
///
/// Implementations must be safe to share between workers; `put` is the
/// only mutation.
pub trait ResultCache: Send + Sync {
    /// Look up an entry by exact query term.
    fn get(&self, query_term: &str) -> Option<CacheEntry>;

    /// Write or overwrite the entry for `query_term`, persisting it.
    fn put(&self, query_term: &str, payload: Value) -> Result<(), CacheError>;

    /// Make sure everything written so far is durable.
    fn flush(&self) -> Result<(), CacheError>;

    /// Number of entries held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn serve(entry: Option<&CacheEntry>, fresh: Option<&Freshness>) -> Option<CacheEntry> {
    let entry = entry?;
    match fresh {
        Some(is_fresh) if !is_fresh(entry) => None,
        _ => Some(entry.clone()),
    }
}

/// In-process cache with no backing file.
#[derive(Default)]
pub struct MemoryResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    fresh: Option<Freshness>,
}

impl MemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat entries rejected by `fresh` as misses.
    pub fn with_freshness(mut self, fresh: Freshness) -> Self {
        self.fresh = Some(fresh);
        self
    }
}

impl ResultCache for MemoryResultCache {
    fn get(&self, query_term: &str) -> Option<CacheEntry> {
        serve(lock(&self.entries).get(query_term), self.fresh.as_ref())
    }

    fn put(&self, query_term: &str, payload: Value) -> Result<(), CacheError> {
        lock(&self.entries).insert(
            query_term.to_string(),
            CacheEntry::new(query_term, payload),
        );
        Ok(())
    }

    fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

/// On-disk layout: query term → stored response.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    entries: BTreeMap<String, StoredResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredResponse {
    payload: Value,
    fetched_at: DateTime<Utc>,
}

struct FileState {
    document: CacheDocument,
    /// Set when a write to disk failed; cleared by a successful flush.
    dirty: bool,
}

/// Cache persisted as a JSON document.
///
/// `put` writes through to disk. If a write fails the entry is still
/// served from memory, and the document is written again on the next
/// successful `put`, on `flush`, or when the cache is dropped.
pub struct FileResultCache {
    path: PathBuf,
    state: Mutex<FileState>,
    fresh: Option<Freshness>,
}

impl FileResultCache {
    /// Open the cache at `path`, reading any existing document.
    ///
    /// A missing file is an empty cache. An unreadable or corrupt file is
    /// an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();

        let document = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheDocument::default(),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        debug!(path = %path.display(), entries = document.entries.len(), "loaded result cache");

        Ok(Self {
            path,
            state: Mutex::new(FileState {
                document,
                dirty: false,
            }),
            fresh: None,
        })
    }

    /// Treat entries rejected by `fresh` as misses.
    pub fn with_freshness(mut self, fresh: Freshness) -> Self {
        self.fresh = Some(fresh);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, state: &mut FileState) -> Result<(), CacheError> {
        state.dirty = true;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(&state.document)?;

        // Sibling file + rename: the document on disk is always whole.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;

        state.dirty = false;
        Ok(())
    }
}

impl ResultCache for FileResultCache {
    fn get(&self, query_term: &str) -> Option<CacheEntry> {
        let state = lock(&self.state);
        let entry = state
            .document
            .entries
            .get(query_term)
            .map(|stored| CacheEntry {
                query_term: query_term.to_string(),
                payload: stored.payload.clone(),
                fetched_at: stored.fetched_at,
            });
        serve(entry.as_ref(), self.fresh.as_ref())
    }

    fn put(&self, query_term: &str, payload: Value) -> Result<(), CacheError> {
        let mut state = lock(&self.state);
        state.document.entries.insert(
            query_term.to_string(),
            StoredResponse {
                payload,
                fetched_at: Utc::now(),
            },
        );
        self.write(&mut state)
    }

    fn flush(&self) -> Result<(), CacheError> {
        let mut state = lock(&self.state);
        if state.dirty {
            self.write(&mut state)?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        lock(&self.state).document.entries.len()
    }
}

impl Drop for FileResultCache {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush result cache");
        }
    }
}

//! A staleness-aware memo cache.
//!
//! Values are grouped by a "domain" (a namespace such as "image by id") and then, optionally, by a
//! key within that domain.  A domain can also hold a single value directly, which is used when a
//! whole structure is memoized rather than one entry of it.
//!
//! There is no per-entry expiry and no size bound: the cache is only ever cleared wholesale.
//! Before every access the cache decides whether it is stale.  If more than the check interval has
//! passed since the previous access, the watched file (if any) is stat'ed, and if its modification
//! time has advanced, everything is dropped.  Without a watched file, the interval alone decides.
//! Under heavy access the stat is skipped entirely.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant, SystemTime},
};

use log::{debug, trace, warn};

use crate::util::file_mtime;

type Value = Arc<dyn Any + Send + Sync>;

enum Slot {
    Whole(Value),
    Keyed(HashMap<String, Value>),
}

struct State {
    slots: HashMap<&'static str, Slot>,
    last_access: Instant,
    last_mtime: Option<SystemTime>,
    generation: u64,
}

impl State {
    fn flush(&mut self) {
        self.slots.clear();
        self.generation += 1;
    }

    fn lookup(&self, domain: &str, key: Option<&str>) -> Option<Value> {
        match (self.slots.get(domain)?, key) {
            (Slot::Whole(value), None) => Some(Arc::clone(value)),
            (Slot::Keyed(map), Some(key)) => map.get(key).map(Arc::clone),
            _ => None,
        }
    }
}

/// Memo cache shared by everything that belongs to one photo library.
pub struct Cache {
    state: Mutex<State>,
    check_interval: Duration,
    watched: Option<PathBuf>,
}

impl Cache {
    /// Creates a cache which is flushed whenever more than `check_interval` passes between two
    /// accesses.
    pub fn new(check_interval: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                slots: HashMap::new(),
                last_access: Instant::now(),
                last_mtime: None,
                generation: 0,
            }),
            check_interval,
            watched: None,
        }
    }

    /// Creates a cache which is flushed when the modification time of `path` advances.  The file
    /// is only stat'ed if more than `check_interval` has passed since the previous access; an
    /// interval of zero checks on every access.
    ///
    /// # Errors
    ///
    /// Fails if `path` can't be stat'ed.
    pub fn watching(path: impl Into<PathBuf>, check_interval: Duration) -> std::io::Result<Self> {
        let path = path.into();
        let mtime = file_mtime(&path)?;
        let cache = Self::new(check_interval);
        cache.state().last_mtime = Some(mtime);
        Ok(Self {
            watched: Some(path),
            ..cache
        })
    }

    /// The file whose modification time decides staleness, if any.
    pub fn watched_file(&self) -> Option<&Path> {
        self.watched.as_deref()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while locked leaves at worst an entry missing
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the state, flushing it first if it has gone stale.
    fn checked_state(&self) -> MutexGuard<'_, State> {
        let mut state = self.state();
        let now = Instant::now();

        if self.check_interval.is_zero()
            || now.duration_since(state.last_access) > self.check_interval
        {
            match &self.watched {
                None => {
                    state.flush();
                    debug!("{self} flushed after {:?} idle", self.check_interval);
                }
                Some(path) => match file_mtime(path) {
                    Ok(mtime) if state.last_mtime.is_none_or(|last| mtime > last) => {
                        state.last_mtime = Some(mtime);
                        state.flush();
                        debug!("{self} flushed, modification time advanced");
                    }
                    Ok(_) => {}
                    Err(err) => warn!("{self} unable to stat {}: {err}", path.display()),
                },
            }
        }

        state.last_access = now;
        state
    }

    /// Returns the value stored under `(domain, key)`, or the whole-domain value if `key` is
    /// `None`.  A value stored with a different type counts as a miss.
    pub fn get<T>(&self, domain: &'static str, key: Option<&str>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = self.checked_state().lookup(domain, key);
        match value.as_deref().and_then(|v| v.downcast_ref::<T>()) {
            Some(value) => {
                trace!("cache hit domain={domain}, key={key:?}");
                Some(value.clone())
            }
            None => {
                trace!("cache miss domain={domain}, key={key:?}");
                None
            }
        }
    }

    /// Like [`Cache::get`], but computes `default` on a miss.  The default is not stored.
    ///
    /// The lock is not held while `default` runs, so it may use the cache itself.
    pub fn get_or_else<T, F>(&self, domain: &'static str, key: Option<&str>, default: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.get(domain, key).unwrap_or_else(default)
    }

    /// Stores `value` under `(domain, key)`, or as the whole-domain value if `key` is `None`.
    /// Returns the stored value, so that call sites can compute, store and return in one go.
    pub fn set<T>(&self, domain: &'static str, key: Option<&str>, value: T) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        let stored: Value = Arc::new(value.clone());
        let mut state = self.checked_state();
        trace!("cache set domain={domain}, key={key:?}");

        match key {
            None => {
                state.slots.insert(domain, Slot::Whole(stored));
            }
            Some(key) => {
                let slot = state
                    .slots
                    .entry(domain)
                    .or_insert_with(|| Slot::Keyed(HashMap::new()));
                if let Slot::Whole(_) = slot {
                    *slot = Slot::Keyed(HashMap::new());
                }
                if let Slot::Keyed(map) = slot {
                    map.insert(key.to_string(), stored);
                }
            }
        }

        value
    }

    /// Returns true if something is stored under `(domain, key)`.  Does not count as an access.
    pub fn contains(&self, domain: &'static str, key: Option<&str>) -> bool {
        self.state().lookup(domain, key).is_some()
    }

    /// Drops every cached value.
    pub fn clear(&self) {
        self.state().flush();
        debug!("{self} cleared");
    }

    /// The number of times the cache has been flushed so far.
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// The number of cached values, counting each keyed entry and each whole-domain value once.
    pub fn len(&self) -> usize {
        self.state()
            .slots
            .values()
            .map(|slot| match slot {
                Slot::Whole(_) => 1,
                Slot::Keyed(map) => map.len(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.watched {
            Some(path) => write!(f, "[Cache based on {}]", path.display()),
            None => write!(f, "[Cache]"),
        }
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("watched", &self.watched)
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}

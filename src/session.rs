//! Cookie-keyed in-memory sessions
//!
//! A request starts (or resumes) its session lazily through
//! [`Exchange::session`](crate::routing::Exchange::session). Modified sessions
//! are written back when the exchange finishes or on an explicit commit.
//! Sessions idle for longer than the store's TTL expire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::logger;

const DEFAULT_TTL: Duration = Duration::from_secs(1440);

/// Saves of new sessions between two sweeps of expired ones
const PRUNE_INTERVAL: usize = 128;

#[derive(Debug)]
struct Stored {
    data: HashMap<String, String>,
    last_access: Instant,
}

impl Stored {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_access.elapsed() > ttl
    }
}

/// Shared session storage
#[derive(Debug)]
pub struct SessionStore {
    cookie_name: String,
    ttl: Duration,
    sessions: DashMap<Uuid, Stored>,
    created: AtomicUsize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new("NANOSESSID")
    }
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            ttl: DEFAULT_TTL,
            sessions: DashMap::new(),
            created: AtomicUsize::new(0),
        }
    }

    /// Set how long a session may stay idle
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resume the session for a known id, or start a fresh one
    ///
    /// Unknown and expired ids are never adopted; the client gets a new id
    /// instead.
    pub fn start(&self, id: Option<&str>) -> Session {
        if let Some(uuid) = id.and_then(|id| Uuid::parse_str(id).ok()) {
            let resumed = self.sessions.get_mut(&uuid).and_then(|mut stored| {
                if stored.is_expired(self.ttl) {
                    return None;
                }
                stored.last_access = Instant::now();
                Some(stored.data.clone())
            });
            if let Some(data) = resumed {
                return Session {
                    id: uuid,
                    data,
                    is_new: false,
                    modified: false,
                };
            }
            self.sessions
                .remove_if(&uuid, |_, stored| stored.is_expired(self.ttl));
        }
        Session {
            id: Uuid::new_v4(),
            data: HashMap::new(),
            is_new: true,
            modified: false,
        }
    }

    /// Write session data back to the store
    ///
    /// Unmodified sessions are left alone; returns whether anything was
    /// written.
    pub fn save(&self, session: &Session) -> bool {
        if !session.modified {
            return false;
        }
        let stored = Stored {
            data: session.data.clone(),
            last_access: Instant::now(),
        };
        if self.sessions.insert(session.id, stored).is_none()
            && self.created.fetch_add(1, Ordering::Relaxed) % PRUNE_INTERVAL == PRUNE_INTERVAL - 1
        {
            self.prune();
        }
        true
    }

    /// Drop every expired session; returns how many were removed
    pub fn prune(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, stored| !stored.is_expired(self.ttl));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            logger::log_debug(&format!("Pruned {removed} expired sessions"));
        }
        removed
    }

    /// Drop a session; returns whether it existed
    pub fn remove(&self, id: &str) -> bool {
        Uuid::parse_str(id).is_ok_and(|uuid| self.sessions.remove(&uuid).is_some())
    }

    pub fn contains(&self, id: &str) -> bool {
        Uuid::parse_str(id).is_ok_and(|uuid| self.sessions.contains_key(&uuid))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Working copy of one session
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    data: HashMap<String, String>,
    is_new: bool,
    modified: bool,
}

impl Session {
    /// Id as sent in the session cookie
    pub fn id(&self) -> String {
        self.id.simple().to_string()
    }

    /// Whether the client has not seen this session id yet
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether the data changed since the session was started
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
        self.modified = true;
    }

    pub fn delete(&mut self, key: &str) -> Option<String> {
        let removed = self.data.remove(key);
        self.modified |= removed.is_some();
        removed
    }
}

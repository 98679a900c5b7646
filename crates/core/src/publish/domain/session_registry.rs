use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::publish::domain::emission_gate::EmissionGate;
use crate::publish::domain::landmark_sink::LandmarkSink;

const SESSION_ID_LEN: usize = 20;

/// Opaque identifier of one connected client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random 20-character alphanumeric id.
    pub fn generate() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Session {
    gate: EmissionGate,
    sink: Box<dyn LandmarkSink>,
}

/// Live sessions, each with its own emission gate and outbound sink.
///
/// Written by the network layer, read by the publisher on the production
/// thread. `connect`/`disconnect` report the 0->1 and 1->0 transitions
/// that drive production start and pause.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Session>>,
    emit_interval: Duration,
}

impl SessionRegistry {
    pub fn new(emit_interval: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            emit_interval,
        }
    }

    /// Registers a session. Returns true when it is the only one.
    ///
    /// Re-registering a known id replaces its sink and resets its gate.
    pub fn connect(&self, id: SessionId, sink: Box<dyn LandmarkSink>) -> bool {
        let mut first = false;
        self.connect_with(id, sink, || first = true);
        first
    }

    /// Like [`connect`](Self::connect), but runs `on_first` while the
    /// registry is still locked, so transition reports from concurrent
    /// connects and disconnects keep the order of the transitions.
    pub fn connect_with(&self, id: SessionId, sink: Box<dyn LandmarkSink>, on_first: impl FnOnce()) {
        let mut sessions = self.lock();
        sessions.insert(
            id,
            Session {
                gate: EmissionGate::new(self.emit_interval),
                sink,
            },
        );
        if sessions.len() == 1 {
            on_first();
        }
    }

    /// Removes a session. Returns true when this left the registry empty;
    /// unknown ids are ignored and return false.
    pub fn disconnect(&self, id: &SessionId) -> bool {
        let mut last = false;
        self.disconnect_with(id, || last = true);
        last
    }

    /// Removes a session, running `on_last` under the lock if this left
    /// the registry empty. Returns whether `id` was registered.
    pub fn disconnect_with(&self, id: &SessionId, on_last: impl FnOnce()) -> bool {
        let mut sessions = self.lock();
        let removed = sessions.remove(id).is_some();
        if removed && sessions.is_empty() {
            on_last();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Calls `deliver` for every session whose gate is open at `now`.
    /// Returns how many sessions were throttled.
    pub fn for_each_due(
        &self,
        now: Instant,
        mut deliver: impl FnMut(&SessionId, &dyn LandmarkSink),
    ) -> usize {
        let mut throttled = 0;
        for (id, session) in self.lock().iter_mut() {
            if session.gate.try_acquire(now) {
                deliver(id, session.sink.as_ref());
            } else {
                throttled += 1;
            }
        }
        throttled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

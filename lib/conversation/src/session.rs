//! Conversation session management.
//!
//! Sessions hold the bounded turn history of one conversation, keyed by the
//! client-supplied [`SessionKey`]. The store hands out a [`SessionGuard`]
//! that serializes work on one session while leaving other sessions free.

use crate::error::SessionError;
use crate::message::ConversationTurn;
use chrono::{DateTime, Duration, Utc};
use concierge_core::SessionKey;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Session-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of turns kept per session. Oldest turns are dropped first.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Sessions idle longer than this are removed by [`SessionStore::sweep`].
    #[serde(default = "default_idle_ttl_seconds")]
    pub idle_ttl_seconds: u64,

    /// Soft cap on the number of stored sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Interval between background sweeps, in seconds.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_max_turns() -> usize {
    14
}

fn default_idle_ttl_seconds() -> u64 {
    1800
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            idle_ttl_seconds: default_idle_ttl_seconds(),
            max_sessions: default_max_sessions(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl SessionConfig {
    /// Sets the maximum number of turns kept per session.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Sets the idle time-to-live.
    #[must_use]
    pub fn with_idle_ttl_seconds(mut self, seconds: u64) -> Self {
        self.idle_ttl_seconds = seconds;
        self
    }

    /// Sets the session cap.
    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }
}

/// Memory of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// The client correlation key.
    pub session_id: SessionKey,
    /// Turns, oldest first.
    turns: VecDeque<ConversationTurn>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When a turn was last appended.
    pub last_active_at: DateTime<Utc>,
}

impl SessionState {
    /// Creates an empty session.
    #[must_use]
    pub fn new(session_id: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            turns: VecDeque::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Returns the turns, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// Returns the number of stored turns.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if no turns are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns the most recent turn, if any.
    #[must_use]
    pub fn last_turn(&self) -> Option<&ConversationTurn> {
        self.turns.back()
    }

    /// How long the session has been idle at `now`.
    #[must_use]
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_active_at)
    }

    /// Appends a turn and drops whole turns from the head beyond `max_turns`.
    ///
    /// Returns the number of dropped turns.
    fn push_turn(&mut self, turn: ConversationTurn, max_turns: usize) -> usize {
        self.last_active_at = turn.timestamp.max(self.last_active_at);
        self.turns.push_back(turn);

        let mut dropped = 0;
        while self.turns.len() > max_turns {
            self.turns.pop_front();
            dropped += 1;
        }
        dropped
    }
}

/// Exclusive access to one session for the duration of a dispatch.
///
/// Dropping the guard releases the session on every exit path. A guard that
/// created its session and never appended to it can be handed back with
/// [`SessionGuard::discard`], which leaves the store as it was before
/// [`SessionStore::lock`].
pub struct SessionGuard<'a> {
    store: &'a SessionStore,
    slot: Slot,
    state: OwnedMutexGuard<SessionState>,
    created: bool,
}

impl SessionGuard<'_> {
    /// Returns the session key.
    #[must_use]
    pub fn session_id(&self) -> &SessionKey {
        &self.state.session_id
    }

    /// Returns the current session state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Appends a turn, applying the truncation policy.
    ///
    /// The first turn of a session counts it against the session cap, which
    /// may evict the least recently active idle session.
    pub fn append(&mut self, turn: ConversationTurn) {
        let was_empty = self.state.is_empty();
        let dropped = self.state.push_turn(turn, self.store.config.max_turns);
        if dropped > 0 {
            debug!(
                session_id = %self.state.session_id,
                dropped,
                "truncated session history"
            );
        }
        if was_empty {
            self.store.make_room();
        }
    }

    /// Releases the session, removing it if this guard created it and no
    /// turn was appended.
    pub fn discard(self) {
        if !self.created || !self.state.is_empty() {
            return;
        }

        let mut slots = self.store.write_slots();
        let session_id = &self.state.session_id;
        if slots
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, &self.slot))
        {
            slots.remove(session_id);
            debug!(%session_id, "discarded unused session");
        }
    }
}

/// Outcome of a [`SessionStore::sweep`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions removed for exceeding the idle TTL.
    pub expired: usize,
    /// Sessions removed to get back under the session cap.
    pub over_capacity: usize,
    /// Sessions left after the sweep.
    pub remaining: usize,
}

type Slot = Arc<Mutex<SessionState>>;

/// Process-wide store of conversation sessions.
///
/// The map itself sits behind a short-lived `RwLock` that is never held
/// across an await; each session has its own async mutex that a dispatch
/// holds from load to append.
pub struct SessionStore {
    config: SessionConfig,
    slots: RwLock<HashMap<SessionKey, Slot>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_slots().len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_slots().is_empty()
    }

    /// Acquires exclusive access to a session, creating it if absent.
    ///
    /// Waits while another dispatch holds the same session. Sessions with
    /// different keys never wait on each other. Creating a session never
    /// evicts another one; that happens on its first append.
    pub async fn lock(&self, session_id: &SessionKey) -> SessionGuard<'_> {
        loop {
            let (slot, created) = self.slot(session_id);
            let state = Arc::clone(&slot).lock_owned().await;

            // The slot may have been evicted while we waited; never hand out
            // a guard over a state the store no longer tracks.
            let still_current = self
                .read_slots()
                .get(session_id)
                .is_some_and(|current| Arc::ptr_eq(current, &slot));
            if still_current {
                return SessionGuard {
                    store: self,
                    slot,
                    state,
                    created,
                };
            }
        }
    }

    /// Returns a snapshot of a session, creating an empty one if absent.
    pub async fn load(&self, session_id: &SessionKey) -> SessionState {
        self.lock(session_id).await.state().clone()
    }

    /// Appends a turn to a session, creating the session if absent.
    pub async fn append(&self, session_id: &SessionKey, turn: ConversationTurn) {
        self.lock(session_id).await.append(turn);
    }

    /// Returns a snapshot of an existing session without creating one.
    pub async fn snapshot(&self, session_id: &SessionKey) -> Option<SessionState> {
        let slot = self.read_slots().get(session_id).cloned()?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// Removes a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if no session has this key, or
    /// [`SessionError::Busy`] if a dispatch currently holds it.
    pub fn evict(&self, session_id: &SessionKey) -> Result<(), SessionError> {
        let mut slots = self.write_slots();
        let Some(slot) = slots.get(session_id) else {
            return Err(SessionError::NotFound {
                session_id: session_id.clone(),
            });
        };
        if slot.try_lock().is_err() {
            return Err(SessionError::Busy {
                session_id: session_id.clone(),
            });
        }

        slots.remove(session_id);
        info!(%session_id, "evicted session");
        Ok(())
    }

    /// Removes idle sessions and enforces the session cap.
    ///
    /// Sessions locked by an in-flight dispatch are skipped.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let ttl = Duration::seconds(i64::try_from(self.config.idle_ttl_seconds).unwrap_or(i64::MAX));
        let mut slots = self.write_slots();

        let before = slots.len();
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(state) => state.idle_for(now) < ttl,
            Err(_) => true,
        });
        let expired = before - slots.len();

        let mut over_capacity = 0;
        while slots.len() > self.config.max_sessions {
            if Self::evict_least_recent(&mut slots).is_none() {
                break;
            }
            over_capacity += 1;
        }

        let report = SweepReport {
            expired,
            over_capacity,
            remaining: slots.len(),
        };
        if report.expired > 0 || report.over_capacity > 0 {
            info!(
                expired = report.expired,
                over_capacity = report.over_capacity,
                remaining = report.remaining,
                "swept sessions"
            );
        }
        report
    }

    fn slot(&self, session_id: &SessionKey) -> (Slot, bool) {
        if let Some(slot) = self.read_slots().get(session_id) {
            return (Arc::clone(slot), false);
        }

        let mut slots = self.write_slots();
        if let Some(slot) = slots.get(session_id) {
            return (Arc::clone(slot), false);
        }

        let slot = Arc::new(Mutex::new(SessionState::new(session_id.clone())));
        slots.insert(session_id.clone(), Arc::clone(&slot));
        debug!(%session_id, "created session");
        (slot, true)
    }

    fn make_room(&self) {
        let mut slots = self.write_slots();
        while slots.len() > self.config.max_sessions {
            if Self::evict_least_recent(&mut slots).is_none() {
                warn!(
                    sessions = slots.len(),
                    max_sessions = self.config.max_sessions,
                    "session cap reached with every session busy"
                );
                break;
            }
        }
    }

    fn evict_least_recent(slots: &mut HashMap<SessionKey, Slot>) -> Option<SessionKey> {
        let victim = slots
            .iter()
            .filter_map(|(key, slot)| {
                slot.try_lock()
                    .ok()
                    .map(|state| (key.clone(), state.last_active_at))
            })
            .min_by_key(|(_, last_active_at)| *last_active_at)
            .map(|(key, _)| key)?;

        slots.remove(&victim);
        debug!(session_id = %victim, "evicted least recently active session");
        Some(victim)
    }

    fn read_slots(&self) -> RwLockReadGuard<'_, HashMap<SessionKey, Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self) -> RwLockWriteGuard<'_, HashMap<SessionKey, Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

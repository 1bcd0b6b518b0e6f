//! The member/offer store with write-ahead event logging.
//!
//! One `RwLock` guards the engine and the log together. A write holds it
//! across validate, append and execute, so no reader ever sees an event
//! that is validated but not yet applied.
//!
//! Write-ahead order:
//!   1. engine.check(event)   rejection leaves no trace
//!   2. event_log.append()    fsynced before anything becomes visible
//!   3. engine.execute(event) plain map mutation, cannot fail

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bieter_engine::domain::{MemberView, Payload, Phase, PhaseView, Rules};
use bieter_engine::engine::BieterEngine;
use bieter_engine::error::ValidationError;
use bieter_engine::events::Event;
use bieter_engine::hashing::canonical_hash;
use bieter_engine::state::StoreState;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::event_log::{EventLog, EventLogError};
use crate::id_gen::{IdGenerator, IdSpaceExhausted};
use crate::proto_bridge::event_to_record;
use crate::replay;

/// Message returned to callers for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Interner Fehler";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Log(#[from] EventLogError),

    #[error(transparent)]
    IdSpace(#[from] IdSpaceExhausted),
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    /// What the end user may see. Internal details stay in the server log.
    pub fn for_client(&self) -> String {
        match self {
            StoreError::Validation(err) => err.for_client(),
            StoreError::Log(_) | StoreError::IdSpace(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

struct Inner {
    engine: BieterEngine,
    log: EventLog,
}

/// Thread-safe store. Readers share the lock, writers serialize.
pub struct Store {
    inner: RwLock<Inner>,
    rules: Rules,
    ids: IdGenerator,
}

impl Store {
    /// Open the log at `log_path` and rebuild state by replaying it.
    pub fn open(log_path: &Path, rules: Rules, ids: IdGenerator) -> Result<Self, StoreError> {
        let log = EventLog::open(log_path).map_err(|err| {
            error!(path = %log_path.display(), error = %err, "cannot open event log");
            err
        })?;
        let engine = replay::rebuild_engine(&log).map_err(|err| {
            error!(path = %log_path.display(), error = %err, "cannot replay event log");
            err
        })?;

        info!(
            path = %log_path.display(),
            events = engine.applied(),
            members = engine.state().members.len(),
            phase = %engine.state().phase,
            "store rebuilt from event log"
        );

        Ok(Self {
            inner: RwLock::new(Inner { engine, log }),
            rules,
            ids,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::open(&config.store.log_path, config.rules(), config.id_generator())
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    // ── Reads ──────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Option<Payload> {
        self.read().engine.state().members.get(id).cloned()
    }

    pub fn list(&self) -> BTreeMap<String, Payload> {
        self.read().engine.state().members.clone()
    }

    /// Every member with its offer, taken under one read lock.
    pub fn members(&self) -> Vec<MemberView> {
        self.read().engine.state().member_views()
    }

    /// Offer of `id`, 0 when absent.
    pub fn offer(&self, id: &str) -> i64 {
        self.read().engine.state().offer(id)
    }

    pub fn phase(&self) -> Phase {
        self.read().engine.state().phase
    }

    pub fn phase_view(&self) -> PhaseView {
        self.phase().into()
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> StoreState {
        self.read().engine.state().clone()
    }

    pub fn state_hash(&self) -> String {
        canonical_hash(self.read().engine.state())
    }

    /// Sequence of the last durable event.
    pub fn sequence(&self) -> u64 {
        self.read().log.last_sequence()
    }

    // ── Writes ─────────────────────────────────────────────────────

    /// Register a member under a freshly generated ID.
    pub fn create(&self, raw: &[u8], as_admin: bool) -> Result<String, StoreError> {
        self.create_with_id("", raw, as_admin)
    }

    /// Register a member under `id`, or a generated ID when `id` is empty.
    pub fn create_with_id(&self, id: &str, raw: &[u8], as_admin: bool) -> Result<String, StoreError> {
        let payload = Payload::parse(raw)?;
        let mut inner = self.write();

        let id = if id.is_empty() {
            let state = inner.engine.state();
            self.ids
                .generate(&mut rand::thread_rng(), |candidate| state.contains_member(candidate))
                .map_err(|err| {
                    error!(error = %err, "member id space exhausted");
                    err
                })?
        } else {
            id.to_string()
        };

        let event = Event::create(&id, payload)?;
        Self::apply_locked(&mut inner, &event, as_admin)?;
        Ok(id)
    }

    pub fn update(&self, id: &str, raw: &[u8], as_admin: bool) -> Result<(), StoreError> {
        let event = Event::update(id, Payload::parse(raw)?);
        self.apply(&event, as_admin)
    }

    pub fn delete(&self, id: &str, as_admin: bool) -> Result<(), StoreError> {
        self.apply(&Event::delete(id), as_admin)
    }

    pub fn set_offer(&self, id: &str, amount: i64, as_admin: bool) -> Result<(), StoreError> {
        let event = Event::set_offer(id, amount, &self.rules)?;
        self.apply(&event, as_admin)
    }

    pub fn clear_offers(&self, as_admin: bool) -> Result<(), StoreError> {
        self.apply(&Event::clear_offers(), as_admin)
    }

    /// Move to the phase numbered `value` (1, 2 or 3).
    pub fn set_phase(&self, value: i64, as_admin: bool) -> Result<Phase, StoreError> {
        let event = Event::set_phase(value)?;
        let mut inner = self.write();
        Self::apply_locked(&mut inner, &event, as_admin)?;
        Ok(inner.engine.state().phase)
    }

    // ── Internals ──────────────────────────────────────────────────

    fn apply(&self, event: &Event, as_admin: bool) -> Result<(), StoreError> {
        let mut inner = self.write();
        Self::apply_locked(&mut inner, event, as_admin)
    }

    fn apply_locked(inner: &mut Inner, event: &Event, as_admin: bool) -> Result<(), StoreError> {
        if let Err(err) = inner.engine.check(event, as_admin) {
            debug!(event = %event, admin = as_admin, reason = %err, "event rejected");
            return Err(err.into());
        }

        let record = event_to_record(event, inner.log.next_sequence()).map_err(EventLogError::from)?;
        if let Err(err) = inner.log.append(&record) {
            error!(event = %event, sequence = record.sequence, error = %err, "event log append failed");
            return Err(err.into());
        }

        inner.engine.execute(event);
        info!(sequence = record.sequence, admin = as_admin, "{}", event);
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        // Execute never panics halfway, so a poisoned guard still holds
        // a consistent state.
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

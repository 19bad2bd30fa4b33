//! # Ledger
//!
//! The node's single writer. Owns the in-memory [`NameService`], the sled
//! store behind it and the clock that stamps every call.
//!
//! ## Call pipeline
//!
//! ```text
//! SignedEnvelope ──verify──▶ caller ──nonce > last?──▶ Call ──apply──▶ service
//!                                                                       │
//!                                     receipt ◀── persist snapshot+events+nonce
//! ```
//!
//! Reads take the shared lock and never touch disk. A call holds the write
//! lock from the nonce check through persistence, so calls are totally
//! ordered and each one lands on disk before the next starts.
//!
//! A call that fails still consumes its nonce; the envelope cannot be
//! replayed later when the failing condition no longer holds.

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use fns_contracts::{Event, NameService, ServiceError};
use fns_protocol::config::ServiceConfig;
use fns_protocol::envelope::{verify_envelope, EnvelopeError, SignedEnvelope};
use fns_protocol::storage::{DbError, FnsDb};
use fns_protocol::Address;

use crate::calls::Call;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the block-style timestamp every call executes at.
pub trait Clock: Send + Sync {
    /// Unix seconds.
    fn now(&self) -> u64;
}

/// Wall-clock time that never runs backwards. A backwards step of the
/// system clock holds the reading at the last value handed out.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn observe(&self, wall: u64) -> u64 {
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        self.observe(chrono::Utc::now().timestamp().max(0) as u64)
    }
}

/// A clock that only moves when told to. Used by tests and by replay tools.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self(AtomicU64::new(now))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("nonce {got} not above last accepted nonce {last} for {caller}")]
    StaleNonce { caller: Address, last: u64, got: u64 },

    #[error("invalid call payload: {0}")]
    InvalidCall(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

impl LedgerError {
    /// Short machine-readable class, used for metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Envelope(_) => "envelope",
            LedgerError::StaleNonce { .. } => "nonce",
            LedgerError::InvalidCall(_) => "payload",
            LedgerError::Service(e) => e.kind(),
            LedgerError::Storage(_) => "storage",
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// What the node reports back for an accepted call.
#[derive(Debug, Clone, Serialize)]
pub struct CallReceipt {
    pub id: Uuid,
    pub method: &'static str,
    pub caller: Address,
    pub nonce: u64,
    pub timestamp: u64,
    pub output: Value,
    pub events: Vec<Event>,
    /// Sequence number of the first event in the persisted log.
    pub first_event_seq: u64,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub struct Ledger {
    service: RwLock<NameService>,
    db: FnsDb,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// Loads the persisted service, or bootstraps a fresh one owned by
    /// `admin` when the store is empty. `admin` and `config` are ignored for
    /// an existing store.
    pub fn open(
        db: FnsDb,
        admin: Address,
        config: ServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        let service = match db.get_state::<NameService>()? {
            Some(service) => {
                tracing::info!(
                    tld = %service.config().base_tld,
                    admin = %service.admin(),
                    events = db.event_count(),
                    "loaded name service snapshot"
                );
                service
            }
            None => {
                let now = clock.now();
                let mut service = NameService::bootstrap(admin, config, now)?;
                let events = service.drain_events();
                db.persist_call(&service, &events, None)?;
                tracing::info!(
                    tld = %service.config().base_tld,
                    %admin,
                    events = events.len(),
                    "bootstrapped name service"
                );
                service
            }
        };

        Ok(Self {
            service: RwLock::new(service),
            db,
            clock,
        })
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Runs `f` against the current state under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&NameService) -> R) -> R {
        f(&self.service.read())
    }

    /// Verifies, executes and persists one signed call.
    pub fn submit(&self, envelope: &SignedEnvelope) -> Result<CallReceipt, LedgerError> {
        let caller = verify_envelope(envelope)?;
        let call: Call = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| LedgerError::InvalidCall(e.to_string()))?;

        let mut service = self.service.write();

        let last = self.db.get_nonce(&caller)?;
        if envelope.nonce <= last {
            return Err(LedgerError::StaleNonce {
                caller,
                last,
                got: envelope.nonce,
            });
        }

        let now = self.clock.now();
        let output = match call.apply(&mut *service, caller, now) {
            Ok(output) => output,
            Err(e) => {
                self.db.put_nonce(&caller, envelope.nonce)?;
                self.db.flush()?;
                tracing::info!(%caller, method = call.method(), error = %e, "call rejected");
                return Err(e.into());
            }
        };

        let events = service.drain_events();
        let next_seq = match self
            .db
            .persist_call(&*service, &events, Some((&caller, envelope.nonce)))
        {
            Ok(next_seq) => next_seq,
            Err(e) => {
                tracing::error!(%caller, method = call.method(), error = %e, "persist failed, reloading snapshot");
                match self.db.get_state::<NameService>() {
                    Ok(Some(stored)) => *service = stored,
                    Ok(None) => tracing::error!("no snapshot to reload"),
                    Err(reload) => tracing::error!(error = %reload, "snapshot reload failed"),
                }
                return Err(e.into());
            }
        };

        tracing::info!(
            %caller,
            method = call.method(),
            nonce = envelope.nonce,
            events = events.len(),
            "call applied"
        );

        Ok(CallReceipt {
            id: Uuid::new_v4(),
            method: call.method(),
            caller,
            nonce: envelope.nonce,
            timestamp: now,
            output,
            first_event_seq: next_seq - events.len() as u64,
            events,
        })
    }

    /// Last nonce accepted from `address`, or 0.
    pub fn nonce(&self, address: &Address) -> Result<u64, LedgerError> {
        Ok(self.db.get_nonce(address)?)
    }

    /// Up to `limit` persisted events starting at sequence `from`.
    pub fn events_since(&self, from: u64, limit: usize) -> Result<Vec<(u64, Event)>, LedgerError> {
        Ok(self.db.events_since(from, limit)?)
    }

    pub fn event_count(&self) -> usize {
        self.db.event_count()
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        Ok(self.db.flush()?)
    }
}

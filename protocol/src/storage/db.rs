//! # FnsDb: Persistent Storage Engine
//!
//! The node's on-disk state, built on sled. The name service is small enough
//! to live in memory, so persistence is a snapshot plus an append-only event
//! log rather than a per-record store.
//!
//! ## Tree Layout
//!
//! | Tree       | Key                    | Value                          |
//! |------------|------------------------|--------------------------------|
//! | `state`    | `current`, `checksum`  | `bincode(T)`, BLAKE3 of it     |
//! | `events`   | `seq` (8B BE)          | `bincode(E)`                   |
//! | `nonces`   | address (20B)          | `u64` (8B BE)                  |
//! | `metadata` | key (UTF-8)            | value (bytes)                  |
//!
//! Sequence numbers are big-endian so sled's lexicographic order is numeric
//! order and `events_since` is a plain range scan.
//!
//! The store is generic over the snapshot and event types. The contracts
//! crate owns those types; this crate only needs them to be serde-friendly.
//!
//! ## Write order
//!
//! [`FnsDb::persist_call`] writes the snapshot first, then the events, then
//! the caller's nonce, then flushes. A crash between steps can lose the tail
//! of the event log but never leaves a nonce ahead of the state it paid for.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Batch, Db, Tree};
use std::path::Path;

use crate::crypto::hash::Checksum;
use crate::identity::Address;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("stored snapshot failed its checksum")]
    Corrupted,
}

pub type DbResult<T> = Result<T, DbError>;

const STATE_KEY: &[u8] = b"current";
const CHECKSUM_KEY: &[u8] = b"checksum";

// ---------------------------------------------------------------------------
// FnsDb
// ---------------------------------------------------------------------------

/// sled-backed store. Cheap to clone; sled handles are reference counted.
#[derive(Debug, Clone)]
pub struct FnsDb {
    db: Db,
    state: Tree,
    events: Tree,
    nonces: Tree,
    metadata: Tree,
}

impl FnsDb {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// In-memory database dropped with the handle. For tests.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        Ok(Self {
            state: db.open_tree("state")?,
            events: db.open_tree("events")?,
            nonces: db.open_tree("nonces")?,
            metadata: db.open_tree("metadata")?,
            db,
        })
    }

    // -- Snapshot -------------------------------------------------------------

    /// Replace the stored snapshot.
    pub fn put_state<T: Serialize>(&self, state: &T) -> DbResult<()> {
        let bytes = encode(state)?;
        let checksum = Checksum::of(&bytes);
        let mut batch = Batch::default();
        batch.insert(STATE_KEY, bytes);
        batch.insert(CHECKSUM_KEY, checksum.0.to_vec());
        self.state.apply_batch(batch)?;
        Ok(())
    }

    /// Load the stored snapshot, verifying its checksum.
    pub fn get_state<T: DeserializeOwned>(&self) -> DbResult<Option<T>> {
        let Some(bytes) = self.state.get(STATE_KEY)? else {
            return Ok(None);
        };
        let stored = self.state.get(CHECKSUM_KEY)?.ok_or(DbError::Corrupted)?;
        let stored: [u8; 32] = stored.as_ref().try_into().map_err(|_| DbError::Corrupted)?;
        if !Checksum(stored).matches(&bytes) {
            return Err(DbError::Corrupted);
        }
        decode(&bytes).map(Some)
    }

    // -- Events ---------------------------------------------------------------

    /// Append events; returns the sequence number the next event will get.
    pub fn append_events<E: Serialize>(&self, events: &[E]) -> DbResult<u64> {
        let mut next = self.next_event_seq()?;
        let mut batch = Batch::default();
        for event in events {
            batch.insert(&next.to_be_bytes(), encode(event)?);
            next += 1;
        }
        self.events.apply_batch(batch)?;
        Ok(next)
    }

    /// Up to `limit` events with sequence number `>= from`.
    pub fn events_since<E: DeserializeOwned>(
        &self,
        from: u64,
        limit: usize,
    ) -> DbResult<Vec<(u64, E)>> {
        let mut out = Vec::new();
        for entry in self.events.range(from.to_be_bytes()..).take(limit) {
            let (key, value) = entry?;
            out.push((decode_seq(&key)?, decode(&value)?));
        }
        Ok(out)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn next_event_seq(&self) -> DbResult<u64> {
        match self.events.last()? {
            Some((key, _)) => Ok(decode_seq(&key)? + 1),
            None => Ok(0),
        }
    }

    // -- Nonces ---------------------------------------------------------------

    /// Last nonce accepted from `address`, or 0.
    pub fn get_nonce(&self, address: &Address) -> DbResult<u64> {
        match self.nonces.get(address.as_bytes())? {
            Some(bytes) => decode_seq(&bytes),
            None => Ok(0),
        }
    }

    pub fn put_nonce(&self, address: &Address, nonce: u64) -> DbResult<()> {
        self.nonces.insert(address.as_bytes(), &nonce.to_be_bytes())?;
        Ok(())
    }

    // -- Metadata -------------------------------------------------------------

    pub fn put_metadata(&self, key: &str, value: &[u8]) -> DbResult<()> {
        self.metadata.insert(key.as_bytes(), value)?;
        Ok(())
    }

    pub fn get_metadata(&self, key: &str) -> DbResult<Option<Vec<u8>>> {
        Ok(self.metadata.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    // -- Composite ------------------------------------------------------------

    /// Persist the outcome of one successful call: snapshot, events, nonce.
    pub fn persist_call<T: Serialize, E: Serialize>(
        &self,
        state: &T,
        events: &[E],
        caller: Option<(&Address, u64)>,
    ) -> DbResult<u64> {
        self.put_state(state)?;
        let next = self.append_events(events)?;
        if let Some((address, nonce)) = caller {
            self.put_nonce(address, nonce)?;
        }
        self.flush()?;
        Ok(next)
    }

    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode_seq(bytes: &[u8]) -> DbResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DbError::Serialization("sequence key is not 8 bytes".into()))?;
    Ok(u64::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        owners: BTreeMap<String, Address>,
        height: u64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum TestEvent {
        Registered { label: String },
        Renewed { label: String, expires: u64 },
    }

    fn snapshot() -> Snapshot {
        let mut owners = BTreeMap::new();
        owners.insert("alice".to_string(), Address::derive("alice"));
        Snapshot { owners, height: 3 }
    }

    #[test]
    fn empty_database_has_no_state() {
        let db = FnsDb::open_temporary().unwrap();
        let state: Option<Snapshot> = db.get_state().unwrap();
        assert!(state.is_none());
        assert_eq!(db.event_count(), 0);
    }

    #[test]
    fn state_roundtrip() {
        let db = FnsDb::open_temporary().unwrap();
        db.put_state(&snapshot()).unwrap();
        let back: Snapshot = db.get_state().unwrap().unwrap();
        assert_eq!(back, snapshot());
    }

    #[test]
    fn corrupted_snapshot_is_detected() {
        let db = FnsDb::open_temporary().unwrap();
        db.put_state(&snapshot()).unwrap();
        db.state.insert(STATE_KEY, b"garbage".to_vec()).unwrap();
        let result: DbResult<Option<Snapshot>> = db.get_state();
        assert!(matches!(result, Err(DbError::Corrupted)));
    }

    #[test]
    fn events_are_sequenced() {
        let db = FnsDb::open_temporary().unwrap();
        let first = vec![TestEvent::Registered {
            label: "alice".into(),
        }];
        let second = vec![
            TestEvent::Renewed {
                label: "alice".into(),
                expires: 10,
            },
            TestEvent::Registered { label: "bob".into() },
        ];
        assert_eq!(db.append_events(&first).unwrap(), 1);
        assert_eq!(db.append_events(&second).unwrap(), 3);
        assert_eq!(db.event_count(), 3);

        let tail: Vec<(u64, TestEvent)> = db.events_since(1, 10).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].0, 1);
        assert_eq!(tail[1].1, second[1]);

        let limited: Vec<(u64, TestEvent)> = db.events_since(0, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn nonces_default_to_zero() {
        let db = FnsDb::open_temporary().unwrap();
        let who = Address::derive("alice");
        assert_eq!(db.get_nonce(&who).unwrap(), 0);
        db.put_nonce(&who, 4).unwrap();
        assert_eq!(db.get_nonce(&who).unwrap(), 4);
    }

    #[test]
    fn persist_call_writes_everything() {
        let db = FnsDb::open_temporary().unwrap();
        let who = Address::derive("bob");
        let events = vec![TestEvent::Registered { label: "bob".into() }];
        let next = db.persist_call(&snapshot(), &events, Some((&who, 1))).unwrap();
        assert_eq!(next, 1);
        assert_eq!(db.get_nonce(&who).unwrap(), 1);
        assert!(db.get_state::<Snapshot>().unwrap().is_some());
    }

    #[test]
    fn metadata_roundtrip() {
        let db = FnsDb::open_temporary().unwrap();
        db.put_metadata("genesis_at", &42u64.to_be_bytes()).unwrap();
        assert_eq!(
            db.get_metadata("genesis_at").unwrap(),
            Some(42u64.to_be_bytes().to_vec())
        );
        assert_eq!(db.get_metadata("missing").unwrap(), None);
    }

    #[test]
    fn reopen_persistent_database() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = FnsDb::open(dir.path()).unwrap();
            db.put_state(&snapshot()).unwrap();
            db.flush().unwrap();
        }
        let db = FnsDb::open(dir.path()).unwrap();
        let back: Snapshot = db.get_state().unwrap().unwrap();
        assert_eq!(back, snapshot());
    }
}

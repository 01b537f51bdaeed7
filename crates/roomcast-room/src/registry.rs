//! Room registry: creates, indexes, finds and removes rooms.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use roomcast_protocol::{PublicRoom, RoomKey, RoomUid};
use serde_json::{Map, Value};

use crate::room::{RoomInit, spawn_room};
use crate::{RoomConfig, RoomError, RoomHandle};

/// The two indexes over live rooms. Always updated together under the
/// write lock.
#[derive(Default)]
struct Index {
    by_uid: HashMap<RoomUid, RoomHandle>,
    by_key: HashMap<RoomKey, RoomUid>,
    next_seq: u64,
}

/// Shared registry state. Room actors hold a `Weak` to it so they can
/// remove themselves on teardown.
pub(crate) struct RegistryInner {
    config: RoomConfig,
    index: RwLock<Index>,
}

impl RegistryInner {
    /// Removes `uid` from both indexes. Returns the handle if it was
    /// present.
    pub(crate) fn detach(&self, uid: RoomUid) -> Option<RoomHandle> {
        let mut index = self.index.write();
        let handle = index.by_uid.remove(&uid)?;
        if index.by_key.get(handle.key()) == Some(&uid) {
            index.by_key.remove(handle.key());
        }
        Some(handle)
    }
}

/// The single source of truth for live rooms.
///
/// Rooms are indexed by uid and by (game, version, name). Creation and
/// removal take the write lock, so two concurrent creates for the same
/// triple can never both succeed, and a lookup sees a room either fully
/// registered or not at all.
///
/// Cloning is cheap; all clones share the same rooms.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

impl RoomRegistry {
    /// Creates an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(RoomConfig::default())
    }

    pub fn with_config(config: RoomConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                index: RwLock::new(Index::default()),
            }),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.inner.config
    }

    /// Creates and starts a new open room.
    ///
    /// Must be called from within a Tokio runtime: the room's actor task
    /// is spawned here.
    ///
    /// # Errors
    /// `RoomError::DuplicateRoom` if a live room already uses `key`.
    pub fn create(
        &self,
        key: RoomKey,
        limit: usize,
        metadata: Map<String, Value>,
    ) -> Result<RoomHandle, RoomError> {
        let mut index = self.inner.index.write();
        if index.by_key.contains_key(&key) {
            return Err(RoomError::DuplicateRoom(key));
        }

        let uid = loop {
            let candidate = RoomUid::generate();
            if !index.by_uid.contains_key(&candidate) {
                break candidate;
            }
        };
        let seq = index.next_seq;
        index.next_seq += 1;

        let handle = spawn_room(
            RoomInit {
                uid,
                key: key.clone(),
                seq,
                limit,
                metadata,
                channel_size: self.inner.config.command_channel_size,
            },
            Arc::downgrade(&self.inner),
        );
        index.by_key.insert(key, uid);
        index.by_uid.insert(uid, handle.clone());

        tracing::info!(room_uid = %uid, key = %handle.key(), limit, "room created");
        Ok(handle)
    }

    pub fn find_by_uid(&self, uid: RoomUid) -> Option<RoomHandle> {
        self.inner.index.read().by_uid.get(&uid).cloned()
    }

    /// Exact lookup by (game, version, name).
    pub fn find_by_key(&self, key: &RoomKey) -> Option<RoomHandle> {
        let index = self.inner.index.read();
        let uid = index.by_key.get(key)?;
        index.by_uid.get(uid).cloned()
    }

    /// Returns the first room, in creation order, whose snapshot matches.
    pub async fn find_one<F>(&self, mut predicate: F) -> Option<PublicRoom>
    where
        F: FnMut(&PublicRoom) -> bool,
    {
        for handle in self.handles() {
            if let Ok(room) = handle.snapshot().await {
                if predicate(&room) {
                    return Some(room);
                }
            }
        }
        None
    }

    /// Returns snapshots of every room that matches, in creation order.
    ///
    /// Rooms that tear down while the scan is running are skipped.
    pub async fn find_all<F>(&self, mut predicate: F) -> Vec<PublicRoom>
    where
        F: FnMut(&PublicRoom) -> bool,
    {
        let handles = self.handles();
        let mut rooms = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(room) = handle.snapshot().await {
                if predicate(&room) {
                    rooms.push(room);
                }
            }
        }
        rooms
    }

    /// Removes a room and disconnects its peers. Removing an unknown uid
    /// is a no-op; returns whether a room was removed.
    pub async fn remove(&self, uid: RoomUid) -> bool {
        let Some(handle) = self.inner.detach(uid) else {
            return false;
        };
        // The actor may already be stopping on its own.
        let _ = handle.shutdown().await;
        tracing::info!(room_uid = %uid, "room removed");
        true
    }

    pub fn len(&self) -> usize {
        self.inner.index.read().by_uid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uids of all live rooms, in creation order.
    pub fn uids(&self) -> Vec<RoomUid> {
        self.handles().iter().map(RoomHandle::uid).collect()
    }

    /// Cloned handles in creation order. The lock is released before any
    /// room is contacted.
    fn handles(&self) -> Vec<RoomHandle> {
        let mut handles: Vec<RoomHandle> =
            self.inner.index.read().by_uid.values().cloned().collect();
        handles.sort_by_key(RoomHandle::seq);
        handles
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// RoomFilter
// ---------------------------------------------------------------------------

/// Field/value criteria for listing rooms. Every criterion must match.
///
/// Values are compared against [`PublicRoom::field`], i.e. as strings.
/// A criterion on a field the room doesn't have never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomFilter {
    criteria: Vec<(String, String)>,
}

impl RoomFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a criterion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.criteria.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn matches(&self, room: &PublicRoom) -> bool {
        self.criteria
            .iter()
            .all(|(field, value)| room.field(field).as_deref() == Some(value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RoomFilter
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            criteria: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

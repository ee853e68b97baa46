//! Per-session mutual exclusion.
//!
//! Each session gets its own async mutex so that steps of one run never
//! overlap, while runs for different subjects proceed independently. A map
//! entry lives only while somebody holds or waits for it.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type Slot = Arc<AsyncMutex<()>>;

#[derive(Default)]
pub struct SessionLocks {
  inner: Mutex<HashMap<Uuid, Slot>>,
}

/// Exclusive hold on one session. Releasing the last hold removes the
/// session's entry from the map.
pub struct SessionGuard<'a> {
  locks: &'a SessionLocks,
  id:    Uuid,
  held:  Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
  fn handle(&self, id: Uuid) -> Slot {
    let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    map.entry(id).or_default().clone()
  }

  /// Wait until the session is free, then hold it.
  pub async fn lock(&self, id: Uuid) -> SessionGuard<'_> {
    let slot = self.handle(id);
    let mut guard = SessionGuard { locks: self, id, held: None };
    guard.held = Some(slot.lock_owned().await);
    guard
  }

  /// Hold the session only if nobody else does.
  pub fn try_lock(&self, id: Uuid) -> Option<SessionGuard<'_>> {
    let slot = self.handle(id);
    let held = slot.try_lock_owned().ok();
    // The holder may have let go after the slot was cloned.
    if held.is_none() {
      self.release(id);
    }
    held.map(|held| SessionGuard { locks: self, id, held: Some(held) })
  }

  /// Remove `id`'s entry if the map holds the only reference to it.
  fn release(&self, id: Uuid) {
    let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    if map.get(&id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
      map.remove(&id);
    }
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
  }
}

impl Drop for SessionGuard<'_> {
  fn drop(&mut self) {
    // The owned guard keeps a reference to the slot; let it go first.
    drop(self.held.take());
    self.locks.release(self.id);
  }
}

//! Fixed-capacity, thread-safe double-ended queue
//!
//! Inserts that would exceed capacity evict an existing element according to
//! the eviction policy chosen at construction. All operations are bounded in
//! duration and never suspend; a single reader/writer lock per instance lets
//! reads run concurrently while mutations are mutually exclusive.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Which end of the deque an insert is targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertSide {
    Front,
    Back,
}

/// Rule selecting which element to drop when an insert exceeds capacity.
///
/// The policy is plain data; [`BoundedDeque`] applies it when an insert
/// requires an eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict from the end opposite the insert (FIFO-like). Default.
    #[default]
    Opposite,
    /// Evict from the same end as the insert (LIFO-like).
    Same,
    /// Always evict from the head.
    Head,
    /// Always evict from the tail.
    Tail,
}

impl EvictionPolicy {
    fn evict_one<T>(self, buf: &mut VecDeque<T>, side: InsertSide) {
        match self {
            EvictionPolicy::Opposite => match side {
                InsertSide::Back => buf.pop_front(),
                InsertSide::Front => buf.pop_back(),
            },
            EvictionPolicy::Same => match side {
                InsertSide::Front => buf.pop_front(),
                InsertSide::Back => buf.pop_back(),
            },
            EvictionPolicy::Head => buf.pop_front(),
            EvictionPolicy::Tail => buf.pop_back(),
        };
    }
}

/// Thread-safe deque whose size never exceeds its fixed capacity.
pub struct BoundedDeque<T> {
    capacity: usize,
    policy: EvictionPolicy,
    inner: RwLock<VecDeque<T>>,
}

impl<T> BoundedDeque<T> {
    /// Create a deque with the default [`EvictionPolicy::Opposite`] policy.
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, EvictionPolicy::default())
    }

    /// Create a deque with an explicit eviction policy.
    pub fn with_policy(capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            policy,
            inner: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    // A poisoned lock only means a writer panicked mid-operation; the deque
    // contents are still structurally valid, so recover the guard.
    fn read_lock(&self) -> RwLockReadGuard<'_, VecDeque<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, VecDeque<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert at the head, evicting per policy if at capacity.
    pub fn push_front(&self, element: T) {
        let mut buf = self.write_lock();
        if buf.len() == self.capacity {
            self.policy.evict_one(&mut buf, InsertSide::Front);
        }
        buf.push_front(element);
    }

    /// Insert at the tail, evicting per policy if at capacity.
    pub fn push_back(&self, element: T) {
        let mut buf = self.write_lock();
        if buf.len() == self.capacity {
            self.policy.evict_one(&mut buf, InsertSide::Back);
        }
        buf.push_back(element);
    }

    /// Append a batch at the tail as one atomic operation.
    ///
    /// Existing elements are evicted per policy to make room; when the batch
    /// itself exceeds capacity, only its last `capacity` elements are kept.
    /// The capacity invariant holds at every observable point.
    pub fn push_all_back<I>(&self, elements: I)
    where
        I: IntoIterator<Item = T>,
    {
        let elements: Vec<T> = elements.into_iter().collect();
        if elements.is_empty() {
            return;
        }

        let mut buf = self.write_lock();
        let current = buf.len();
        let added = elements.len();
        let overflow = (current + added).saturating_sub(self.capacity);
        if overflow > 0 {
            if overflow >= current {
                buf.clear();
            } else {
                for _ in 0..overflow {
                    self.policy.evict_one(&mut buf, InsertSide::Back);
                }
            }
        }

        let skip = added.saturating_sub(self.capacity);
        buf.extend(elements.into_iter().skip(skip));
    }

    pub fn pop_front(&self) -> Option<T> {
        self.write_lock().pop_front()
    }

    pub fn pop_back(&self) -> Option<T> {
        self.write_lock().pop_back()
    }

    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }

    pub fn clear(&self) {
        self.write_lock().clear();
    }

    /// Atomically empty the deque, returning its contents in head-to-tail
    /// order. A push racing a drain lands entirely before or after it, so
    /// each element is consumed exactly once across drains.
    pub fn drain_all(&self) -> Vec<T> {
        self.write_lock().drain(..).collect()
    }
}

impl<T: Clone> BoundedDeque<T> {
    pub fn peek_front(&self) -> Option<T> {
        self.read_lock().front().cloned()
    }

    pub fn peek_back(&self) -> Option<T> {
        self.read_lock().back().cloned()
    }

    /// Point-in-time copy of the contents in head-to-tail order.
    ///
    /// Iteration always operates over this explicit copy; concurrent
    /// mutations are not reflected.
    pub fn snapshot(&self) -> Vec<T> {
        self.read_lock().iter().cloned().collect()
    }
}

impl<T: PartialEq> BoundedDeque<T> {
    pub fn contains(&self, element: &T) -> bool {
        self.read_lock().contains(element)
    }

    /// Best-effort removal of the first live element equal to `element`.
    ///
    /// Intended for deleting an element observed in a [`snapshot`]: if
    /// concurrent writers shifted the contents, the removed slot may not be
    /// the same logical slot that was snapshotted. Not index-stable under
    /// concurrent mutation.
    ///
    /// [`snapshot`]: BoundedDeque::snapshot
    pub fn remove_first_occurrence(&self, element: &T) -> bool {
        let mut buf = self.write_lock();
        if let Some(pos) = buf.iter().position(|e| e == element) {
            buf.remove(pos);
            true
        } else {
            false
        }
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for BoundedDeque<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedDeque")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("contents", &self.snapshot())
            .finish()
    }
}

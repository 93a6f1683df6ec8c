//! Candidate Queue Module
//!
//! Thread-safe FIFO of insertion-order markers driving eviction and expiry.

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::Mutex;

// == Candidate Marker ==
/// An insertion-order record: which key was written, and when.
///
/// One marker is appended per `put`, including overwrites of existing keys.
/// A marker whose instant no longer equals the store's current instant for
/// its key is stale garbage; consumers discard it on dequeue instead of
/// trusting it. The queue may therefore hold duplicates for a key, at most
/// one of which is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMarker<K> {
    /// Key the marker refers to
    pub key: K,
    /// Insertion instant recorded at append time
    pub inserted_at: Instant,
}

// == Candidate Queue ==
/// Unbounded FIFO of candidate markers.
///
/// Appended at the tail on every `put`, consumed only from the head by the
/// eviction loop and the sweeper. FIFO order is the sole ordering
/// guarantee: because every `put` appends after all previous markers, head
/// order is insertion-time order, which is what both consumers rely on.
///
/// The mutex guards single push/pop/peek operations at the ends; it is
/// never held across a store access, so it serializes nothing but the
/// queue ends themselves.
#[derive(Debug, Default)]
pub struct CandidateQueue<K> {
    markers: Mutex<VecDeque<CandidateMarker<K>>>,
}

impl<K> CandidateQueue<K>
where
    K: Eq + Clone,
{
    // == Constructor ==
    /// Creates a new empty candidate queue.
    pub fn new() -> Self {
        Self {
            markers: Mutex::new(VecDeque::new()),
        }
    }

    // == Append ==
    /// Appends a marker at the tail.
    pub fn append(&self, key: K, inserted_at: Instant) {
        self.markers
            .lock()
            .push_back(CandidateMarker { key, inserted_at });
    }

    // == Peek Oldest ==
    /// Returns a copy of the oldest marker without removing it.
    pub fn peek_oldest(&self) -> Option<CandidateMarker<K>> {
        self.markers.lock().front().cloned()
    }

    // == Pop Oldest ==
    /// Removes and returns the oldest marker.
    pub fn pop_oldest(&self) -> Option<CandidateMarker<K>> {
        self.markers.lock().pop_front()
    }

    // == Pop If Oldest ==
    /// Removes the head only if it still equals the given marker.
    ///
    /// A consumer that peeks, classifies the marker against the store and
    /// then pops would otherwise race another consumer and discard a head
    /// it never inspected. Returns `true` if the head was popped.
    pub fn pop_if_oldest(&self, marker: &CandidateMarker<K>) -> bool {
        let mut markers = self.markers.lock();
        if markers.front() == Some(marker) {
            markers.pop_front();
            true
        } else {
            false
        }
    }

    // == Length ==
    /// Returns the number of queued markers, stale ones included.
    pub fn len(&self) -> usize {
        self.markers.lock().len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.markers.lock().is_empty()
    }
}

//! Sharded index from key content to the slot that key was placed in.
//!
//! Each shard is a chain of `(content, slot)` entries behind its own mutex.
//! The number of shards is `2 * table_capacity + 1`, so chains stay short and
//! two workers rarely contend on the same shard.
//!
//! Entries borrow key bytes from the caller's arena; nothing is copied.

use parking_lot::Mutex;

use crate::hash::HashPair;

struct DedupEntry<'a> {
    key: &'a [u8],
    slot: usize,
}

/// One independently-locked chain. Newest entries sit at the end of the
/// vector and are scanned first.
#[derive(Default)]
struct Shard<'a> {
    chain: Vec<DedupEntry<'a>>,
}

impl<'a> Shard<'a> {
    fn find(&self, key: &[u8]) -> Option<usize> {
        self.chain
            .iter()
            .rev()
            .find(|entry| entry.key == key)
            .map(|entry| entry.slot)
    }

    fn push_newest(&mut self, key: &'a [u8], slot: usize) {
        self.chain.push(DedupEntry { key, slot });
    }
}

pub struct DedupIndex<'a> {
    shards: Box<[Mutex<Shard<'a>>]>,
}

impl<'a> DedupIndex<'a> {
    /// Sizes the index for a placement table of `table_capacity` slots.
    pub fn new(table_capacity: usize) -> Self {
        Self::with_shards(2 * table_capacity + 1)
    }

    pub fn with_shards(shard_count: usize) -> Self {
        assert!(shard_count > 0);
        Self {
            shards: (0..shard_count)
                .map(|_| Mutex::new(Shard::default()))
                .collect(),
        }
    }

    #[inline(always)]
    fn shard_of(&self, hash: HashPair) -> &Mutex<Shard<'a>> {
        &self.shards[(hash.a % self.shards.len() as u64) as usize]
    }

    /// Returns the slot previously recorded for `key`, or `None`.
    ///
    /// The scan runs entirely under the shard lock and compares bytes, so two
    /// different keys sharing a hash are never mistaken for duplicates. The
    /// lock is released on return: a miss is not a reservation, and a
    /// concurrent miss for the same content may follow before `record`.
    pub fn lookup_or_reserve(&self, key: &[u8], hash: HashPair) -> Option<usize> {
        self.shard_of(hash).lock().find(key)
    }

    /// Makes `key -> slot` visible to subsequent lookups.
    pub fn record(&self, key: &'a [u8], hash: HashPair, slot: usize) {
        self.shard_of(hash).lock().push_newest(key, slot);
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Total number of recorded entries. Takes every shard lock in turn.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().chain.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

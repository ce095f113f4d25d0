//! Per-key insertion protocol tying the dedup index to the placement table.
//!
//! For every key, in order:
//!
//! 1. Hash once, producing `(h_a, h_b)`.
//! 2. Look the content up in the dedup index. A hit is the key's slot; done.
//! 3. On a miss, claim a slot with two-choice placement.
//! 4. Bump `unique`, and `collisions` if the claim went through the fallback.
//! 5. Record `content -> slot` in the dedup index.
//! 6. Return the slot as the key's assignment.
//!
//! No lock spans steps 2 to 5. Two workers handling equal content at the
//! same time can both miss in step 2 and both place, leaving the content in
//! two slots and counting it twice in `unique`. Each key still receives a
//! slot whose occupant equals its content.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    dedup::DedupIndex,
    error::PlacementError,
    hash::{HashPair, KeyHasher, Murmur3},
    table::PlacementTable,
};

/// How a key obtained its slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Equal content was already recorded in the dedup index.
    Duplicate,
    /// Claimed one of the two candidate slots.
    Placed,
    /// Claimed a slot through fallback probing.
    Probed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub slot: usize,
    pub outcome: Outcome,
}

/// Global counters, bumped with relaxed `fetch_add` and read after join.
#[derive(Debug, Default)]
struct Counters {
    unique: AtomicU64,
    collisions: AtomicU64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Keys that claimed a new slot.
    pub unique: u64,
    /// The subset of `unique` that needed fallback probing.
    pub collisions: u64,
}

impl Stats {
    /// Collisions as a percentage of unique placements, 0 when nothing was placed.
    pub fn collision_rate(&self) -> f64 {
        if self.unique == 0 {
            0.0
        } else {
            self.collisions as f64 / self.unique as f64 * 100.0
        }
    }
}

pub struct Inserter<'a, H = Murmur3> {
    table: PlacementTable<'a>,
    dedup: DedupIndex<'a>,
    counters: Counters,
    hasher: H,
}

impl<'a> Inserter<'a> {
    /// An inserter over a table of `capacity` slots, hashing with MurmurHash3.
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, Murmur3)
    }
}

impl<'a, H: KeyHasher> Inserter<'a, H> {
    pub fn with_hasher(capacity: usize, hasher: H) -> Self {
        Self {
            table: PlacementTable::new(capacity),
            dedup: DedupIndex::new(capacity),
            counters: Counters::default(),
            hasher,
        }
    }

    /// Resolves `key` to a slot, placing it if its content has not been seen.
    pub fn insert(&self, key: &'a [u8]) -> Result<Assignment, PlacementError> {
        let hash = self.hasher.hash_pair(key);

        if let Some(slot) = self.resolve(key, hash) {
            return Ok(Assignment {
                slot,
                outcome: Outcome::Duplicate,
            });
        }

        self.place_new(key, hash)
    }

    pub fn stats(&self) -> Stats {
        Stats {
            unique: self.counters.unique.load(Ordering::Relaxed),
            collisions: self.counters.collisions.load(Ordering::Relaxed),
        }
    }

    pub fn table(&self) -> &PlacementTable<'a> {
        &self.table
    }

    pub fn dedup(&self) -> &DedupIndex<'a> {
        &self.dedup
    }

    #[inline(always)]
    fn resolve(&self, key: &[u8], hash: HashPair) -> Option<usize> {
        self.dedup.lookup_or_reserve(key, hash)
    }

    fn place_new(&self, key: &'a [u8], hash: HashPair) -> Result<Assignment, PlacementError> {
        let placement = self.table.try_two_choice_place(key, hash.a, hash.b)?;

        self.counters.unique.fetch_add(1, Ordering::Relaxed);
        if placement.probed() {
            self.counters.collisions.fetch_add(1, Ordering::Relaxed);
        }

        self.dedup.record(key, hash, placement.slot);

        let outcome = if placement.probed() {
            Outcome::Probed
        } else {
            Outcome::Placed
        };
        Ok(Assignment {
            slot: placement.slot,
            outcome,
        })
    }
}

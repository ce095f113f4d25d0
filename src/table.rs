//! Fixed-capacity placement table with two-choice hashing.
//!
//! ```text
//!   key ──► (h_a mod cap, h_b mod cap) = (h1, h2)
//!
//!   lock min(h1,h2), then max(h1,h2)
//!   ┌──────────────┐
//!   │ h1 empty?    │──yes──► claim h1      (Primary)
//!   │ h2 empty?    │──yes──► claim h2      (Secondary)
//!   └──────────────┘
//!          │ both occupied: release both
//!          ▼
//!   cursor.fetch_add(1) % cap ──► lock one slot ──► empty? claim (Fallback)
//!          ▲                                      │ occupied
//!          └──────────────────────────────────────┘
//! ```
//!
//! Every slot has its own mutex. Occupancy is monotonic: a claimed slot is
//! never cleared or overwritten. Locked slots are only reachable through
//! [`SlotHandle`], whose one write is claim-if-empty, so `occupied` always
//! matches the number of filled slots. The only place two slot locks are held at
//! once is the two-choice step, which always locks the lower index first.
//! The fallback cursor is advanced before any slot lock is taken.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::PlacementError;

/// Contents of one slot: the key bytes of its occupant, if any.
pub type Slot<'a> = Option<&'a [u8]>;

/// Which step of the placement claimed the slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlacementPath {
    /// `h1` was free.
    Primary,
    /// `h1` was taken, `h2` was free.
    Secondary,
    /// Both candidates were taken; the slot came from the shared cursor.
    Fallback,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub slot: usize,
    pub path: PlacementPath,
}

impl Placement {
    /// True when the placement counts as a collision.
    #[inline(always)]
    pub fn probed(&self) -> bool {
        self.path == PlacementPath::Fallback
    }
}

pub struct PlacementTable<'a> {
    slots: Box<[Mutex<Slot<'a>>]>,
    /// Shared fallback cursor. Only ever advanced with `fetch_add`.
    cursor: AtomicUsize,
    /// Number of claimed slots, bumped under the claimed slot's lock.
    occupied: AtomicUsize,
}

impl<'a> PlacementTable<'a> {
    /// Creates a table of `capacity` empty slots. Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            slots: (0..capacity).map(|_| Mutex::new(None)).collect(),
            cursor: AtomicUsize::new(0),
            occupied: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.occupied.load(Ordering::Acquire)
    }

    /// The key occupying `index`, if any.
    pub fn occupant(&self, index: usize) -> Slot<'a> {
        *self.slots[index].lock()
    }

    /// Runs `f` with exclusive access to slot `index`.
    #[inline(always)]
    pub fn with_lock<R>(&self, index: usize, f: impl FnOnce(SlotHandle<'_, 'a>) -> R) -> R {
        let mut guard = self.slots[index].lock();
        f(self.handle(&mut guard))
    }

    /// Runs `f` with both `x` and `y` locked, lower index first.
    ///
    /// `f` receives slot `x` then slot `y`; when `x == y` only one lock is
    /// taken and the second argument is `None`. Guards are released in
    /// reverse acquisition order.
    pub fn with_pair_locked<R>(
        &self,
        x: usize,
        y: usize,
        f: impl FnOnce(SlotHandle<'_, 'a>, Option<SlotHandle<'_, 'a>>) -> R,
    ) -> R {
        let (lo, hi) = if x <= y { (x, y) } else { (y, x) };

        let mut lo_guard = self.slots[lo].lock();
        if lo == hi {
            return f(self.handle(&mut lo_guard), None);
        }
        let mut hi_guard = self.slots[hi].lock();

        let (lo_slot, hi_slot) = (self.handle(&mut lo_guard), self.handle(&mut hi_guard));
        if x == lo {
            f(lo_slot, Some(hi_slot))
        } else {
            f(hi_slot, Some(lo_slot))
        }
    }

    /// Claims a slot for `key` using the two candidates `h_a mod capacity`
    /// and `h_b mod capacity`, falling back to the shared cursor when both
    /// are occupied.
    ///
    /// The caller is expected to size the table for the number of distinct
    /// keys. If every slot is occupied, the fallback returns
    /// [`PlacementError::TableFull`] instead of probing forever.
    pub fn try_two_choice_place(
        &self,
        key: &'a [u8],
        h_a: u64,
        h_b: u64,
    ) -> Result<Placement, PlacementError> {
        let capacity = self.capacity() as u64;
        let h1 = (h_a % capacity) as usize;
        let h2 = (h_b % capacity) as usize;

        let direct = self.with_pair_locked(h1, h2, |mut first, second| {
            if first.try_claim(key) {
                return Some(Placement {
                    slot: h1,
                    path: PlacementPath::Primary,
                });
            }
            if let Some(mut second) = second {
                if second.try_claim(key) {
                    return Some(Placement {
                        slot: h2,
                        path: PlacementPath::Secondary,
                    });
                }
            }
            None
        });

        if let Some(placement) = direct {
            return Ok(placement);
        }

        tracing::trace!(h1, h2, "both candidates occupied, probing");
        let slot = self.probe(key)?;
        Ok(Placement {
            slot,
            path: PlacementPath::Fallback,
        })
    }

    fn probe(&self, key: &'a [u8]) -> Result<usize, PlacementError> {
        let capacity = self.capacity();
        loop {
            let candidate = self.cursor.fetch_add(1, Ordering::Relaxed) % capacity;

            if self.with_lock(candidate, |mut slot| slot.try_claim(key)) {
                return Ok(candidate);
            }

            if self.occupied() >= capacity {
                return Err(PlacementError::TableFull { capacity });
            }
        }
    }

    #[inline(always)]
    fn handle<'t>(&'t self, slot: &'t mut Slot<'a>) -> SlotHandle<'t, 'a> {
        SlotHandle {
            slot,
            occupied: &self.occupied,
        }
    }
}

/// A locked slot. It can be read, and filled once if empty; it can never be
/// cleared or overwritten.
pub struct SlotHandle<'t, 'a> {
    slot: &'t mut Slot<'a>,
    occupied: &'t AtomicUsize,
}

impl<'a> SlotHandle<'_, 'a> {
    pub fn occupant(&self) -> Slot<'a> {
        *self.slot
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Stores `key` if the slot is empty. Returns whether it did.
    #[inline(always)]
    pub fn try_claim(&mut self, key: &'a [u8]) -> bool {
        if self.slot.is_some() {
            return false;
        }
        *self.slot = Some(key);
        self.occupied.fetch_add(1, Ordering::AcqRel);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // -- Two-choice fast path -----------------------------------------------

    #[test]
    fn two_choice_primary_then_secondary() {
        let table = PlacementTable::new(4);

        let p1 = table.try_two_choice_place(b"k1", 0, 1).unwrap();
        let p2 = table.try_two_choice_place(b"k2", 0, 1).unwrap();
        let p3 = table.try_two_choice_place(b"k3", 2, 3).unwrap();

        assert_eq!((p1.slot, p1.path), (0, PlacementPath::Primary));
        assert_eq!((p2.slot, p2.path), (1, PlacementPath::Secondary));
        assert_eq!((p3.slot, p3.path), (2, PlacementPath::Primary));
        assert!(![p1, p2, p3].iter().any(Placement::probed));

        assert_eq!(table.occupant(0), Some(&b"k1"[..]));
        assert_eq!(table.occupant(1), Some(&b"k2"[..]));
        assert_eq!(table.occupant(2), Some(&b"k3"[..]));
        assert_eq!(table.occupant(3), None);
        assert_eq!(table.occupied(), 3);
    }

    #[test]
    fn hashes_reduced_modulo_capacity() {
        let table = PlacementTable::new(4);
        let p = table.try_two_choice_place(b"k", 4 * 1000 + 3, 9).unwrap();
        assert_eq!(p.slot, 3);
        let p = table.try_two_choice_place(b"j", 7, 9).unwrap();
        assert_eq!((p.slot, p.path), (1, PlacementPath::Secondary));
    }

    #[test]
    fn equal_candidates_take_one_lock_and_fall_back() {
        let table = PlacementTable::new(3);

        let p1 = table.try_two_choice_place(b"a", 1, 1).unwrap();
        assert_eq!((p1.slot, p1.path), (1, PlacementPath::Primary));

        // Cursor starts at 0, which is free.
        let p2 = table.try_two_choice_place(b"b", 1, 1).unwrap();
        assert_eq!((p2.slot, p2.path), (0, PlacementPath::Fallback));
    }

    // -- Fallback probing ---------------------------------------------------

    #[test]
    fn fallback_skips_occupied_slots() {
        let table = PlacementTable::new(3);

        table.try_two_choice_place(b"a", 0, 1).unwrap();
        table.try_two_choice_place(b"b", 0, 1).unwrap();
        let p = table.try_two_choice_place(b"c", 0, 1).unwrap();

        assert_eq!((p.slot, p.path), (2, PlacementPath::Fallback));
        assert!(p.probed());
        assert_eq!(table.occupied(), 3);
    }

    #[test]
    fn fallback_on_full_table_errors_instead_of_spinning() {
        let table = PlacementTable::new(2);

        let p1 = table.try_two_choice_place(b"a", 0, 1).unwrap();
        let p2 = table.try_two_choice_place(b"b", 0, 1).unwrap();
        assert_eq!((p1.slot, p2.slot), (0, 1));

        let err = table.try_two_choice_place(b"c", 0, 1).unwrap_err();
        assert_eq!(err, PlacementError::TableFull { capacity: 2 });

        // Nothing was overwritten.
        assert_eq!(table.occupant(0), Some(&b"a"[..]));
        assert_eq!(table.occupant(1), Some(&b"b"[..]));
        assert_eq!(table.occupied(), 2);
    }

    // -- Lock helpers -------------------------------------------------------

    #[test]
    fn pair_lock_passes_slots_in_argument_order() {
        let table = PlacementTable::new(4);
        assert!(table.with_lock(3, |mut slot| slot.try_claim(b"three")));

        table.with_pair_locked(3, 1, |first, second| {
            assert_eq!(first.occupant(), Some(&b"three"[..]));
            let mut second = second.unwrap();
            assert!(second.is_empty());
            assert!(second.try_claim(b"one"));
        });
        assert_eq!(table.occupant(1), Some(&b"one"[..]));
        assert_eq!(table.occupied(), 2);

        table.with_pair_locked(2, 2, |_, second| assert!(second.is_none()));
    }

    #[test]
    fn claim_through_handle_never_overwrites() {
        let table = PlacementTable::new(2);

        assert!(table.with_lock(0, |mut slot| slot.try_claim(b"first")));
        assert!(!table.with_lock(0, |mut slot| slot.try_claim(b"second")));

        assert_eq!(table.occupant(0), Some(&b"first"[..]));
        assert_eq!(table.occupied(), 1);
    }

    #[test]
    fn table_filled_through_handles_reports_full() {
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let table = PlacementTable::new(2);
            for (i, key) in [&b"a"[..], b"b"].into_iter().enumerate() {
                assert!(table.with_lock(i, |mut slot| slot.try_claim(key)));
            }
            assert_eq!(table.occupied(), 2);
            tx.send(table.try_two_choice_place(b"c", 0, 1)).unwrap();
        });

        let result = rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("placement on a full table did not return");
        assert_eq!(result, Err(PlacementError::TableFull { capacity: 2 }));
    }

    // -- Concurrency --------------------------------------------------------

    #[test]
    fn concurrent_crossing_pairs_fill_every_slot_once() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 256;
        const CAPACITY: usize = THREADS * PER_THREAD;

        let keys: Vec<String> = (0..CAPACITY).map(|i| format!("key{i}")).collect();
        let table = PlacementTable::new(CAPACITY);

        thread::scope(|s| {
            for (t, chunk) in keys.chunks(PER_THREAD).enumerate() {
                let table = &table;
                s.spawn(move || {
                    for (i, key) in chunk.iter().enumerate() {
                        // Odd threads present the pair reversed so that lock
                        // order differs from argument order.
                        let (x, y) = (i as u64, (i + 1) as u64);
                        let (h_a, h_b) = if t % 2 == 0 { (x, y) } else { (y, x) };
                        table.try_two_choice_place(key.as_bytes(), h_a, h_b).unwrap();
                    }
                });
            }
        });

        assert_eq!(table.occupied(), CAPACITY);
        let mut seen = std::collections::HashSet::new();
        for i in 0..CAPACITY {
            let occupant = table.occupant(i).expect("slot filled");
            assert!(seen.insert(occupant), "key placed twice");
        }
    }
}

//! Concurrent slot assignment with two-choice hashing.
//!
//! Every distinct input string gets a slot index in a fixed-capacity table
//! shared by all worker threads; equal strings resolve to the same slot.
//!
//! # Architecture
//!
//! ```text
//!   KeyArena (one buffer, one span per line)
//!        │ &[u8] keys
//!        ▼
//!   harness::partition ──► worker 0 .. worker w-1   (std::thread::scope)
//!                              │ Inserter::insert(key)
//!                              ▼
//!        ┌──────────── HashPair::hash(key) = (h_a, h_b) ────────────┐
//!        ▼                                                          ▼
//!   DedupIndex (2*cap+1 locked chains)                  PlacementTable (cap locked slots)
//!   hit ──► existing slot                               miss ──► two-choice, then fallback
//!        │                                                          │
//!        └──────────── record(content, slot) ◄──────────────────────┘
//!                              │
//!                              ▼
//!   RunReport { assignments, unique, collisions, elapsed } ──► report::save
//! ```
//!
//! # Sizing
//!
//! The table must have at least as many slots as there are distinct keys,
//! plus headroom for the duplicate race described in [`insert`]. When it
//! fills up, placement fails with [`PlacementError::TableFull`].

pub mod arena;
pub mod config;
pub mod dedup;
pub mod error;
pub mod harness;
pub mod hash;
pub mod insert;
pub mod report;
pub mod table;

pub use arena::KeyArena;
pub use dedup::DedupIndex;
pub use error::{Error, PlacementError};
pub use harness::{RunConfig, RunReport, partition, run};
pub use hash::{HashPair, KeyHasher, Murmur3};
pub use insert::{Assignment, Inserter, Outcome, Stats};
pub use table::{Placement, PlacementPath, PlacementTable, SlotHandle};

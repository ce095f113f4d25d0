//! MurmurHash3 (x64, 128-bit variant) split into two 64-bit words.
//!
//! Both the deduplication index and the placement table derive their indices
//! from the same `HashPair`, so a key is hashed exactly once per insertion.
//! The seed is fixed at zero: identical bytes hash identically across runs
//! and processes.

/// Two 64-bit hash words produced from a single key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HashPair {
    /// Selects the dedup shard and the first candidate slot.
    pub a: u64,
    /// Selects the second candidate slot.
    pub b: u64,
}

impl HashPair {
    const C1: u64 = 0x87c3_7b91_1142_53d5;
    const C2: u64 = 0x4cf5_ad43_2745_937f;

    pub const fn new(a: u64, b: u64) -> Self {
        Self { a, b }
    }

    #[inline(always)]
    pub fn hash(key: &[u8]) -> Self {
        let mut h1: u64 = 0;
        let mut h2: u64 = 0;

        let mut blocks = key.chunks_exact(16);
        for block in &mut blocks {
            let k1 = read_u64(&block[..8]);
            let k2 = read_u64(&block[8..]);

            h1 ^= Self::mix_k1(k1);
            h1 = h1.rotate_left(27).wrapping_add(h2);
            h1 = h1.wrapping_mul(5).wrapping_add(0x52dc_e729);

            h2 ^= Self::mix_k2(k2);
            h2 = h2.rotate_left(31).wrapping_add(h1);
            h2 = h2.wrapping_mul(5).wrapping_add(0x3849_5ab5);
        }

        let tail = blocks.remainder();
        if !tail.is_empty() {
            let mut buf = [0u8; 16];
            buf[..tail.len()].copy_from_slice(tail);

            if tail.len() > 8 {
                h2 ^= Self::mix_k2(read_u64(&buf[8..]));
            }
            h1 ^= Self::mix_k1(read_u64(&buf[..8]));
        }

        let len = key.len() as u64;
        h1 ^= len;
        h2 ^= len;
        h1 = h1.wrapping_add(h2);
        h2 = h2.wrapping_add(h1);
        h1 = fmix64(h1);
        h2 = fmix64(h2);
        h1 = h1.wrapping_add(h2);
        h2 = h2.wrapping_add(h1);

        Self { a: h1, b: h2 }
    }

    #[inline(always)]
    fn mix_k1(k1: u64) -> u64 {
        k1.wrapping_mul(Self::C1)
            .rotate_left(31)
            .wrapping_mul(Self::C2)
    }

    #[inline(always)]
    fn mix_k2(k2: u64) -> u64 {
        k2.wrapping_mul(Self::C2)
            .rotate_left(33)
            .wrapping_mul(Self::C1)
    }
}

//  Little-endian read of the first 8 bytes.
#[inline(always)]
fn read_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}

#[inline(always)]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Source of the `(h_a, h_b)` pair used to place a key.
///
/// Implementations must be pure functions of the key bytes.
pub trait KeyHasher: Sync {
    fn hash_pair(&self, key: &[u8]) -> HashPair;
}

/// The default hasher: MurmurHash3 x64_128, seed 0.
#[derive(Copy, Clone, Debug, Default)]
pub struct Murmur3;

impl KeyHasher for Murmur3 {
    #[inline(always)]
    fn hash_pair(&self, key: &[u8]) -> HashPair {
        HashPair::hash(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn hash_empty_is_zero() {
        assert_eq!(HashPair::hash(b""), HashPair::new(0, 0));
    }

    #[test]
    fn hash_known_answers() {
        let cases: [(&[u8], u64, u64); 5] = [
            (b"a", 0x85555565f6597889, 0xe6b53a48510e895a),
            (b"hello", 0xcbd8a7b341bd9b02, 0x5b1e906a48ae1d19),
            (
                b"The quick brown fox jumps over the lazy dog",
                0xe34bbc7bbc071b6c,
                0x7a433ca9c49a9347,
            ),
            // Exactly one block, no tail.
            (b"0123456789abcdef", 0x4be06d94cf4ad1a7, 0x87c35b5c63a708da),
            // One block plus a one-byte tail.
            (b"0123456789abcdefX", 0xcdebd2acb570d6f7, 0x8f72119782104b27),
        ];

        for (key, a, b) in cases {
            let h = HashPair::hash(key);
            assert_eq!((h.a, h.b), (a, b), "key {:?}", String::from_utf8_lossy(key));
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let key = b"deterministic across calls";
        assert_eq!(HashPair::hash(key), HashPair::hash(key));
        assert_eq!(Murmur3.hash_pair(key), HashPair::hash(key));
    }

    #[test]
    fn hash_every_tail_length() {
        // Prefixes of one buffer cover all tail lengths 0..=15 over 0..=2 blocks.
        let buf: Vec<u8> = (0u8..48).collect();
        let mut seen = HashSet::new();
        for len in 0..=buf.len() {
            assert!(seen.insert(HashPair::hash(&buf[..len])), "len {len}");
        }
    }

    #[test]
    fn hash_words_differ() {
        let mut equal = 0;
        for i in 0..10_000_u32 {
            let h = HashPair::hash(format!("key-{i}").as_bytes());
            if h.a == h.b {
                equal += 1;
            }
        }
        assert_eq!(equal, 0);
    }

    #[test]
    fn hash_no_catastrophic_collisions() {
        let mut seen = HashSet::new();
        for i in 0..10_000_u32 {
            seen.insert(HashPair::hash(format!("word{i}").as_bytes()).a);
        }
        assert!(seen.len() > 9_900);
    }
}

//! Deterministic user bucketing.
//!
//! `bucket(user_key, salt)` must produce the same integer in `[0, 9999]` on
//! every call, in every language implementing this platform — it is the
//! foundation every traffic allocation is built on. Changing the hash
//! algorithm here is a breaking change to the identity of every experiment
//! assignment that has ever been made.

const C1: u32 = 0xcc9e2d51;
const C2: u32 = 0x1b873593;
const R1: u32 = 15;
const R2: u32 = 13;
const M: u32 = 5;
const N: u32 = 0xe6546b64;

/// 32-bit variant of MurmurHash3, seeded with 0. Reproduced here rather than
/// pulled in as a dependency because the exact byte-for-byte behavior is a
/// cross-language compatibility contract (see golden vectors in the test
/// module below) that must not drift with an upstream crate version bump.
fn murmur3_32(data: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();

    for chunk in chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(R1);
        k = k.wrapping_mul(C2);

        hash ^= k;
        hash = hash.rotate_left(R2);
        hash = hash.wrapping_mul(M).wrapping_add(N);
    }

    let mut k1: u32 = 0;
    match tail.len() {
        3 => {
            k1 ^= (tail[2] as u32) << 16;
            k1 ^= (tail[1] as u32) << 8;
            k1 ^= tail[0] as u32;
        }
        2 => {
            k1 ^= (tail[1] as u32) << 8;
            k1 ^= tail[0] as u32;
        }
        1 => {
            k1 ^= tail[0] as u32;
        }
        _ => {}
    }
    if !tail.is_empty() {
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(R1);
        k1 = k1.wrapping_mul(C2);
        hash ^= k1;
    }

    hash ^= data.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85ebca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2ae35);
    hash ^= hash >> 16;

    hash
}

/// Total number of buckets; sets the minimum allocation granularity at 0.01%.
pub const BUCKET_COUNT: u32 = 10_000;

/// Map `(user_key, salt)` to a bucket in `[0, BUCKET_COUNT)`.
///
/// The raw hash is reinterpreted as a signed 32-bit integer before the
/// modulo reduction, then normalized with `((h mod N) + N) mod N` — this is
/// the formula called out in the design notes to neutralize the sign of the
/// modulo operator across languages whose native integer hash
/// implementations return a signed value.
pub fn bucket(user_key: &str, salt: &str) -> u32 {
    let input = format!("{user_key}:{salt}");
    let raw = murmur3_32(input.as_bytes());
    let signed = raw as i32 as i64;
    let n = BUCKET_COUNT as i64;
    (((signed % n) + n) % n) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn golden_vectors() {
        assert_eq!(bucket("user-1", "salt-1"), 2865);
        assert_eq!(bucket("alice", "exp-abc"), 663);
        assert_eq!(bucket("", ""), 7430);
        assert_eq!(bucket("user:with:colon", "salt:with:colon"), 6663);
        assert_eq!(bucket("A", "B"), 3590);
    }

    #[test]
    fn deterministic_across_calls() {
        let a = bucket("repeat-me", "salt");
        let b = bucket("repeat-me", "salt");
        assert_eq!(a, b);
    }

    #[test]
    fn different_salts_diverge() {
        assert_ne!(bucket("same-user", "salt-a"), bucket("same-user", "salt-b"));
    }

    proptest! {
        #[test]
        fn always_in_range(user in ".*", salt in ".*") {
            let b = bucket(&user, &salt);
            prop_assert!(b < BUCKET_COUNT);
        }
    }
}

//! DJBX string hashing.
//!
//! Both the code generator and the VM must compute identical hashes for
//! identical byte strings, because bytecode stores 32-bit hash IDs
//! instead of the strings themselves -- a hash computed with a
//! different algorithm (or different width) would silently desync
//! compile-time constants from run-time comparisons.

/// Hashes `bytes` using the DJBX-XOR variant: `h = 5381; h = ((h << 5) + h) ^ b`
/// for each byte, with 32-bit wrapping arithmetic.
///
/// `hash_bytes(b"") == 0x0000_1505` and `hash_bytes(b"true") == 0x7c73_5233`;
/// these two values are pinned by tests below and must never change, since
/// bytecode compiled against one hash implementation must validate
/// correctly against any other implementation sharing the same blob.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 5381;
    for &b in bytes {
        hash = (hash << 5).wrapping_add(hash) ^ b as u32;
    }
    hash
}

/// Convenience wrapper over [`hash_bytes`] for `&str` input.
pub fn hash_str(s: &str) -> u32 {
    hash_bytes(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_hash() {
        assert_eq!(hash_bytes(b""), 0x0000_1505);
    }

    #[test]
    fn reference_values() {
        assert_eq!(hash_str("true"), 0x7c73_5233);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_str("catalog"), hash_str("catalog"));
    }

    #[test]
    fn distinct_strings_usually_differ() {
        assert_ne!(hash_str("author"), hash_str("publish_date"));
    }

    #[test]
    fn wrapping_arithmetic_matches_32_bit_overflow() {
        // A long-enough string exercises the wrapping shift/add/xor chain
        // without panicking in debug builds.
        let long = "x".repeat(256);
        let _ = hash_str(&long);
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// `hash_bytes` is a pure function of its input: `spec.md` §3
            /// relies on bytecode's interned hashes staying valid for the
            /// lifetime of the bytecode, which only holds if hashing never
            /// depends on anything but the bytes given.
            #[test]
            fn hash_is_a_pure_function_of_its_bytes(s in ".{0,64}") {
                prop_assert_eq!(hash_str(&s), hash_str(&s));
            }

            /// Never panics regardless of byte content, including non-ASCII.
            #[test]
            fn hash_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
                let _ = hash_bytes(&bytes);
            }
        }
    }
}

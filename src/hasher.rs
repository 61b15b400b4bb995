/// Computes the 32-bit hash used to place and find keys in a frozenmap.
///
/// The hash is seeded with the key length and samples at most 32 bytes,
/// walking backwards from the last byte with a stride of `(len >> 5) + 1`.
/// It is cheap for the short keys typical of configuration tables and is not
/// suitable for adversarial input.
///
/// Build and lookup both call this function, so any change to it changes
/// where every key lives.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let len = bytes.len();
    let step = (len >> 5) + 1;
    let mut h = len as u32;
    let mut i = len;
    while i >= step {
        h ^= (h << 5).wrapping_add(h >> 2).wrapping_add(bytes[i - 1] as u32);
        i -= step;
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference values computed by hand from the mixing formula.
    #[test]
    fn test_known_values() {
        assert_eq!(hash_bytes(b""), 0);
        // h = 1; h ^= (1 << 5) + (1 >> 2) + 'a' = 1 ^ (32 + 0 + 97) = 1 ^ 129
        assert_eq!(hash_bytes(b"a"), 1 ^ 129);

        let h = 2u32;
        let h = h ^ ((h << 5) + (h >> 2) + b'b' as u32);
        let h = h ^ ((h << 5) + (h >> 2) + b'a' as u32);
        assert_eq!(hash_bytes(b"ab"), h);
    }

    #[test]
    fn test_deterministic() {
        let keys: Vec<Vec<u8>> = (0..1000).map(|i| format!("key-{i}").into_bytes()).collect();
        let first: Vec<u32> = keys.iter().map(|k| hash_bytes(k)).collect();
        let second: Vec<u32> = keys.iter().map(|k| hash_bytes(k)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_long_keys_are_sampled() {
        // 64 bytes gives a stride of 3: bytes 63, 60, ..., 3 are mixed in,
        // so changing byte 62 leaves the hash untouched.
        let a = vec![b'x'; 64];
        let mut b = a.clone();
        b[62] = b'y';
        assert_eq!(hash_bytes(&a), hash_bytes(&b));

        let mut c = a.clone();
        c[63] = b'y';
        assert_ne!(hash_bytes(&a), hash_bytes(&c));
    }

    #[test]
    fn test_high_bytes_do_not_overflow() {
        let key = vec![0xffu8; 4096];
        let _ = hash_bytes(&key);
        assert_ne!(hash_bytes(&[0x80]), hash_bytes(&[0x00]));
    }
}

//! Storage key generation for cached entries.

use sha2::{Digest, Sha256};

/// Compute the row key for `url` inside the cache generation `cache_name`.
///
/// The same URL in two generations yields two distinct keys.
pub fn compute_entry_key(cache_name: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(cache_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = compute_entry_key("misfigus-v1", "http://localhost:5173/static/app.js");
        let key2 = compute_entry_key("misfigus-v1", "http://localhost:5173/static/app.js");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_differs_per_generation() {
        let v1 = compute_entry_key("misfigus-v1", "http://localhost:5173/");
        let v2 = compute_entry_key("misfigus-v2", "http://localhost:5173/");
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_key_separator_prevents_collisions() {
        let a = compute_entry_key("ab", "c");
        let b = compute_entry_key("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = compute_entry_key("misfigus-v1", "http://localhost:5173/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

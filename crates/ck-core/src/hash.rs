//! Fast hash map and hash set type aliases.
//!
//! The debounce table is keyed by paths and consulted on every editor event,
//! so it uses the Fx hash algorithm from `rustc-hash` instead of `SipHash`.
//! Keys come from the local editor, not from untrusted input, so
//! denial-of-service resistance is not needed.
//!
//! # Examples
//!
//! ```
//! use ck_core::FxHashMap;
//!
//! let mut map: FxHashMap<&str, u32> = FxHashMap::default();
//! map.insert("/proj/a.js", 1);
//! assert_eq!(map.get("/proj/a.js"), Some(&1));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

#[cfg(test)]
mod tests {
    use super::*;
    use camino::{Utf8Path, Utf8PathBuf};

    #[test]
    fn test_fx_hash_map_path_keys() {
        let mut map: FxHashMap<Utf8PathBuf, u32> = FxHashMap::default();
        map.insert(Utf8PathBuf::from("/proj/a.js"), 1);
        map.insert(Utf8PathBuf::from("/proj/b.js"), 2);

        assert_eq!(map.get(Utf8Path::new("/proj/a.js")), Some(&1));
        assert_eq!(map.get(Utf8Path::new("/proj/b.js")), Some(&2));
        assert_eq!(map.get(Utf8Path::new("/proj/c.js")), None);
    }

    #[test]
    fn test_fx_hash_set_dedup() {
        let mut set: FxHashSet<Utf8PathBuf> = FxHashSet::default();
        assert!(set.insert(Utf8PathBuf::from("/sites/blog")));
        assert!(!set.insert(Utf8PathBuf::from("/sites/blog")));
        assert_eq!(set.len(), 1);
    }
}

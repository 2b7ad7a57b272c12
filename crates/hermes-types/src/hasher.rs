//! default hashing types with custom hasher

use std::{
    collections::{HashMap, HashSet},
    hash::BuildHasherDefault,
};

use rustc_hash::FxHasher;

/// HashMap using fx hash, the maps here are keyed by small index handles so
/// a quality-of-distribution hasher buys nothing
pub type FastHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
/// HashSet using fx hash
pub type FastHashSet<V> = HashSet<V, BuildHasherDefault<FxHasher>>;

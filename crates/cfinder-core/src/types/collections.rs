//! Re-exports of performance-oriented collection types.

pub use rustc_hash::{FxHashMap, FxHashSet};
pub use smallvec::SmallVec;
pub use std::collections::{BTreeMap, BTreeSet};

/// SmallVec for per-finding column lists (usually <4).
pub type SmallVec4<T> = SmallVec<[T; 4]>;

/// SmallVec for shape matches at one node (usually 1-2).
pub type SmallVec2<T> = SmallVec<[T; 2]>;

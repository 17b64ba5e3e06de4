//! Type-based dependency resolution for flows.
//!
//! A flow's dependency graph is a consequence of its types: a task consuming
//! `T` depends on the unique task producing `T`, or on the flow entry when
//! `T` is a flow parameter. This crate builds that graph, enforces the
//! invariants that need it (single producer per type, every input satisfied,
//! no cycles, every declared result produced), and emits a deterministic
//! schedule for the generator: topological order with ascending task serial
//! as the tie-break, so regenerating a file is byte-stable.

/// Graph construction and validation.
mod graph;

/// Deterministic emit ordering and predicate skip-sets.
mod schedule;
pub use schedule::{Node, NodeKind, Schedule};

pub use graph::resolve;

type HashMap<K, V> =
    std::collections::HashMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
type HashSet<T> = std::collections::HashSet<T, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Traits shared by all of our interners.
mod traits;
pub use traits::{GetStr, InternStr};

/// Internals for mapping keys to interned strings.
mod key_to_str;
use key_to_str::KeyToStr;

/// Internals for mapping interned strings to keys.
mod str_to_key;
use str_to_key::StrToKey;

/// Interner that checks for duplicates and only stores each unique string once.
mod packed;
pub use packed::PackedInterner;

/// Wrapper around interners that uses typed keys.
mod typed;
pub use typed::TypedInterner;

type Hasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// convenience: a deduplicating interner with a typed key.
pub type TypedPacked<K> = TypedInterner<K, PackedInterner>;

use std::hash::BuildHasher;

use super::{GetStr, InternStr, KeyToStr, StrToKey};

/// Interner that checks for duplicates and will only intern a given string once.
/// Using the lasso/rodeo hack for packed maps.
/// First param ("Key") is the id and must be big enough to fit total items;
/// Second param ("Idx") is an index into the string and must be greater than string len.
#[derive(Debug)]
pub struct PackedInterner<Key = u32, Idx = usize, H = crate::Hasher> {
    str_to_key: StrToKey<Key, H>,
    key_to_str: KeyToStr<Key, Idx>,
}

impl<Key, Idx> PackedInterner<Key, Idx, crate::Hasher> {
    pub fn with_capacity_and_avg_len(cap: usize, avg_len: usize) -> Self {
        Self {
            str_to_key: StrToKey::with_capacity(cap),
            key_to_str: KeyToStr::with_capacity_and_avg_len(cap, avg_len),
        }
    }
}

impl<Key, Idx> Default for PackedInterner<Key, Idx, crate::Hasher> {
    fn default() -> Self {
        Self::with_capacity_and_avg_len(16, 16)
    }
}

// GetStr /////////////////////
impl<Key, Idx, H: BuildHasher> GetStr for PackedInterner<Key, Idx, H>
where
    KeyToStr<Key, Idx>: GetStr<Key = Key>,
{
    type Key = Key;

    fn get(&self, k: Key) -> &str {
        self.key_to_str.get(k)
    }

    fn len(&self) -> usize {
        self.key_to_str.len()
    }

    fn str_len(&self) -> usize {
        self.key_to_str.str_len()
    }
}

// InternStr ///////////////////
impl<Key, Idx, H: BuildHasher> InternStr for PackedInterner<Key, Idx, H>
where
    Key: Copy,
    KeyToStr<Key, Idx>: GetStr<Key = Key> + InternStr<Key = Key>,
{
    type Key = Key;

    fn intern<T: AsRef<str>>(&mut self, s: T) -> Key {
        let s = s.as_ref();
        self.str_to_key.intern(s, &mut self.key_to_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dedup() {
        let mut interner = PackedInterner::<u32>::with_capacity_and_avg_len(4, 8);
        let a = interner.intern("alpha");
        let b = interner.intern("beta");
        let a2 = interner.intern("alpha");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!("alpha", interner.get(a));
        assert_eq!("beta", interner.get(b));
        assert_eq!(2, interner.len());
    }
}

use intern::{GetStr, InternStr, PackedInterner, TypedInterner, TypedPacked};
use syntax::ByteSpan;
use util::IdVec;

use crate::TypeId;

/// Interns canonical type spellings to stable [`TypeId`]s.
///
/// The id doubles as the "type hash" minted into generated identifiers, so
/// each produced type gets exactly one value cell per flow regardless of how
/// its spelling varies across signatures. The first-seen source spelling is
/// kept so the generator can print the type exactly as the file does.
#[derive(Debug)]
pub struct TypeTable {
    names: TypedPacked<TypeId>,
    spellings: IdVec<TypeId, ByteSpan>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self {
            names: TypedInterner::new(PackedInterner::with_capacity_and_avg_len(16, 24)),
            spellings: IdVec::with_capacity(16),
        }
    }
}

impl TypeTable {
    /// Intern a canonical spelling, recording `spelling` as the printable
    /// source form the first time the type is seen.
    pub fn intern(&mut self, canonical: &str, spelling: ByteSpan) -> TypeId {
        let before = self.names.len();
        let id = self.names.intern(canonical);
        if self.names.len() > before {
            self.spellings.push(spelling);
        }
        id
    }

    /// The canonical spelling, for diagnostics.
    pub fn canonical(&self, id: TypeId) -> &str {
        self.names.get(id)
    }

    /// Byte span of the first source spelling, for splicing into output.
    pub fn spelling(&self, id: TypeId) -> ByteSpan {
        *self.spellings.get(id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

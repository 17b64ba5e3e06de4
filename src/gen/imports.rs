use std::collections::BTreeMap;

use util::HashSet;

/// Tracks the imports the expansion needs on top of what the file already
/// has. Requested paths bind their last segment as the name; a name that is
/// already taken for something else falls back to the absolute path and adds
/// nothing. Added imports render stable-sorted.
pub struct ImportSet {
    /// names already bound in the file: imports, local items.
    taken: HashSet<String>,
    /// full path -> bound name.
    added: BTreeMap<String, String>,
}

impl ImportSet {
    pub fn new(taken: HashSet<String>) -> Self {
        Self {
            taken,
            added: BTreeMap::new(),
        }
    }

    /// Ensure `path` is importable and return the token to reference it by.
    pub fn request(&mut self, path: &str) -> String {
        let name = path.rsplit("::").next().unwrap_or(path);
        if let Some(bound) = self.added.get(path) {
            return bound.clone();
        }
        if self.taken.contains(name) {
            return format!("::{path}");
        }
        self.taken.insert(name.to_owned());
        self.added.insert(path.to_owned(), name.to_owned());
        name.to_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    /// The `use` lines to insert, sorted by path.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for path in self.added.keys() {
            out.push_str("use ");
            out.push_str(path);
            out.push_str(";\n");
        }
        out
    }
}

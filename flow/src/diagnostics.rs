use colored::Colorize;
use syntax::PosInfo;

/// For re-throwing after we've printed the list of diagnostics to the user.
#[derive(Debug, thiserror::Error)]
#[error("{0} failed due to {1} errors")]
pub struct AggregatedErrors(pub String, pub usize);

/// One positioned problem in user DSL code.
#[derive(Debug)]
pub struct Diagnostic {
    pub pos: PosInfo,
    pub msg: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.pos, self.msg)
    }
}

/// Collects diagnostics across a whole file so users see every problem in
/// one run. No diagnostic is fatal for sibling call sites.
#[derive(Debug, Default)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn add(&mut self, pos: PosInfo, msg: impl Into<String>) {
        let d = Diagnostic {
            pos,
            msg: msg.into(),
        };
        log::trace!("diagnostic: {d}");
        self.list.push(d);
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.list.extend(other.list);
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.list.iter()
    }

    /// Print the full list to stderr, then fail with an aggregated error
    /// if there was anything to print.
    pub fn print_recap(&self, label: &str) -> Result<(), AggregatedErrors> {
        if self.list.is_empty() {
            return Ok(());
        }
        eprintln!("\nEncountered errors while {label}:\n");
        for d in &self.list {
            eprintln!("{}: {d}", "ERROR".red());
        }
        Err(AggregatedErrors(label.to_owned(), self.list.len()))
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use util::HashMap;

use crate::args::{Args, GenMode};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid argument --file={0}: file already specified before")]
    DuplicateFile(String),
    #[error("invalid argument --file: file name cannot be empty")]
    EmptyFileName,
    #[error("package directory {0:?} does not exist")]
    NoSuchPackage(PathBuf),
}

/// Settings are like Args, except all the logic has been applied
/// so e.g. defaults are added in.
#[derive(Debug)]
pub struct Settings {
    pub package: PathBuf,
    /// file name -> output override (empty means the _gen default).
    pub outputs: HashMap<String, Option<PathBuf>>,
    /// true when --file was given at all; restricts processing.
    pub file_filter: bool,
    pub instrument_all_tasks: bool,
    pub genmode: GenMode,
    pub quiet: bool,
    pub verbose: u8,
}

impl Settings {
    /// Where generated code for `source` goes: the --file override if one
    /// was given, otherwise `<stem>_gen.rs` alongside the source.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if let Some(Some(output)) = self.outputs.get(name) {
            return output.clone();
        }
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        source.with_file_name(format!("{stem}_gen.rs"))
    }

    /// True when this file should be processed under the --file filter.
    pub fn selected(&self, source: &Path) -> bool {
        if !self.file_filter {
            return true;
        }
        source
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.outputs.contains_key(name))
    }
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> Result<Self> {
        let mut outputs = HashMap::default();
        for file in &args.files {
            let (name, output) = match file.split_once('=') {
                Some((name, output)) => (name, Some(PathBuf::from(output))),
                None => (file.as_str(), None),
            };
            if name.is_empty() {
                return Err(Error::EmptyFileName.into());
            }
            if outputs.insert(name.to_owned(), output).is_some() {
                return Err(Error::DuplicateFile(file.clone()).into());
            }
        }

        let package = PathBuf::from(&args.package);
        if !package.is_dir() {
            return Err(Error::NoSuchPackage(package).into());
        }

        Ok(Self {
            package,
            file_filter: !args.files.is_empty(),
            outputs,
            instrument_all_tasks: args.instrument_all_tasks,
            genmode: args.genmode,
            quiet: args.quiet,
            verbose: args.verbose,
        })
    }
}

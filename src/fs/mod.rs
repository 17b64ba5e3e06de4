use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fs, io};

use anyhow::{Context, Result};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("generated code does not parse: {msg}\nwrote the buffer to {buffer:?} for debugging")]
    BadGeneratedCode { msg: String, buffer: PathBuf },
}

/// All file operations in the crate go through this struct.
#[derive(Debug, Default)]
pub struct Fs;

impl Fs {
    pub fn new() -> Self {
        Self
    }

    /// The `.rs` files of a package directory, sorted for deterministic
    /// processing order. Non-recursive; nested modules belong to the same
    /// package and are picked up by their own paths.
    pub fn source_files(&self, package: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(package)
            .with_context(|| format!("reading package directory {package:?}"))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "rs") && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read entire file into a String.
    pub fn read_to_buf(&self, path: &Path, strbuf: &mut String) -> Result<()> {
        use std::io::Read;
        strbuf.clear();
        let cap = fs::metadata(path)?.len() as usize;
        if cap > strbuf.len() {
            strbuf.reserve(cap - strbuf.len());
        }
        let mut f = fs::File::open(path)?;
        f.read_to_string(strbuf)?;
        Ok(())
    }

    /// Write entire str to a file.
    pub fn write_file(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).with_context(|| format!("writing {path:?}"))?;
        Ok(())
    }

    /// Park a buffer that failed the post-generation parse in a temp file
    /// so the user can inspect it, and return the error to report.
    pub fn dump_failed_buffer(&self, text: &str, msg: String) -> Error {
        let buffer = match self.write_temp(text) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("could not write debug buffer: {e}");
                PathBuf::from("<unavailable>")
            }
        };
        Error::BadGeneratedCode { msg, buffer }
    }

    fn write_temp(&self, text: &str) -> Result<PathBuf, io::Error> {
        let mut file = tempfile::Builder::new()
            .prefix("cff-gen-")
            .suffix(".rs")
            .tempfile()?;
        file.write_all(text.as_bytes())?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use flow::{Compiler, CompilerOpts, DirectiveIr};
use traverse::Schedule;

use crate::fs::Fs;
use crate::gen::Generator;
use crate::settings::Settings;
use crate::ui::Ui;

/// This struct actually runs the command-line app.
pub struct App {
    settings: Settings,
    fs: Fs,
    ui: Ui,
}

impl App {
    /// Create a new `App`.
    pub fn new(settings: Settings) -> Self {
        let ui = Ui::new(&settings);
        Self {
            settings,
            fs: Fs::new(),
            ui,
        }
    }

    /// Process every selected file in the package. Each file's outcome is
    /// independent; the run fails if any file did.
    pub fn run(mut self) -> Result<()> {
        let files = self.fs.source_files(&self.settings.package)?;

        let mut processed = 0usize;
        let mut errored = 0usize;
        for path in &files {
            if !self.settings.selected(path) {
                continue;
            }
            processed += 1;
            self.ui.start_timer();
            self.ui.verbose_progress(&format!("Processing {}", path.display()));
            match self.process_file(path) {
                Ok(()) => {
                    self.ui.done();
                    let _ = self.ui.print_elapsed("Processing");
                }
                Err(e) => {
                    errored += 1;
                    eprintln!("{}: {e:#}", "ERROR".red());
                }
            }
        }

        self.ui.summary(processed, errored);
        if errored > 0 {
            anyhow::bail!("{errored} of {processed} files failed");
        }
        Ok(())
    }

    /// Load, compile, validate, resolve, and generate one file. Nothing is
    /// written when the file produced diagnostics or has no DSL sites.
    fn process_file(&self, path: &Path) -> Result<()> {
        let mut src = String::new();
        self.fs
            .read_to_buf(path, &mut src)
            .with_context(|| format!("reading {}", path.display()))?;

        let file = syntax::parse(&path.to_string_lossy(), &src)
            .with_context(|| format!("loading {}", path.display()))?;

        let compiler = Compiler::new(CompilerOpts {
            instrument_all_tasks: self.settings.instrument_all_tasks,
        });
        let (ir, mut diags) = compiler.compile(file);

        let mut schedules: Vec<Option<Schedule>> = Vec::with_capacity(ir.directives.len());
        for directive in &ir.directives {
            match directive {
                DirectiveIr::Flow(f) => {
                    schedules.push(traverse::resolve(f, &ir.types, &mut diags))
                }
                DirectiveIr::Parallel(_) => schedules.push(None),
            }
        }

        diags.print_recap(&format!("processing {}", path.display()))?;
        if ir.is_empty() {
            // files without flows are never rewritten.
            log::debug!("no cff call sites in {}", path.display());
            return Ok(());
        }

        let buffer = Generator::new(self.settings.genmode).generate(&ir, &schedules)?;

        // generated output must still be a valid source file; park the
        // buffer for debugging when it is not.
        if self.settings.genmode != crate::args::GenMode::Modifier {
            if let Err(e) = syn::parse_file(&buffer) {
                return Err(self.fs.dump_failed_buffer(&buffer, e.to_string()).into());
            }
        }

        let output = self.settings.output_path(path);
        self.fs.write_file(&output, &buffer)?;
        Ok(())
    }
}

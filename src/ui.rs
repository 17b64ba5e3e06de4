use colored::Colorize;

use util::Timer;

use crate::settings::Settings;

/// All interactions with the text UI should go through this struct.
pub struct Ui {
    /// -v setting, displays extra text info to user
    pub verbose: bool,
    /// --quiet setting, suppresses the progress summary
    quiet: bool,
    /// keeps track of time for each file
    timer: Timer,
}

impl Ui {
    pub fn new(settings: &Settings) -> Self {
        Self {
            verbose: settings.verbose > 0,
            quiet: settings.quiet,
            timer: Timer::now(),
        }
    }

    pub fn start_timer(&mut self) {
        if self.verbose {
            self.timer.reset();
        }
    }

    pub fn print_elapsed(&mut self, task: &str) -> Result<(), std::time::SystemTimeError> {
        if self.verbose {
            self.timer.print_elapsed(task)
        } else {
            Ok(())
        }
    }

    pub fn verbose_progress(&self, msg: &str) {
        if self.verbose {
            eprint!("{}... ", msg.magenta());
        }
    }

    pub fn done(&self) {
        if self.verbose {
            eprintln!("{}.", "done".green());
        }
    }

    /// Final line: `Processed N files with M errors`, unless --quiet.
    pub fn summary(&self, processed: usize, errored: usize) {
        if self.quiet {
            return;
        }
        let line = format!("Processed {processed} files with {errored} errors");
        if errored > 0 {
            eprintln!("{}", line.red());
        } else {
            eprintln!("{line}");
        }
    }
}

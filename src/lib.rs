/// High-level command line app
mod app;
/// Definition of command-line args
mod args;
/// Filesystem operations
mod fs;
/// Code generation: splicing, modes, templates
mod gen;
/// Combined command-line run settings
mod settings;
/// Text UI
mod ui;

// exported for tests:
pub use app::App;
pub use args::{Args, GenMode};
pub use settings::Settings;

const BUG_REPORT_URL: &str = "https://github.com/cff-rs/cff/issues";

/// Run the command-line app.
pub fn run() -> Result<(), anyhow::Error> {
    use clap::Parser;
    let args = Args::parse();

    // INTERPRET SETTINGS ///////////////
    let settings: Settings = args.try_into()?;

    let log_level = match settings.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logging::log_to_stderr(log_level);

    // compiler bugs panic; tell the user where to send them, then let the
    // panic continue so CI keeps the stack trace.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        eprintln!("You've encountered a cff bug! Please report it at {BUG_REPORT_URL}");
        default_hook(info);
    }));

    // RUN THE THING /////////////////
    let app = App::new(settings);
    app.run()?;

    Ok(())
}

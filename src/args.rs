use clap::Parser;

const CMD_NAME: &str = "cff";

/// Stores our command-line args format.
#[derive(Parser, Debug)]
#[command(name = CMD_NAME, version, about = None, long_about = None)]
pub struct Args {
    /// Process only the file named NAME inside the package; repeatable.
    /// NAME must be the file name, not a path. Optionally, OUTPUT overrides
    /// where the generated code for NAME is written; by default it goes to
    /// NAME with a _gen suffix.
    #[arg(long = "file", value_name = "NAME[=OUTPUT]")]
    pub files: Vec<String>,

    /// Infer a name for tasks that do not specify cff::instrument and
    /// opt them into instrumentation by default.
    #[arg(long)]
    pub instrument_all_tasks: bool,

    /// Code generation mode.
    #[arg(long, value_enum, default_value_t = GenMode::Base)]
    pub genmode: GenMode,

    /// Suppress the progress summary.
    #[arg(long)]
    pub quiet: bool,

    /// Print additional debugging info; repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory of the package containing cff files.
    #[arg(value_name = "PACKAGE")]
    pub package: String,
}

/// The shape of the generator's output.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenMode {
    /// Replace each DSL call with scheduler code.
    Base,
    /// Base, plus source markers pointing back at the DSL call sites.
    SourceMap,
    /// Rewrite task bodies in place, preserving the DSL call shape.
    Modifier,
}

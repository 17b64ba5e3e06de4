use std::process::ExitCode;

fn main() -> ExitCode {
    match cff_gen::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

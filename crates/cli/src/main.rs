use std::process::ExitCode;

fn main() -> ExitCode {
    zam_cli::run()
}

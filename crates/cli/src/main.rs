use std::process::ExitCode;

fn main() -> ExitCode {
    aliasync_cli::run()
}

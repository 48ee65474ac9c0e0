use std::process::ExitCode;

fn main() -> ExitCode {
    sarthi_cli::run()
}

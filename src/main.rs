use std::process::ExitCode;

fn main() -> ExitCode {
    pemview_lib::run()
}

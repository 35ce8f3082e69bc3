#![forbid(unsafe_code)]

fn main() -> std::process::ExitCode {
    ridgeline_cli::main_entry()
}

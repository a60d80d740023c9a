use clap::Parser;
use pullback::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

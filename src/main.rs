use clap::Parser;
use quantscan::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

mod shell;

use clap::Parser;

fn main() -> Result<(), eframe::Error> {
    shell::run(shell::StartupArgs::parse())
}

mod agent;
mod cli;
mod cmd;
mod editor;
mod error;
mod fsops;
mod host;
mod install;
mod logging;
mod options;
mod paths;
mod progress;
mod prompt;
mod steps;
mod templates;
mod ui;

use clap::Parser;

use cli::{Cli, Command};
use ui::Palette;

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    logging::init();
    let palette = Palette::detect();

    let code = match cli.command {
        None => match agent::serve(&cli.config) {
            Ok(()) => 0,
            Err(e) => {
                log::error!("{e}");
                ui::print_error(&palette, &e.to_string());
                1
            }
        },
        Some(Command::Install) => match install::init(palette) {
            Ok(()) => 0,
            Err(e) => {
                println!();
                ui::print_error(&palette, &format!("Installation error: {e}"));
                1
            }
        },
        Some(Command::Sensors) => {
            agent::sensors::print();
            0
        }
    };

    std::process::exit(code);
}

//! dlnap - discover DLNA media renderers and control playback
//!
//! Options given on the command line are applied first; afterwards the same options
//! are read line by line from the `Command:` prompt.

mod args;
mod commands;
mod shell;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use dlna::DlnaConfig;
use log::{warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use args::Args;
use shell::{report, Shell};

fn main() -> ExitCode {
    let args = Args::parse();

    // The shell adjusts the max level per command; the logger itself lets everything through
    if let Err(e) = TermLogger::init(
        LevelFilter::Trace,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Error: failed to initialize logging: {}", e);
    }
    log::set_max_level(LevelFilter::Warn);

    let mut shell = match Shell::new(DlnaConfig::default()) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = shell.install_interrupt_handler() {
        warn!("Ctrl-C will not interrupt searches: {}", e);
    }

    report(shell.execute(&args));

    match shell.run(io::stdin().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

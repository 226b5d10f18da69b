use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Args, Commands, PasswordCommands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    commands::init_logging(args.verbose);

    match args.command {
        Commands::Password { command } => {
            let settings = commands::open_settings(args.settings)?;
            match command {
                PasswordCommands::Set { password, retype } => {
                    commands::settings::password_set(&settings, &password, &retype)
                }
                PasswordCommands::Toggle { password } => {
                    commands::settings::password_toggle(&settings, &password)
                }
            }
        }
        Commands::LockTime { lock_time } => {
            let settings = commands::open_settings(args.settings)?;
            commands::settings::lock_time(&settings, lock_time)
        }
        Commands::Show { json } => {
            let settings = commands::open_settings(args.settings)?;
            commands::settings::show(&settings, json)
        }
        Commands::Session {
            progress,
            desktop_notifications,
            max_attempts,
        } => commands::session::run(args.settings, progress, desktop_notifications, max_attempts),
    }
}

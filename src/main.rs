use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use tokio::io::BufReader;

mod app;
mod auth_client;
mod command;
mod config;
mod console;
mod datetime;
mod history;
mod logger;
mod profile;
mod profile_command;
mod store;
mod ticker;
mod time_entry;
mod timer;
mod track_command;
mod tracker;

use auth_client::HttpAuthClient;
use config::Config;
use console::ConsoleText;
use profile_command::{ProfileArgs, ProfileCommand};
use store::MemoryStore;
use track_command::{TrackArgs, TrackCommand};

/// 作業時間を計測するためのCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- track --activity Meeting --tag team
/// $ cargo run -- profile
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        long = "log-level",
        help = "Sets the log level written to stderr",
        default_value = "warn",
        global = true
    )]
    log_level: LevelFilter,

    #[clap(
        long = "auth-url",
        help = "Sets the auth server URL, overrides TRACKTIME_AUTH_URL",
        global = true
    )]
    auth_url: Option<String>,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    Track(TrackArgs),
    Profile(ProfileArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logger::setup_logger(args.log_level)?;

    let config = Config::load(args.auth_url).context("Failed to load configuration")?;
    let auth = Arc::new(
        HttpAuthClient::new(&config.auth_url).context("Failed to new auth client")?,
    );

    match args.subcommand {
        SubCommands::Track(track) => {
            let store = Arc::new(MemoryStore::new());
            TrackCommand::new(auth, store)
                .run(track, BufReader::new(tokio::io::stdin()), io::stdout())
                .await?
        }
        SubCommands::Profile(profile) => {
            let mut presenter = ConsoleText::new(io::stdout());
            ProfileCommand::new(auth).run(profile, &mut presenter).await?
        }
    }

    Ok(())
}

// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persona - a Discord persona agent backed by Gemini.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use persona_config::{ConfigError, PersonaConfig};

/// Persona - a Discord persona agent backed by Gemini.
#[derive(Parser, Debug)]
#[command(name = "persona", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to Discord and run the agent (default).
    Serve,
    /// Validate the configuration and print a summary.
    CheckConfig,
}

fn load(path: Option<&PathBuf>) -> Result<PersonaConfig, Vec<ConfigError>> {
    match path {
        Some(path) => persona_config::load_and_validate_path(path),
        None => persona_config::load_and_validate(),
    }
}

fn summary(config: &PersonaConfig) -> String {
    let on_off = |enabled: bool| if enabled { "enabled" } else { "disabled" };
    format!(
        "persona: config ok\n  agent.name = {}\n  agent.language = {}\n  rejection gate = {}\n  voice = {}\n  proactive = {}\n  owner = {}\n  discord token = {}\n  gemini key = {}",
        config.agent.name,
        config.agent.language,
        on_off(config.agent.rejection_gate),
        on_off(config.voice.enabled),
        config.proactive.channel_id.as_deref().unwrap_or("disabled"),
        config.discord.owner_id.as_deref().unwrap_or("not set"),
        if config.discord.bot_token.is_some() { "set" } else { "missing" },
        if config.gemini.api_key.is_some() { "set" } else { "missing" },
    )
}

#[tokio::main]
async fn main() {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            persona_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => println!("{}", summary(&config)),
    }
}

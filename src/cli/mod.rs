pub mod preflight;
pub mod runtime;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config;

#[derive(Parser)]
#[command(name = "flighthours-api")]
#[command(about = "Flight hours API - employee registration against the identity provider")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Print the resolved configuration with secrets masked")]
    Config,

    #[command(about = "Check an email for complete or partial registrations")]
    Preflight {
        #[arg(long)]
        email: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::init()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::serve(config).await,
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config.masked())?);
            Ok(())
        }
        Commands::Preflight { email } => preflight::preflight(config, &email).await,
    }
}

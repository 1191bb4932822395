use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use warrant_core::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, Permission};

mod client;
mod commands;

use client::{DEFAULT_ENDPOINT, WarrantClient};

#[derive(Parser, Debug)]
#[command(name = "warrant", version, about = "Warrant credential authority CLI")]
struct Cli {
    /// Base URL of the warrant server.
    #[arg(long, global = true, env = "WARRANT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Token management (gen/list/rm/verify)
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Issue a new token for a principal.
    Gen {
        /// Principal the token is issued to.
        name: String,

        /// Permission level (read, write, sign, admin).
        #[arg(long)]
        perm: Permission,

        /// Custom string carried in the token payload.
        #[arg(long, default_value = "")]
        extra: String,
    },

    /// List live tokens in issue order.
    List {
        #[arg(long, default_value_t = 0)]
        skip: u64,

        /// Page size, at most 100.
        #[arg(
            long,
            default_value_t = DEFAULT_PAGE_LIMIT,
            value_parser = clap::value_parser!(u64).range(1..=MAX_PAGE_LIMIT)
        )]
        limit: u64,
    },

    /// Revoke a token.
    Rm { token: String },

    /// Check that a token is live and carries at least --perm.
    Verify {
        token: String,

        #[arg(long, default_value = "read")]
        perm: Permission,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = WarrantClient::new(&cli.endpoint)?;

    match cli.cmd {
        Command::Token { cmd } => match cmd {
            TokenCommand::Gen { name, perm, extra } => {
                commands::token::generate(&client, &name, perm, &extra).await?
            }
            TokenCommand::List { skip, limit } => {
                commands::token::list(&client, skip, limit).await?
            }
            TokenCommand::Rm { token } => commands::token::remove(&client, &token).await?,
            TokenCommand::Verify { token, perm } => {
                commands::token::verify(&client, &token, perm).await?
            }
        },
    }

    Ok(())
}

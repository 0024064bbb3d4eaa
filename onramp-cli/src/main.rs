//! On-Ramp CLI
//!
//! Command-line interface for the on-ramp API. `notify` replays a bank
//! confirmation, which is handy for testing redelivery by hand.

use anyhow::Result;
use clap::{Parser, Subcommand};

use onramp_client::OnRampClient;

#[derive(Parser)]
#[command(name = "onramp")]
#[command(author, version, about = "On-ramp API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the on-ramp API
    #[arg(long, env = "ONRAMP_API_URL", default_value = "http://localhost:3003")]
    api_url: String,

    /// Admin key for the /api routes
    #[arg(long, env = "ONRAMP_ADMIN_KEY")]
    admin_key: Option<String>,

    /// Secret used to sign webhook notifications
    #[arg(long, env = "ONRAMP_WEBHOOK_SECRET")]
    webhook_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Send a payment notification as the bank would
    Notify {
        #[arg(long)]
        token: String,
        #[arg(long)]
        user: String,
        /// Amount in paise
        #[arg(long)]
        amount: i64,
    },
    /// On-ramp transaction operations
    Onramp {
        #[command(subcommand)]
        action: OnRampCommands,
    },
    /// Show a user's balance
    Balance {
        /// User identifier
        user: String,
    },
}

#[derive(Subcommand)]
enum OnRampCommands {
    /// Record a pending deposit
    Initiate {
        #[arg(long)]
        user: String,
        /// Amount in paise
        #[arg(long)]
        amount: i64,
        /// Token to use instead of a generated one
        #[arg(long)]
        token: Option<String>,
    },
    /// Get an on-ramp transaction
    Get {
        /// On-ramp token
        token: String,
    },
    /// Mark a pending deposit as failed
    Fail {
        /// On-ramp token
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = OnRampClient::new(&cli.api_url);
    if let Some(key) = cli.admin_key {
        client = client.with_admin_key(key);
    }
    if let Some(secret) = cli.webhook_secret {
        client = client.with_webhook_secret(secret);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Notify {
            token,
            user,
            amount,
        } => {
            let ack = client.notify(&token, &user, amount).await?;
            println!("{}", serde_json::to_string_pretty(&ack)?);
        }

        Commands::Onramp { action } => match action {
            OnRampCommands::Initiate {
                user,
                amount,
                token,
            } => {
                let tx = client.initiate(&user, amount, token).await?;
                println!("{}", serde_json::to_string_pretty(&tx)?);
            }
            OnRampCommands::Get { token } => {
                let tx = client.get_onramp(&token).await?;
                println!("{}", serde_json::to_string_pretty(&tx)?);
            }
            OnRampCommands::Fail { token } => {
                let tx = client.fail_onramp(&token).await?;
                println!("{}", serde_json::to_string_pretty(&tx)?);
            }
        },

        Commands::Balance { user } => {
            let balance = client.get_balance(&user).await?;
            println!("{}", serde_json::to_string_pretty(&balance)?);
        }
    }

    Ok(())
}

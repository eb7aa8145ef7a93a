use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use lingxi_chat::cli::chat::ChatContext;
use lingxi_chat::config::{ChatArgs, ChatConfig, ServeArgs, ServerConfig};
use lingxi_chat::server;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Send a single message and exit
        #[arg(short, long)]
        input: Option<String>,

        /// Accept all prompts without asking
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        args: ChatArgs,
    },
    /// Serve the web widget's static assets
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Chat { input, yes, args } => {
            let config = ChatConfig::from_args(args)?;
            info!("Starting chat against {}", config.endpoint);
            let interactive = input.is_none();
            let mut chat_context =
                ChatContext::new(Box::new(io::stdout()), &config, input, interactive, yes)?;
            chat_context.run().await
        }
        Commands::Serve { args } => {
            let config = ServerConfig::from_args(args)?;
            server::serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

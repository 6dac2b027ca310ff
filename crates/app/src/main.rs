//! fincoach
//!
//! Terminal front end for the financial-coaching backend: an
//! interactive chat over the persistent coaching channel, a session
//! proxy, and session management commands.

mod chat;
mod logging;
mod render;
mod sessions;

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "fincoach",
    version,
    about = "Chat front end for the financial coaching service"
)]
struct Cli {
    /// Base URL of the coaching backend's HTTP surface
    #[arg(
        long,
        global = true,
        env = "FINCOACH_BACKEND_URL",
        default_value = "http://127.0.0.1:8000"
    )]
    backend_url: String,

    /// WebSocket endpoint of the coaching channel
    #[arg(
        long,
        global = true,
        env = "FINCOACH_CHANNEL_URL",
        default_value = "ws://127.0.0.1:8000/ws"
    )]
    channel_url: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive coaching chat (the default when no command is given)
    Chat {
        /// Submit a single goal and exit instead of starting the loop
        #[arg(long)]
        goal: Option<String>,
    },
    /// Run the session proxy in front of the backend
    Proxy {
        #[arg(long, env = "FINCOACH_PROXY_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
    /// Inspect or delete backend sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// List sessions known to the backend
    List,
    /// Delete one session
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging = logging::init()?;

    info!(
        component = "main",
        event = "main.started",
        backend_url = %cli.backend_url,
        channel_url = %cli.channel_url,
        "fincoach starting"
    );

    match cli.command.unwrap_or(Command::Chat { goal: None }) {
        Command::Chat { goal } => {
            chat::run(chat::ChatOpts {
                backend_url: cli.backend_url,
                channel_url: cli.channel_url,
                one_shot_goal: goal,
            })
            .await
        }
        Command::Proxy { bind } => {
            let listener = tokio::net::TcpListener::bind(bind).await?;
            fincoach_proxy::serve(listener, fincoach_proxy::Upstream::new(cli.backend_url))
                .await?;
            Ok(())
        }
        Command::Sessions { action } => match action {
            SessionsAction::List => sessions::list(&cli.backend_url).await,
            SessionsAction::Delete { id } => sessions::delete(&cli.backend_url, &id).await,
        },
    }
}

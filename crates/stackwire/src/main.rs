//! `stackwire` command-line client and broker.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use stackwire::prelude::*;
use stackwire_session::SessionError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing_subscriber::EnvFilter;

/// Stacking tic-tac-toe over a shared message bus
#[derive(Parser, Debug)]
#[command(name = "stackwire")]
#[command(about = "Stacking tic-tac-toe over a shared message bus", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Join (or start) a game
    Play(PlayArgs),

    /// Run a broker that clients connect to
    Broker {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:1883")]
        bind: String,
    },
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Five-digit game id. Asked for when omitted.
    #[arg(long)]
    session: Option<String>,

    /// 1 or 2 to play, 3 to watch. Asked for when omitted.
    #[arg(long)]
    role: Option<String>,

    /// Broker URL, e.g. ws://127.0.0.1:1883 (overrides the config file)
    #[arg(long)]
    broker: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed client id, to take a role back after a restart
    #[arg(long)]
    client_id: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they don't interleave with the board.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stackwire=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Cmd::Play(args) => play(args).await,
        Cmd::Broker { bind } => broker(&bind).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn play(args: PlayArgs) -> Result<(), StackwireError> {
    let mut config = ClientConfig::load(args.config.as_deref())?;
    if let Some(broker) = args.broker {
        config.broker_url = broker;
    }
    if let Some(client_id) = args.client_id {
        config.client_id = Some(client_id);
    }
    let config = config.validate()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let Some(id) = ask_session_id(args.session, &mut lines).await? else {
        return Ok(());
    };
    let Some(role) = ask_role(args.role, &mut lines).await? else {
        return Ok(());
    };

    let mut session = Session::new(id, &config.namespace, role);
    if let Some(client_id) = &config.client_id {
        session = session.with_client_id(client_id.clone());
    }

    let bus = WebSocketBus::connect(&config.broker_url).await?;
    let handle = SyncHandle::start(bus.clone(), JsonCodec, session, config.sync_config()).await?;

    let exit = play_session(
        &handle,
        lines.into_inner(),
        std::io::stdout(),
        tokio::signal::ctrl_c(),
    )
    .await;
    bus.close().await?;

    match exit? {
        GameExit::Finished { winner } => println!("game over: {winner} won"),
        GameExit::Quit | GameExit::Interrupted => println!("left the game"),
    }
    Ok(())
}

/// Uses the flag if given, otherwise asks until the input is valid.
/// `None` when input ends first.
async fn ask_session_id<R: AsyncBufRead + Unpin>(
    flag: Option<String>,
    lines: &mut Lines<R>,
) -> Result<Option<SessionId>, StackwireError> {
    if let Some(flag) = flag {
        return Ok(Some(SessionId::parse(&flag)?));
    }
    loop {
        println!("Enter a 5-digit Game ID:");
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        match SessionId::parse(&line) {
            Ok(id) => return Ok(Some(id)),
            Err(e) => println!("{e}"),
        }
    }
}

async fn ask_role<R: AsyncBufRead + Unpin>(
    flag: Option<String>,
    lines: &mut Lines<R>,
) -> Result<Option<Role>, StackwireError> {
    if let Some(flag) = flag {
        return Ok(Some(resolve_role(&flag)?));
    }
    loop {
        println!("Enter 1 or 2 to play, 3 to watch:");
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        match resolve_role(&line) {
            Ok(role) => return Ok(Some(role)),
            Err(e @ SessionError::InvalidRole(_)) => println!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }
}

async fn broker(bind: &str) -> Result<(), StackwireError> {
    let server = BrokerServer::bind(bind).await?;
    tracing::info!(addr = %server.local_addr()?, "broker listening");

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("broker shutting down"),
    }
    Ok(())
}

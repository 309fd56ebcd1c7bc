//! wcdemo - terminal front-end for the WalletConnect demo.
//!
//! Renders the connect button on every state change and reads commands from
//! stdin. A loopback wallet lives in the same process so pairings can be
//! approved, rejected or deleted from the prompt.

use clap::Parser;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use wcdemo_core::client;
use wcdemo_core::modal;
use wcdemo_core::{
    logging, ButtonView, LoopbackSignClient, SessionCoordinator, TerminalModal, WalletConfig,
};

mod app;
mod commands;

use app::App;
use commands::{Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "wcdemo", version, about = "Connect a wallet over WalletConnect v2")]
struct Args {
    /// WalletConnect Cloud project id.
    #[arg(long, env = "WALLETCONNECT_PROJECT_ID")]
    project_id: Option<String>,

    /// File the client keeps sessions in between runs.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Directory for the diagnostic trace file.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> WalletConfig {
        let mut builder = WalletConfig::builder();
        if let Some(id) = &self.project_id {
            builder = builder.project_id(id.clone());
        }
        if let Some(path) = &self.store {
            builder = builder.storage_path(path.clone());
        }
        if let Some(dir) = &self.log_dir {
            builder = builder.log_dir(dir.clone());
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = args.config();
    let client = client::initialize::<LoopbackSignClient>(&config).await;
    let wallet = client
        .as_ref()
        .ok()
        .map(|c| c.wallet_peer(app::wallet_metadata()));
    let modal: TerminalModal = modal::create(&config);

    let trace = logging::open_log_file(config.log_dir.as_deref(), "wallet-session");
    let coordinator_modal = modal.clone();
    let coordinator = SessionCoordinator::spawn(
        async move { client.map(|c| (c, coordinator_modal)) },
        trace,
    );
    let ctx = coordinator.context();

    let mut states = ctx.subscribe();
    let render = tokio::spawn(async move {
        loop {
            let view = ButtonView::from_state(&states.borrow_and_update());
            println!("{}", view);
            if states.changed().await.is_err() {
                break;
            }
        }
    });

    println!("{}", HELP);
    let app = App::new(ctx, modal, wallet);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        log::error!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if let ControlFlow::Break(()) = app.dispatch(command).await {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }
    }

    coordinator.shutdown().await;
    render.abort();
}

// src/bingo_client.rs
// Terminal client for the bingo assistant server.
//
// Connects to the push channel, keeps a local snapshot of the server state,
// detects winning cards and drives the winner presentation.
//
// Interactive Controls (one command per line, type help for the list):
// - ENTER: confirm the announced winner, then press the Next Game / Play Again button
// - next: simulate a random call
// - quit: exit the client
//
// CLI Options:
// - --host/--port: override the server address from conf/client.conf
// - --start: reset the server to session setup before starting
// - --exit: print the current state once and exit

use clap::Parser;
use tokio::sync::mpsc;

use bingo_assist::clients::api_client::BingoApi;
use bingo_assist::clients::common::ApiResult;
use bingo_assist::clients::push::run_push_channel;
use bingo_assist::clients::terminal::{card_table, spawn_input_reader, TerminalScreen, HELP};
use bingo_assist::config::ClientConfig;
use bingo_assist::logging::{log_info, set_verbose};
use bingo_assist::session::Session;

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(about = "Bingo Client - Follow the game, detect winners and confirm them")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Server host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Go back to session setup before starting
    #[arg(long)]
    start: bool,

    /// Print the current state once and exit
    #[arg(long)]
    exit: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    match run_client_with_args(args).await {
        Ok(_) => {
            println!("Client finished successfully.");
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run_client_with_args(args: Args) -> ApiResult<()> {
    let mut config = ClientConfig::load_or_default();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    set_verbose(config.verbose || args.verbose);

    let api = BingoApi::from_config(&config)?;

    print!("Connecting to server at {}...", api.base_url());
    let state = match api.get_state().await {
        Ok(state) => {
            println!("Ok. ✓");
            state
        }
        Err(e) => {
            println!();
            eprintln!("Error. ✗ Failed to connect to server: {e}");
            eprintln!("Make sure the bingo server is running on {}", api.base_url());
            return Err(e);
        }
    };

    if args.exit {
        println!("View: {:?} | Mode: {} | Status: {}", state.view, state.mode.as_str(), state.status);
        for (i, card) in state.cards.iter().enumerate() {
            print!("{}", card_table(i, card, None, None));
        }
        return Ok(());
    }

    if args.start {
        api.start().await?;
        log_info("Session reset to setup");
    }

    let (push_tx, push_rx) = mpsc::unbounded_channel();
    let (input_tx, input_rx) = mpsc::unbounded_channel();

    let push = tokio::spawn(run_push_channel(config.ws_url(), config.retry_attempts, push_tx));
    spawn_input_reader(input_tx);

    println!("{HELP}");
    let mut session = Session::new(api, TerminalScreen::stdout(), config.timings());
    session.run(push_rx, input_rx).await;

    if push.is_finished() {
        // the session stopped because the push channel gave up
        push.await??;
    } else {
        push.abort();
    }
    Ok(())
}

use clap::Parser;
use log::{error, info};
use server::network::Server;
use server::session::Session;
use server::settings::MatchSettings;
use server::word_bank::WordBank;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Words drawn for each match
    #[arg(short, long, default_value = "10")]
    words: usize,

    /// Correct words needed to win
    #[arg(short, long, default_value = "10")]
    threshold: u32,

    /// Numbers announced before a match starts
    #[arg(short, long, default_value = "5")]
    countdown: u32,

    /// Delay between countdown numbers in milliseconds
    #[arg(long, default_value = "1000")]
    step_delay_ms: u64,

    /// Word list to use instead of the built-in catalog, one word per line
    #[arg(long)]
    word_file: Option<PathBuf>,

    /// Seed for reproducible word draws
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let bank = match &args.word_file {
        Some(path) => WordBank::from_file(path)?,
        None => WordBank::builtin(),
    };
    info!("Word bank holds {} words", bank.len());

    let settings = MatchSettings {
        sequence_length: args.words,
        win_threshold: args.threshold,
        countdown_steps: args.countdown,
        step_delay: Duration::from_millis(args.step_delay_ms),
    };

    let session = match args.seed {
        Some(seed) => Session::with_seed(settings, bank, seed),
        None => Session::new(settings, bank),
    };
    let session = match session {
        Ok(session) => session,
        Err(e) => {
            error!("Invalid match settings: {}", e);
            return Err(e.into());
        }
    };

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, session).await?;

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

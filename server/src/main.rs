use clap::Parser;
use log::info;
use server::game::GameState;
use server::network::Server;
use shared::{Tuning, DEFAULT_TICK_RATE};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative movement server")]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,

    /// Maximum number of connected peers
    #[arg(short, long, default_value_t = 32)]
    max_clients: usize,

    /// JSON file overriding the default movement tuning
    #[arg(long)]
    tuning: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let tuning = match &args.tuning {
        Some(path) => {
            info!("Loading tuning from {}", path.display());
            Tuning::from_json_file(path)?
        }
        None => Tuning::default(),
    };

    let tick_rate = args.tick_rate.max(1);
    let tick_duration = Duration::from_secs_f64(1.0 / tick_rate as f64);
    let address = format!("{}:{}", args.host, args.port);

    info!(
        "Starting server on {} at {}Hz (max {} clients)",
        address, tick_rate, args.max_clients
    );

    let world = GameState::new(tuning).with_level(GameState::default_level());
    let mut server = Server::new(&address, tick_duration, args.max_clients, world).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

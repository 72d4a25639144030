use clap::Parser;
use log::info;
use snake_server::config::ServerConfig;
use snake_server::network::Server;
use snake_shared::{DEFAULT_HEIGHT, DEFAULT_MAX_FOODS, DEFAULT_PORT, DEFAULT_TICK_MS, DEFAULT_WIDTH};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Arena width in cells, border included
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: i32,

    /// Arena height in cells, border included
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: i32,

    /// Number of food items kept on the board
    #[arg(short = 'f', long, default_value_t = DEFAULT_MAX_FOODS)]
    max_foods: usize,

    /// Milliseconds between simulation ticks
    #[arg(short, long, default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,

    /// Maximum concurrent players
    #[arg(short, long, default_value = "32")]
    max_players: usize,

    /// Seconds a new connection has to send its name
    #[arg(long, default_value = "10")]
    handshake_timeout_secs: u64,

    /// Drop players silent for this many seconds (0 disables)
    #[arg(long, default_value = "0")]
    idle_timeout_secs: u64,

    /// Seed for a reproducible world
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            width: args.width,
            height: args.height,
            max_foods: args.max_foods,
            tick_duration: Duration::from_millis(args.tick_ms),
            max_players: args.max_players,
            handshake_timeout: Duration::from_secs(args.handshake_timeout_secs),
            idle_timeout: (args.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(args.idle_timeout_secs)),
            seed: args.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::from(args);

    info!("Starting snake server on {}", config.address());
    let server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

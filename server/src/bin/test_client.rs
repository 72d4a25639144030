use clap::Parser;
use log::{info, warn};
use rand::Rng;
use snake_shared::{Direction, Snapshot, DEFAULT_PORT};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Headless client that joins, steers at random and reports each snapshot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Display name sent in the handshake
    #[arg(short, long, default_value = "tester")]
    name: String,

    /// Snapshots to read before disconnecting
    #[arg(short, long, default_value = "50")]
    ticks: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {} as '{}'", args.server, args.name);

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    write_half
        .write_all(format!("{}\n", args.name).as_bytes())
        .await?;

    let mut rng = rand::thread_rng();
    for received in 0..args.ticks {
        let Some(line) = lines.next_line().await? else {
            warn!("Server closed the connection after {} snapshots", received);
            return Ok(());
        };

        let snapshot = Snapshot::decode(&line)?;
        match snapshot.player(&args.name) {
            Some(me) => info!(
                "#{}: head {:?} length {} score {} {}",
                received,
                me.body.first(),
                me.body.len(),
                me.score,
                if me.alive { "ALIVE" } else { "DEAD" }
            ),
            None => warn!("#{}: not in the player list", received),
        }

        if rng.gen_bool(0.2) {
            let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
            write_half
                .write_all(format!("{}\n", direction.token()).as_bytes())
                .await?;
        }
    }

    info!("Done after {} snapshots", args.ticks);
    Ok(())
}

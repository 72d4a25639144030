//! Server network layer handling TCP sessions and game loop coordination

use crate::broadcast::{outbox, Inbox};
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::game::SessionId;
use crate::world::SharedWorld;
use log::{debug, error, info, warn};
use snake_shared::{Direction, MAX_HANDSHAKE_BYTES, MAX_NAME_LEN, MAX_TOKEN_BYTES};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};

/// Per-connection read deadlines
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub handshake_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl From<&ServerConfig> for SessionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            handshake_timeout: config.handshake_timeout,
            idle_timeout: config.idle_timeout,
        }
    }
}

/// Listening socket plus the world it serves
pub struct Server {
    listener: TcpListener,
    world: Arc<SharedWorld>,
    config: ServerConfig,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let world = Arc::new(SharedWorld::new(&config));

        Ok(Server {
            listener,
            world,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn world(&self) -> Arc<SharedWorld> {
        Arc::clone(&self.world)
    }

    /// Runs the tick loop and accepts connections until the tick loop dies
    pub async fn run(self) -> io::Result<()> {
        let mut game_loop = spawn_game_loop(Arc::clone(&self.world), self.config.tick_duration);
        let limits = SessionLimits::from(&self.config);

        info!(
            "Server started: {}x{} arena, {} food, {}ms ticks, {} player slots",
            self.config.width,
            self.config.height,
            self.config.max_foods,
            self.config.tick_duration.as_millis(),
            self.config.max_players
        );

        loop {
            tokio::select! {
                result = &mut game_loop => {
                    if let Err(e) = result {
                        error!("Game loop task panicked: {}", e);
                    }
                    return Err(io::Error::new(io::ErrorKind::Other, "game loop stopped"));
                }

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("Accepted connection from {}", addr);
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Could not disable Nagle for {}: {}", addr, e);
                        }

                        let world = Arc::clone(&self.world);
                        tokio::spawn(async move {
                            match handle_connection(stream, addr, world, limits).await {
                                Ok(()) => info!("Connection {} closed", addr),
                                Err(e) => warn!("Connection {} ended: {}", addr, e),
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        sleep(Duration::from_millis(10)).await;
                    }
                },
            }
        }
    }
}

/// Spawns the fixed-interval simulation task
pub fn spawn_game_loop(world: Arc<SharedWorld>, tick_duration: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Skip the first tick since it fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match world.tick().await {
                Ok(broadcast) => {
                    let tick = broadcast.tick;
                    let recipients = broadcast.recipient_count();
                    let frame_bytes = broadcast.frame().len();
                    let report = broadcast.deliver();

                    if tick % 100 == 0 && recipients > 0 {
                        debug!(
                            "Tick {}: {} byte frame to {} clients, {} delivered, {} lagging, {} closed",
                            tick,
                            frame_bytes,
                            recipients,
                            report.delivered,
                            report.lagging,
                            report.closed
                        );
                    }
                }
                Err(e) => error!("Failed to encode snapshot: {}", e),
            }
        }
    })
}

/// Serves one client from handshake to disconnect
///
/// The session is removed from the world whatever ends the read loop.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    world: Arc<SharedWorld>,
    limits: SessionLimits,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    let name = read_name(&mut reader, limits.handshake_timeout).await?;

    let (tx, rx) = outbox();
    let id = world.join(&name, addr, tx).await?;
    let writer = tokio::spawn(write_frames(write_half, rx, id));

    let result = read_commands(&mut reader, &world, id, limits.idle_timeout).await;

    world.leave(id).await;
    // A client that stopped reading could park the writer forever.
    writer.abort();

    result
}

async fn read_name<R>(reader: &mut R, deadline: Duration) -> Result<String, SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::new();
    let mut limited = (&mut *reader).take(MAX_HANDSHAKE_BYTES);

    let read = timeout(deadline, limited.read_until(b'\n', &mut raw))
        .await
        .map_err(|_| SessionError::HandshakeTimeout)??;
    if read == 0 {
        return Err(SessionError::NoHandshake);
    }

    let text = std::str::from_utf8(&raw).map_err(|_| SessionError::InvalidEncoding)?;
    let name = text.trim();

    if name.is_empty() {
        return Err(SessionError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(SessionError::NameTooLong(MAX_NAME_LEN));
    }

    Ok(name.to_string())
}

async fn read_commands<R>(
    reader: &mut R,
    world: &SharedWorld,
    id: SessionId,
    idle_timeout: Option<Duration>,
) -> Result<(), SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        line.clear();
        let mut limited = (&mut *reader).take(MAX_TOKEN_BYTES);

        let read = match idle_timeout {
            Some(limit) => timeout(limit, limited.read_until(b'\n', &mut line))
                .await
                .map_err(|_| SessionError::IdleTimeout)??,
            None => limited.read_until(b'\n', &mut line).await?,
        };
        if read == 0 {
            return Ok(());
        }
        if read as u64 == MAX_TOKEN_BYTES && line.last() != Some(&b'\n') {
            return Err(SessionError::LineTooLong(MAX_TOKEN_BYTES));
        }

        let Ok(text) = std::str::from_utf8(&line) else {
            debug!("Client {} sent undecodable input", id);
            continue;
        };

        let token = text.trim();
        match Direction::from_token(token) {
            Some(direction) => {
                if !world.steer(id, direction).await {
                    debug!("Client {} turn {:?} ignored", id, direction);
                }
            }
            None => debug!("Client {} sent unknown token {:?}", id, token),
        }
    }
}

async fn write_frames<W>(mut writer: W, mut frames: Inbox, id: SessionId)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        if let Err(e) = writer.write_all(frame.as_bytes()).await {
            debug!("Client {} write failed: {}", id, e);
            return;
        }
    }

    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use snake_shared::Snapshot;
    use tokio::io::{duplex, split, DuplexStream, ReadHalf};
    use tokio_test::assert_err;
    use tokio_test::io::Builder;

    fn test_world() -> Arc<SharedWorld> {
        Arc::new(SharedWorld::new(&ServerConfig {
            width: 30,
            height: 20,
            max_foods: 3,
            seed: Some(9),
            ..ServerConfig::default()
        }))
    }

    fn limits() -> SessionLimits {
        SessionLimits {
            handshake_timeout: Duration::from_millis(200),
            idle_timeout: None,
        }
    }

    fn addr() -> SocketAddr {
        "127.0.0.1:40001".parse().unwrap()
    }

    async fn next_snapshot(reader: &mut BufReader<ReadHalf<DuplexStream>>) -> Snapshot {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        Snapshot::decode(&line).unwrap()
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected_silently() {
        let world = test_world();
        let stream = Builder::new().read(b"   \r\n").build();

        let err = assert_err!(handle_connection(stream, addr(), Arc::clone(&world), limits()).await);

        assert!(matches!(err, SessionError::EmptyName));
        assert_eq!(world.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_closed_before_name() {
        let stream = Builder::new().build();
        let err = assert_err!(handle_connection(stream, addr(), test_world(), limits()).await);
        assert!(matches!(err, SessionError::NoHandshake));
    }

    #[tokio::test]
    async fn test_long_name_is_rejected() {
        let name = format!("{}\n", "x".repeat(MAX_NAME_LEN + 1));
        let stream = Builder::new().read(name.as_bytes()).build();

        let err = assert_err!(handle_connection(stream, addr(), test_world(), limits()).await);
        assert!(matches!(err, SessionError::NameTooLong(_)));
    }

    #[tokio::test]
    async fn test_undecodable_name_is_rejected() {
        let stream = Builder::new().read(&[0xff, 0xfe, b'\n']).build();

        let err = assert_err!(handle_connection(stream, addr(), test_world(), limits()).await);
        assert!(matches!(err, SessionError::InvalidEncoding));
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        let (_client, server) = duplex(1024);
        let limits = SessionLimits {
            handshake_timeout: Duration::from_millis(20),
            idle_timeout: None,
        };

        let err = assert_err!(handle_connection(server, addr(), test_world(), limits).await);
        assert!(matches!(err, SessionError::HandshakeTimeout));
    }

    #[tokio::test]
    async fn test_idle_session_is_dropped() {
        let world = test_world();
        let (mut client, server) = duplex(64 * 1024);
        let limits = SessionLimits {
            handshake_timeout: Duration::from_millis(200),
            idle_timeout: Some(Duration::from_millis(30)),
        };

        client.write_all(b"sleepy\n").await.unwrap();
        let err = assert_err!(handle_connection(server, addr(), Arc::clone(&world), limits).await);

        assert!(matches!(err, SessionError::IdleTimeout));
        assert_eq!(world.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_unterminated_flood_ends_session() {
        let world = test_world();
        let (client, server) = duplex(64 * 1024);
        let (client_read, mut client_write) = split(client);
        let mut client_read = BufReader::new(client_read);

        let handler = tokio::spawn(handle_connection(
            server,
            addr(),
            Arc::clone(&world),
            limits(),
        ));

        client_write.write_all(b"bob\n").await.unwrap();
        next_snapshot(&mut client_read).await;
        assert_eq!(world.player_count().await, 1);

        let flood = vec![b'x'; 16 * 1024];
        client_write.write_all(&flood).await.unwrap();

        let result = timeout(Duration::from_secs(2), handler)
            .await
            .expect("session should end without a newline")
            .unwrap();
        let err = assert_err!(result);
        assert!(matches!(err, SessionError::LineTooLong(_)));
        assert_eq!(world.player_count().await, 0);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let world = test_world();
        let (client, server) = duplex(64 * 1024);
        let (client_read, mut client_write) = split(client);
        let mut client_read = BufReader::new(client_read);

        let handler = tokio::spawn(handle_connection(
            server,
            addr(),
            Arc::clone(&world),
            limits(),
        ));

        client_write.write_all(b"  alice \n").await.unwrap();
        let first = next_snapshot(&mut client_read).await;
        let start = first.player("alice").unwrap().body[0];

        world.tick().await.unwrap().deliver();
        let second = next_snapshot(&mut client_read).await;
        let moved = second.player("alice").unwrap().body[0];
        let step = (moved.0 - start.0, moved.1 - start.1);

        // Turn at a right angle to the current heading, mixed with noise.
        let (token, expected) = if step.1 == 0 {
            ("w", (0, -1))
        } else {
            ("a", (-1, 0))
        };
        client_write.write_all(b"x\n").await.unwrap();
        client_write.write_all(&[0xc3, 0x28, b'\n']).await.unwrap();
        client_write
            .write_all(format!("{}\n", token).as_bytes())
            .await
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        world.tick().await.unwrap().deliver();
        let third = next_snapshot(&mut client_read).await;
        let turned = third.player("alice").unwrap().body[0];
        assert_eq!((turned.0 - moved.0, turned.1 - moved.1), expected);

        drop(client_write);
        drop(client_read);
        handler.await.unwrap().unwrap();
        assert_eq!(world.player_count().await, 0);
    }
}

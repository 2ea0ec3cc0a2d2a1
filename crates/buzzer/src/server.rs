//! `BuzzerServer` builder and server loop.
//!
//! This is the entry point for running a Buzzer game server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use buzzer_protocol::{Codec, JsonCodec};
use buzzer_room::{RoomConfig, RoomRegistry};
use buzzer_session::SessionManager;
use buzzer_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{BuzzerError, ImageStore, NoImageStore};

/// How long a connection may stay silent before it is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the server pings each connection. Browsers answer pings on
/// their own, so a quiet but open tab never reaches the idle timeout.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);

/// Shared server state passed to each connection handler task.
///
/// The registry locks internally; the session map is held only for a
/// single bind or unbind.
pub(crate) struct ServerState<S: ImageStore, C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: RoomRegistry,
    pub(crate) images: S,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
    pub(crate) ping_interval: Duration,
}

/// Builder for configuring and starting a Buzzer server.
///
/// # Example
///
/// ```rust,no_run
/// use buzzer::prelude::*;
///
/// # async fn run() -> Result<(), BuzzerError> {
/// let server = BuzzerServer::builder()
///     .bind("0.0.0.0:3000")
///     .image_store(UploadDirStore::new("uploads"))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct BuzzerServerBuilder<S = NoImageStore> {
    bind_addr: String,
    room_config: RoomConfig,
    idle_timeout: Duration,
    ping_interval: Duration,
    images: S,
}

impl BuzzerServerBuilder {
    /// Creates a new builder with default settings and no image store.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            ping_interval: DEFAULT_PING_INTERVAL,
            images: NoImageStore,
        }
    }
}

impl<S: ImageStore> BuzzerServerBuilder<S> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the limits applied to every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how long a connection may go without sending a frame.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets how often connections are pinged. Keep it below the idle
    /// timeout; zero is treated as one millisecond.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Sets the store whose images are released when a room closes.
    pub fn image_store<T: ImageStore>(self, images: T) -> BuzzerServerBuilder<T> {
        BuzzerServerBuilder {
            bind_addr: self.bind_addr,
            room_config: self.room_config,
            idle_timeout: self.idle_timeout,
            ping_interval: self.ping_interval,
            images,
        }
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<BuzzerServer<S, JsonCodec>, BuzzerError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new()),
            rooms: RoomRegistry::new(self.room_config),
            images: self.images,
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
            ping_interval: self.ping_interval,
        });

        Ok(BuzzerServer { transport, state })
    }
}

impl Default for BuzzerServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Buzzer server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BuzzerServer<S: ImageStore, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl BuzzerServer<NoImageStore, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> BuzzerServerBuilder {
        BuzzerServerBuilder::new()
    }
}

impl<S, C> BuzzerServer<S, C>
where
    S: ImageStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), BuzzerError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Buzzer server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

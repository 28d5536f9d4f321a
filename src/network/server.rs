//! WebSocket Game Server
//!
//! Async WebSocket server for duel connections. Handles match creation
//! and joining by code, move routing into the resolver, and per-viewer
//! state fan-out.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::protocol::{
    ClientMessage, ErrorCode, ErrorReply, MoveRequest, ServerMessage,
};
use crate::network::session::{MatchId, SessionError, SessionManager};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Connected client state.
struct ConnectedClient {
    /// Player name, once seated in a match.
    player_name: Option<String>,
    /// Current match, once seated.
    match_id: Option<MatchId>,
    /// Connection time.
    #[allow(dead_code)]
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
    /// Message sender (for direct messaging to client).
    #[allow(dead_code)]
    sender: mpsc::Sender<ServerMessage>,
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Session manager.
    sessions: Arc<SessionManager>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

async fn send_error(sender: &mpsc::Sender<ServerMessage>, code: ErrorCode, message: String) {
    let _ = sender
        .send(ServerMessage::Error(ErrorReply { code, message }))
        .await;
}

impl From<&SessionError> for ErrorCode {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::MatchNotFound => ErrorCode::MatchNotFound,
            SessionError::MatchFull => ErrorCode::MatchFull,
            SessionError::NameTaken => ErrorCode::NameTaken,
            SessionError::NotInMatch => ErrorCode::NotInMatch,
        }
    }
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            sessions: Arc::new(SessionManager::new()),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);

        let cleanup_clients = self.clients.clone();
        let cleanup_sessions = self.sessions.clone();
        let idle_timeout = self.config.idle_timeout;

        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, cleanup_sessions, idle_timeout).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let sessions = self.sessions.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    player_name: None,
                    match_id: None,
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                    sender: msg_tx.clone(),
                });
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        send_error(
                                            &msg_tx,
                                            ErrorCode::InvalidInput,
                                            "Invalid message format".to_string(),
                                        ).await;
                                        continue;
                                    }
                                };

                                // Update activity
                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                    }
                                }

                                Self::handle_client_message(
                                    addr,
                                    client_msg,
                                    &clients,
                                    &sessions,
                                    &msg_tx,
                                ).await;
                            }
                            Some(Ok(Message::Ping(_))) => {
                                let _ = msg_tx.send(ServerMessage::Pong {
                                    timestamp: 0,
                                    server_time: now_millis(),
                                }).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();
            Self::disconnect_client(addr, &clients, &sessions).await;
            info!("Client {} cleaned up", addr);
        });
    }

    /// Handle a client message.
    async fn handle_client_message(
        addr: SocketAddr,
        msg: ClientMessage,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        sessions: &Arc<SessionManager>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        match msg {
            ClientMessage::CreateMatch { player_name } => {
                Self::handle_create(addr, player_name, clients, sessions, sender).await;
            }
            ClientMessage::JoinMatch { match_id, player_name } => {
                Self::handle_join(addr, match_id, player_name, clients, sessions, sender).await;
            }
            ClientMessage::Move(request) => {
                Self::handle_move(addr, request, clients, sessions, sender).await;
            }
            ClientMessage::SyncRequest => {
                Self::handle_sync(addr, clients, sessions, sender).await;
            }
            ClientMessage::Ping { timestamp } => {
                let _ = sender.send(ServerMessage::Pong {
                    timestamp,
                    server_time: now_millis(),
                }).await;
            }
            ClientMessage::Leave => {
                Self::disconnect_client(addr, clients, sessions).await;
            }
        }
    }

    /// Create a match and seat this connection as its first player.
    async fn handle_create(
        addr: SocketAddr,
        player_name: String,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        sessions: &Arc<SessionManager>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        if player_name.trim().is_empty() {
            send_error(sender, ErrorCode::InvalidInput, "Player name required".to_string()).await;
            return;
        }

        let match_id = sessions.create_match(&player_name, sender.clone()).await;

        {
            let mut clients = clients.write().await;
            if let Some(client) = clients.get_mut(&addr) {
                client.player_name = Some(player_name.clone());
                client.match_id = Some(match_id.clone());
            }
        }

        let _ = sender.send(ServerMessage::MatchJoined {
            match_id: match_id.clone(),
            player_name,
        }).await;

        if let Some(session) = sessions.get(&match_id).await {
            session.read().await.broadcast_state().await;
        }
    }

    /// Seat this connection in an existing match.
    async fn handle_join(
        addr: SocketAddr,
        match_id: String,
        player_name: String,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        sessions: &Arc<SessionManager>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        if player_name.trim().is_empty() {
            send_error(sender, ErrorCode::InvalidInput, "Player name required".to_string()).await;
            return;
        }

        let session = match sessions.join_match(&match_id, &player_name, sender.clone()).await {
            Ok(session) => session,
            Err(e) => {
                send_error(sender, ErrorCode::from(&e), e.to_string()).await;
                return;
            }
        };

        {
            let mut clients = clients.write().await;
            if let Some(client) = clients.get_mut(&addr) {
                client.player_name = Some(player_name.clone());
                client.match_id = Some(match_id.clone());
            }
        }

        let _ = sender.send(ServerMessage::MatchJoined {
            match_id,
            player_name,
        }).await;

        session.read().await.broadcast_state().await;
    }

    /// Route one move into the resolver.
    ///
    /// The actor named in the request must be the player this connection
    /// is seated as; a mismatch is rejected without touching the match.
    /// Rule violations go back to this connection only.
    async fn handle_move(
        addr: SocketAddr,
        request: MoveRequest,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        sessions: &Arc<SessionManager>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let seated_as = {
            let clients = clients.read().await;
            clients.get(&addr).and_then(|c| c.player_name.clone())
        };

        match seated_as {
            Some(name) if name == request.actor => {}
            Some(_) => {
                send_error(
                    sender,
                    ErrorCode::InvalidInput,
                    "Actor does not match this connection".to_string(),
                ).await;
                return;
            }
            None => {
                send_error(sender, ErrorCode::NotInMatch, "Join a match first".to_string()).await;
                return;
            }
        }

        let session = match sessions.get(&request.match_id).await {
            Some(session) => session,
            None => {
                send_error(sender, ErrorCode::MatchNotFound, "match not found".to_string()).await;
                return;
            }
        };

        let result = {
            let mut guard = session.write().await;
            guard.apply_move(&request.actor, &request.intent).await
        };

        if let Err(violation) = result {
            send_error(sender, ErrorCode::RuleViolation, violation.to_string()).await;
        }
    }

    /// Resend this connection's current snapshot.
    async fn handle_sync(
        addr: SocketAddr,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        sessions: &Arc<SessionManager>,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let (player_name, match_id) = {
            let clients = clients.read().await;
            match clients.get(&addr) {
                Some(c) => (c.player_name.clone(), c.match_id.clone()),
                None => (None, None),
            }
        };

        let (Some(name), Some(match_id)) = (player_name, match_id) else {
            send_error(sender, ErrorCode::NotInMatch, "Join a match first".to_string()).await;
            return;
        };

        match sessions.get(&match_id).await {
            Some(session) => {
                let mut guard = session.write().await;
                if let Err(e) = guard.resubscribe(&name, sender.clone()) {
                    send_error(sender, ErrorCode::from(&e), e.to_string()).await;
                    return;
                }
                guard.send_state_to(&name).await;
            }
            None => {
                send_error(sender, ErrorCode::MatchNotFound, "match not found".to_string()).await;
            }
        }
    }

    /// Unsubscribe a connection from its match and forget it.
    ///
    /// The player stays seated so they can reconnect; the match is only
    /// dropped once the cleanup loop finds it abandoned or finished.
    async fn disconnect_client(
        addr: SocketAddr,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        sessions: &Arc<SessionManager>,
    ) {
        let removed = {
            let mut clients = clients.write().await;
            clients.remove(&addr)
        };

        let Some(client) = removed else {
            return;
        };

        if let (Some(name), Some(match_id)) = (client.player_name, client.match_id) {
            if let Some(session) = sessions.get(&match_id).await {
                let mut guard = session.write().await;
                guard.unsubscribe(&name);
                guard.state.push_log(format!("{} disconnected", name));
                guard.broadcast_state().await;
            }
        }
    }

    /// Run cleanup loop.
    async fn run_cleanup_loop(
        clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        sessions: Arc<SessionManager>,
        idle_timeout: Duration,
    ) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            // Cleanup idle connections
            let now = Instant::now();
            let to_remove: Vec<_> = {
                let clients = clients.read().await;
                clients.iter()
                    .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
                    .map(|(addr, _)| *addr)
                    .collect()
            };

            for addr in to_remove {
                info!("Removing idle client {}", addr);
                Self::disconnect_client(addr, &clients, &sessions).await;
            }

            // Cleanup finished and abandoned matches
            sessions.cleanup().await;
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get active match count.
    pub async fn session_count(&self) -> usize {
        self.sessions.session_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);

        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = GameServer::new(config);
        server.shutdown();
        // Should not panic
    }

    #[test]
    fn test_session_error_codes() {
        assert_eq!(ErrorCode::from(&SessionError::MatchNotFound), ErrorCode::MatchNotFound);
        assert_eq!(ErrorCode::from(&SessionError::MatchFull), ErrorCode::MatchFull);
        assert_eq!(ErrorCode::from(&SessionError::NameTaken), ErrorCode::NameTaken);
        assert_eq!(ErrorCode::from(&SessionError::NotInMatch), ErrorCode::NotInMatch);
    }
}

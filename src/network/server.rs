//! WebSocket Draw Server
//!
//! Async WebSocket server exposing the draw API. This layer owns every
//! policy the deterministic engine refuses to carry: at least 2 members,
//! a non-empty salt, one draw per pool, timestamp captured exactly once.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::draw::{compute_seed, generate_fair_order, verify, DrawInputs};
use crate::network::protocol::{
    ClientMessage, CreatePoolRequest, DrawInfo, ErrorCode, GenerateDrawRequest, PoolInfo,
    ServerError, ServerMessage,
};
use crate::pool::{AuditAction, AuditEntry, Pool, PoolError, PoolId};
use crate::store::{DrawStore, StoreError, StoredDraw};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Store snapshot path, if persistence is enabled.
    pub snapshot_path: Option<PathBuf>,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("static addr"),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            snapshot_path: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("QOR3A_BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.bind_addr),
            max_connections: std::env::var("QOR3A_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_connections),
            idle_timeout: std::env::var("QOR3A_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            snapshot_path: std::env::var("QOR3A_SNAPSHOT_PATH").ok().map(PathBuf::from),
            version: defaults.version,
        }
    }
}

/// Draw server errors.
#[derive(Debug, thiserror::Error)]
pub enum DrawServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Storage error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    #[allow(dead_code)]
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
    /// Message sender for direct messaging to this client.
    #[allow(dead_code)]
    sender: mpsc::Sender<ServerMessage>,
}

/// The draw server.
pub struct DrawServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared store.
    store: Arc<RwLock<DrawStore>>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl DrawServer {
    /// Create a server over an existing store.
    pub fn new(config: ServerConfig, store: DrawStore) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            store: Arc::new(RwLock::new(store)),
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Shared handle to the store (for snapshotting at shutdown).
    pub fn store(&self) -> Arc<RwLock<DrawStore>> {
        self.store.clone()
    }

    /// Run the server until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), DrawServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Draw server v{} listening on {}", self.config.version, self.config.bind_addr);

        let cleanup_clients = self.clients.clone();
        let idle_timeout = self.config.idle_timeout;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, idle_timeout).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let client_count = self.clients.read().await.len();
                            if client_count >= self.config.max_connections {
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
        let store = self.store.clone();
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

            {
                let mut clients = clients.write().await;
                clients.insert(addr, ConnectedClient {
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                    sender: msg_tx.clone(),
                });
            }

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

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                    }
                                }

                                let response = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => {
                                        Self::process_message(&store, client_msg).await
                                    }
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::Error(ServerError {
                                            code: ErrorCode::InvalidRequest,
                                            message: "Invalid message format".to_string(),
                                        })
                                    }
                                };

                                if msg_tx.send(response).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Ping(_))) => {
                                let _ = msg_tx.send(ServerMessage::Pong {
                                    timestamp: 0,
                                    server_time: Utc::now().timestamp_millis() as u64,
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
                        break;
                    }
                }
            }

            sender_task.abort();
            clients.write().await.remove(&addr);
            info!("Client {} cleaned up", addr);
        });
    }

    /// Dispatch a client message against the store and produce the reply.
    ///
    /// All boundary invariants are enforced here, before the
    /// deterministic engine is invoked.
    pub async fn process_message(
        store: &Arc<RwLock<DrawStore>>,
        msg: ClientMessage,
    ) -> ServerMessage {
        match msg {
            ClientMessage::CreatePool(req) => Self::handle_create_pool(store, req).await,
            ClientMessage::GetPool { pool_id } => Self::handle_get_pool(store, &pool_id).await,
            ClientMessage::AddMembers { pool_id, members } => {
                Self::handle_add_members(store, &pool_id, members).await
            }
            ClientMessage::GenerateDraw(req) => Self::handle_generate_draw(store, req).await,
            ClientMessage::GetDraw { pool_id } => Self::handle_get_draw(store, &pool_id).await,
            ClientMessage::VerifyPool { pool_id } => Self::handle_verify_pool(store, &pool_id).await,
            ClientMessage::VerifyDraw { record } => {
                // Pure check over caller-supplied data; storage untouched.
                let report = verify(&record);
                ServerMessage::VerifyResult {
                    is_valid: report.is_valid,
                    diagnostic: report.diagnostic(),
                    failure: report.failure,
                }
            }
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: Utc::now().timestamp_millis() as u64,
            },
        }
    }

    async fn handle_create_pool(
        store: &Arc<RwLock<DrawStore>>,
        req: CreatePoolRequest,
    ) -> ServerMessage {
        if req.name.is_empty() {
            return error_msg(ErrorCode::InvalidRequest, "Pool name is required");
        }
        if req.members.iter().any(|name| name.trim().is_empty()) {
            return error_msg(ErrorCode::InvalidRequest, "Member names must be non-empty");
        }

        let mut pool = Pool::new(req.name, req.amount, req.currency, req.start_date);
        for name in &req.members {
            if let Err(e) = pool.add_member(name.trim()) {
                return error_msg(ErrorCode::InvalidRequest, &e.to_string());
            }
        }

        let info = pool_info(&pool);
        let pool_id = pool.id;
        let member_count = pool.members.len();

        let mut store = store.write().await;
        store.insert_pool(pool);
        store.append_audit(AuditEntry::new(
            pool_id,
            AuditAction::PoolCreated,
            serde_json::json!({ "members": member_count }),
        ));

        info!("Created pool {} with {} members", pool_id, member_count);
        ServerMessage::PoolCreated(info)
    }

    async fn handle_get_pool(store: &Arc<RwLock<DrawStore>>, pool_id: &str) -> ServerMessage {
        let id = match PoolId::parse(pool_id) {
            Some(id) => id,
            None => return error_msg(ErrorCode::InvalidRequest, "Malformed pool id"),
        };

        let store = store.read().await;
        match store.pool(id) {
            Some(pool) => ServerMessage::Pool {
                pool: pool_info(pool),
                draw: store.draw(id).map(draw_info),
            },
            None => error_msg(ErrorCode::PoolNotFound, "Pool not found"),
        }
    }

    async fn handle_add_members(
        store: &Arc<RwLock<DrawStore>>,
        pool_id: &str,
        members: Vec<String>,
    ) -> ServerMessage {
        let id = match PoolId::parse(pool_id) {
            Some(id) => id,
            None => return error_msg(ErrorCode::InvalidRequest, "Malformed pool id"),
        };
        if members.is_empty() || members.iter().any(|name| name.trim().is_empty()) {
            return error_msg(ErrorCode::InvalidRequest, "Member names must be non-empty");
        }

        let mut store = store.write().await;
        let pool = match store.pool_mut(id) {
            Some(pool) => pool,
            None => return error_msg(ErrorCode::PoolNotFound, "Pool not found"),
        };

        for name in &members {
            if let Err(e) = pool.add_member(name.trim()) {
                return match e {
                    PoolError::PoolLocked => error_msg(ErrorCode::PoolLocked, &e.to_string()),
                    other => error_msg(ErrorCode::InvalidRequest, &other.to_string()),
                };
            }
        }

        let info = pool_info(pool);
        store.append_audit(AuditEntry::new(
            id,
            AuditAction::MembersAdded,
            serde_json::json!({ "added": members.len() }),
        ));

        ServerMessage::Pool { pool: info, draw: None }
    }

    async fn handle_generate_draw(
        store: &Arc<RwLock<DrawStore>>,
        req: GenerateDrawRequest,
    ) -> ServerMessage {
        let pool_id = match PoolId::parse(&req.pool_id) {
            Some(id) => id,
            None => return error_msg(ErrorCode::InvalidRequest, "Malformed pool id"),
        };
        if req.salt.is_empty() {
            return error_msg(ErrorCode::SaltRequired, "Salt is required");
        }

        // Single write lock across check-and-insert: the draw-once
        // constraint must not race between concurrent generate requests.
        let mut store = store.write().await;

        let pool = match store.pool(pool_id) {
            Some(pool) => pool,
            None => return error_msg(ErrorCode::PoolNotFound, "Pool not found"),
        };

        if let Err(e) = pool.ensure_can_draw() {
            return match e {
                PoolError::NotEnoughMembers(_) => {
                    error_msg(ErrorCode::NotEnoughMembers, &e.to_string())
                }
                PoolError::PoolLocked => error_msg(
                    ErrorCode::DrawAlreadyExists,
                    "Draw already exists and cannot be modified",
                ),
                PoolError::DuplicateMember(_) => {
                    error_msg(ErrorCode::InvalidRequest, &e.to_string())
                }
            };
        }

        // Timestamp is captured exactly once, here, at commitment time.
        let inputs = DrawInputs::new(
            pool.member_ids(),
            Utc::now().timestamp_millis(),
            req.salt,
        )
        .with_external_event(req.external_event.unwrap_or_default());

        let seed = compute_seed(&inputs);
        let results = generate_fair_order(&seed, &inputs.members);
        let draw = StoredDraw::new(pool_id, seed.clone(), inputs.clone(), results);

        let stored = match store.insert_draw(draw) {
            Ok(stored) => draw_info(stored),
            Err(StoreError::DrawAlreadyExists(_)) => {
                return error_msg(
                    ErrorCode::DrawAlreadyExists,
                    "Draw already exists and cannot be modified",
                );
            }
            Err(e) => {
                error!("Failed to persist draw for pool {}: {}", pool_id, e);
                return error_msg(ErrorCode::InternalError, "Failed to persist draw");
            }
        };

        store.append_audit(AuditEntry::draw_generated(pool_id, &seed, &inputs));
        info!("Generated draw for pool {} (seed {})", pool_id, seed);
        ServerMessage::Draw(stored)
    }

    async fn handle_get_draw(store: &Arc<RwLock<DrawStore>>, pool_id: &str) -> ServerMessage {
        let id = match PoolId::parse(pool_id) {
            Some(id) => id,
            None => return error_msg(ErrorCode::InvalidRequest, "Malformed pool id"),
        };

        let store = store.read().await;
        if store.pool(id).is_none() {
            return error_msg(ErrorCode::PoolNotFound, "Pool not found");
        }
        match store.draw(id) {
            Some(draw) => ServerMessage::Draw(draw_info(draw)),
            None => error_msg(ErrorCode::DrawNotFound, "Draw not found"),
        }
    }

    async fn handle_verify_pool(store: &Arc<RwLock<DrawStore>>, pool_id: &str) -> ServerMessage {
        let id = match PoolId::parse(pool_id) {
            Some(id) => id,
            None => return error_msg(ErrorCode::InvalidRequest, "Malformed pool id"),
        };

        let mut store = store.write().await;
        let report = match store.draw(id) {
            Some(draw) => verify(&draw.as_record()),
            None => return error_msg(ErrorCode::DrawNotFound, "Draw not found"),
        };

        store.append_audit(AuditEntry::draw_verified(id, report.is_valid, &report.diagnostic()));
        ServerMessage::VerifyResult {
            is_valid: report.is_valid,
            diagnostic: report.diagnostic(),
            failure: report.failure,
        }
    }

    /// Remove idle connections.
    async fn run_cleanup_loop(
        clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        idle_timeout: Duration,
    ) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            let now = Instant::now();
            let to_remove: Vec<_> = {
                let clients = clients.read().await;
                clients
                    .iter()
                    .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
                    .map(|(addr, _)| *addr)
                    .collect()
            };

            for addr in to_remove {
                clients.write().await.remove(&addr);
                info!("Removed idle client {}", addr);
            }
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
}

fn error_msg(code: ErrorCode, message: &str) -> ServerMessage {
    ServerMessage::Error(ServerError { code, message: message.to_string() })
}

fn pool_info(pool: &Pool) -> PoolInfo {
    PoolInfo {
        id: pool.id.to_string(),
        name: pool.name.clone(),
        amount: pool.amount,
        currency: pool.currency.clone(),
        start_date: pool.start_date,
        members: pool.members.clone(),
        is_locked: pool.is_locked,
    }
}

fn draw_info(draw: &StoredDraw) -> DrawInfo {
    DrawInfo {
        id: draw.id.to_string(),
        pool_id: draw.pool_id.to_string(),
        seed: draw.seed.clone(),
        inputs: draw.inputs.clone(),
        results: draw.results.clone(),
        created_at: draw.created_at,
        is_locked: draw.is_locked,
    }
}

// =============================================================================
// TESTS
// =============================================================================
